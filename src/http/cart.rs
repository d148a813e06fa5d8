use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::error::{ApiError, Context};
use super::session::RequireUser;
use super::JsonBody;
use crate::checkout::{parse_cart, CheckoutCoordinator};
use crate::state::AppState;
use crate::UnitOfWork;

/// Places an order for every line of the submitted cart, or for none.
pub async fn checkout<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireUser(user): RequireUser,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let receipt = CheckoutCoordinator::new(state.store())
        .place_order(&user, parse_cart(&body))
        .await
        .context("checkout", Some(&user))?;

    Ok(Json(json!({
        "success": true,
        "message": "order placed and stock updated",
        "lines": receipt.lines,
        "reference": receipt.reference,
    })))
}
