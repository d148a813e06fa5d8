use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::error::{ApiError, Context};
use super::session::{RequireAdmin, RequireUser};
use crate::model::OrderLine;
use crate::orders::OrderHistory;
use crate::state::AppState;
use crate::UnitOfWork;

/// An order line as listed to clients, with the buyer's display name.
#[derive(Debug, Serialize)]
pub struct OrderLineView {
    #[serde(flatten)]
    line: OrderLine,
    customer: String,
}

impl From<OrderLine> for OrderLineView {
    fn from(line: OrderLine) -> Self {
        Self {
            customer: line.customer().to_string(),
            line,
        }
    }
}

pub async fn list_mine<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderLineView>>, ApiError> {
    let lines = OrderHistory::new(state.store())
        .list_for_user(user.id)
        .await
        .context("list own orders", Some(&user))?;
    Ok(Json(lines.into_iter().map(OrderLineView::from).collect()))
}

pub async fn list_all<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<Vec<OrderLineView>>, ApiError> {
    let lines = OrderHistory::new(state.store())
        .list_all()
        .await
        .context("list all orders", Some(&admin))?;
    Ok(Json(lines.into_iter().map(OrderLineView::from).collect()))
}
