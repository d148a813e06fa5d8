use axum::extract::State;
use axum::Extension;
use axum::Json;
use serde_json::{json, Value};
use tower_sessions::Session;

use super::error::{ApiError, Context};
use super::session::{clear_current_user, set_current_user, OptionalUser, RequireUser};
use super::JsonBody;
use crate::auth::Accounts;
use crate::config::SessionSettings;
use crate::sanitize::coerce_text;
use crate::state::AppState;
use crate::UnitOfWork;

/// Username from a request body; passwords are read separately and are
/// never sanitized.
fn username(body: &Value) -> String {
    coerce_text(body.get("username"))
}

fn password(body: &Value) -> &str {
    body.get("password").and_then(Value::as_str).unwrap_or_default()
}

pub async fn register<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    Accounts::new(state.store())
        .register(&username(&body), password(&body))
        .await
        .context("register", None)?;

    Ok(Json(json!({
        "success": true,
        "message": "account created, you can now log in",
    })))
}

pub async fn login<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    Extension(settings): Extension<SessionSettings>,
    session: Session,
    JsonBody(body): JsonBody<Value>,
) -> Result<Json<Value>, ApiError> {
    let user = Accounts::new(state.store())
        .login(&username(&body), password(&body))
        .await
        .context("login", None)?;
    set_current_user(&session, &user, settings.ttl_secs)
        .await
        .context("login", Some(&user))?;

    let redirect = if user.is_admin() { "/admin" } else { "/" };
    Ok(Json(json!({
        "message": "logged in",
        "redirect": redirect,
        "is_admin": user.is_admin(),
    })))
}

pub async fn logout(
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Json<Value>, ApiError> {
    clear_current_user(&session)
        .await
        .context("logout", user.as_ref())?;
    if let Some(user) = user {
        tracing::info!(user = %user.username, "logged out");
    }
    Ok(Json(json!({ "message": "logged out" })))
}

pub async fn status(OptionalUser(user): OptionalUser) -> Json<Value> {
    Json(match user {
        Some(user) => json!({
            "logged_in": true,
            "username": user.username,
            "is_admin": user.is_admin,
        }),
        None => json!({ "logged_in": false }),
    })
}

pub async fn profile(RequireUser(user): RequireUser) -> Json<Value> {
    Json(json!({
        "id": user.id,
        "username": user.username,
        "is_admin": user.is_admin,
    }))
}
