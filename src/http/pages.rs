use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::session::RequireAdmin;
use crate::state::AppState;
use crate::{UnitOfWork, UnitOfWorkSession};

/// Serves the admin panel page to administrators only.
pub async fn admin<U: UnitOfWork>(
    State(state): State<AppState<U>>,
    RequireAdmin(_admin): RequireAdmin,
    request: Request,
) -> Response {
    match ServeFile::new(state.admin_page()).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Liveness: the process is up.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: a store session can be opened.
pub async fn ready<U: UnitOfWork>(State(state): State<AppState<U>>) -> StatusCode {
    match state.store().begin().await {
        Ok(session) => match session.rollback().await {
            Ok(()) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        Err(error) => {
            tracing::warn!(error = %error, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
