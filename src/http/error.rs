//! JSON error responses.
//!
//! Every handler returns `Result<_, ApiError>`. Domain errors convert into
//! an `ApiError` and render as `{"error": message}` with a matching status;
//! store failures never expose their details to the client.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::checkout::CheckoutError;
use crate::model::CurrentUser;
use crate::TransactionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("admin access required")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("store error: {0}")]
    Store(#[from] TransactionError),

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::InsufficientStock { .. } => StatusCode::CONFLICT,
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::InsufficientStock {
                product,
                available,
                requested,
            } => json!({
                "error": self.to_string(),
                "product": product,
                "available": available,
                "requested": requested,
            }),
            // Don't expose internal error details to clients
            Self::Store(_) | Self::Session(_) | Self::Internal(_) => {
                json!({ "error": "internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::Validation(message) => Self::Validation(message),
            CatalogError::NotFound(_) => Self::NotFound(error.to_string()),
            CatalogError::Store(error) => Self::Store(error),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::EmptyCart | CheckoutError::InvalidQuantity { .. } => {
                Self::Validation(error.to_string())
            }
            CheckoutError::NotFound(_) => Self::NotFound(error.to_string()),
            CheckoutError::InsufficientStock {
                product,
                available,
                requested,
            } => Self::InsufficientStock {
                product,
                available,
                requested,
            },
            CheckoutError::Store(error) => Self::Store(error),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(message) => Self::Validation(message),
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::UsernameTaken(_) => Self::Conflict(error.to_string()),
            AuthError::PasswordHash => Self::Internal(error.to_string()),
            AuthError::Store(error) => Self::Store(error),
        }
    }
}

/// Converts a handler failure into an [`ApiError`], logging server-side
/// failures with the operation and caller that triggered them.
pub trait Context<T> {
    fn context(self, operation: &'static str, caller: Option<&CurrentUser>) -> Result<T, ApiError>;
}

impl<T, E: Into<ApiError>> Context<T> for Result<T, E> {
    fn context(self, operation: &'static str, caller: Option<&CurrentUser>) -> Result<T, ApiError> {
        self.map_err(|error| {
            let error = error.into();
            if error.status().is_server_error() {
                tracing::error!(
                    operation,
                    user = caller.map(|user| user.username.as_str()),
                    error = %error,
                    "request failed"
                );
            }
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductId;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, serde_json::from_slice(&bytes).expect("JSON body"))
    }

    #[tokio::test]
    async fn insufficient_stock_carries_the_quantities() {
        let error = ApiError::from(CheckoutError::InsufficientStock {
            product: "Baguette".to_string(),
            available: 3,
            requested: 5,
        });

        let (status, body) = body_of(error).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["product"], "Baguette");
        assert_eq!(body["available"], 3);
        assert_eq!(body["requested"], 5);
    }

    #[tokio::test]
    async fn store_failures_hide_their_details() {
        let (status, body) = body_of(ApiError::Store(TransactionError::CommitFailed(
            "connection reset by peer".to_string(),
        )))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (ApiError::from(CheckoutError::EmptyCart), StatusCode::BAD_REQUEST),
            (
                ApiError::from(CatalogError::NotFound(ProductId::new(9))),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(AuthError::UsernameTaken("ana".to_string())),
                StatusCode::CONFLICT,
            ),
            (ApiError::from(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
        ];
        for (error, status) in cases {
            assert_eq!(error.status(), status, "{error}");
        }
    }
}
