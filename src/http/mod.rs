//! HTTP surface: router, session layer and JSON handlers.

use axum::extract::FromRequest;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::config::SessionSettings;
use crate::state::AppState;
use crate::UnitOfWork;

mod account;
mod cart;
pub mod error;
mod orders;
mod pages;
mod products;
pub mod session;

pub use error::ApiError;
pub use session::{OptionalUser, RequireAdmin, RequireUser, SESSION_COOKIE_NAME};

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Routes without the session layer. Unknown paths fall back to the
/// static asset directory.
pub fn router<U>(state: AppState<U>) -> Router
where
    U: UnitOfWork + 'static,
{
    Router::new()
        .route("/products", get(products::list::<U>).post(products::create::<U>))
        .route(
            "/products/{id}",
            put(products::update::<U>).delete(products::delete::<U>),
        )
        .route("/cart/checkout", post(cart::checkout::<U>))
        .route("/orders", get(orders::list_all::<U>))
        .route("/orders/mine", get(orders::list_mine::<U>))
        .route("/register", post(account::register::<U>))
        .route("/login", post(account::login::<U>))
        .route("/logout", post(account::logout))
        .route("/session", get(account::status))
        .route("/profile", get(account::profile))
        .route("/admin", get(pages::admin::<U>))
        .route("/health", get(pages::health))
        .route("/health/ready", get(pages::ready::<U>))
        .fallback_service(ServeDir::new(state.static_dir()))
        .with_state(state)
}

/// The complete application: routes, sessions and request tracing.
pub fn app<U, S>(state: AppState<U>, session_store: S, session: SessionSettings) -> Router
where
    U: UnitOfWork + 'static,
    S: SessionStore + Clone,
{
    router(state)
        .layer(Extension(session))
        .layer(session::session_layer(session_store, session))
        .layer(TraceLayer::new_for_http())
}
