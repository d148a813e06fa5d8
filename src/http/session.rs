//! Session cookie configuration and the access-gate extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};

use super::error::ApiError;
use crate::config::SessionSettings;
use crate::model::CurrentUser;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sid";

/// Session key holding the logged-in [`CurrentUser`].
const CURRENT_USER: &str = "current_user";

/// Create the session layer over any session store. Expiry is set per
/// session at login, see [`set_current_user`].
pub fn session_layer<S>(store: S, settings: SessionSettings) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(settings.secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Stores the identity after a successful login. The session id is
/// rotated first so a pre-login cookie cannot be reused, and the session
/// expires `ttl_secs` after login regardless of activity.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
    ttl_secs: i64,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.set_expiry(Some(Expiry::AtDateTime(
        OffsetDateTime::now_utc() + Duration::seconds(ttl_secs),
    )));
    session.insert(CURRENT_USER, user).await
}

/// Ends the session and removes its record from the store.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session.get::<CurrentUser>(CURRENT_USER).await.ok().flatten()
}

/// Extractor that requires a logged-in user; rejects with 401 otherwise.
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts)
            .await
            .map(Self)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Extractor that requires an administrator: 401 when nobody is logged
/// in, 403 when the caller is a regular user.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await.ok_or(ApiError::Unauthorized)?;
        if !user.is_admin() {
            tracing::warn!(user = %user.username, path = %parts.uri.path(), "admin access denied");
            return Err(ApiError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}
