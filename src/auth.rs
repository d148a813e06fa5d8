//! Accounts: registration, login and operator-created admins.
//!
//! Stored credentials come in two shapes. Accounts created by this service
//! hold an Argon2 PHC string; older rows may still hold the password in
//! plain text. A plain credential is accepted once and replaced by a hash
//! in the same session as the successful login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::model::{CurrentUser, NewUser, UserId};
use crate::sanitize::sanitize;
use crate::{TransactionError, UnitOfWork, UnitOfWorkSession};

const MIN_PASSWORD_LENGTH: usize = 6;

/// Prefix every Argon2 PHC string starts with.
const HASH_PREFIX: &str = "$argon2";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    /// Unknown user or wrong password; the two are never distinguished.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username {0} is already taken")]
    UsernameTaken(String),

    #[error("password hashing failed")]
    PasswordHash,

    #[error(transparent)]
    Store(#[from] TransactionError),
}

/// A stored credential, resolved from the raw column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Legacy value compared as-is.
    Plain(String),
    /// Argon2 PHC string.
    Hashed(String),
}

impl Credential {
    pub fn from_stored(stored: &str) -> Self {
        if stored.starts_with(HASH_PREFIX) {
            Self::Hashed(stored.to_string())
        } else {
            Self::Plain(stored.to_string())
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        match self {
            Self::Plain(stored) => stored == password,
            Self::Hashed(hash) => verify_password(password, hash),
        }
    }

    /// Whether a successful login should replace this credential with a hash.
    pub fn needs_upgrade(&self) -> bool {
        matches!(self, Self::Plain(_))
    }
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Usernames are sanitized and trimmed; passwords are taken verbatim.
fn normalize_username(username: &str) -> String {
    sanitize(username.trim()).trim().to_string()
}

fn validate_new_account(username: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "username and password are required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub struct Accounts<'a, U> {
    store: &'a U,
}

impl<'a, U: UnitOfWork> Accounts<'a, U> {
    pub fn new(store: &'a U) -> Self {
        Self { store }
    }

    /// Creates a regular account.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        let id = self.create(username, password, false).await?;
        tracing::info!(user = %id, "account registered");
        Ok(id)
    }

    /// Creates an administrator. Only reachable from the operator CLI.
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<UserId, AuthError> {
        let id = self.create(username, password, true).await?;
        tracing::info!(user = %id, "admin account created");
        Ok(id)
    }

    async fn create(&self, username: &str, password: &str, is_admin: bool) -> Result<UserId, AuthError> {
        let username = normalize_username(username);
        validate_new_account(&username, password)?;

        let session = self.store.begin().await?;
        if session.users().find_by_username(&username).await?.is_some() {
            session.rollback().await?;
            return Err(AuthError::UsernameTaken(username));
        }

        let user = NewUser {
            username: username.clone(),
            password: hash_password(password)?,
            is_admin,
        };
        let id = match session.users().insert(&user).await {
            Ok(id) => id,
            Err(error) if error.is_unique_violation() => {
                session.rollback().await?;
                return Err(AuthError::UsernameTaken(username));
            }
            Err(error) => return Err(error.into()),
        };
        session.commit().await?;
        Ok(id)
    }

    /// Checks a username and password and returns the identity to store in
    /// the session. A plain-text credential is upgraded to a hash on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let username = normalize_username(username);
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "username and password are required".to_string(),
            ));
        }

        let session = self.store.begin().await?;
        let Some(user) = session.users().find_by_username(&username).await? else {
            session.rollback().await?;
            tracing::warn!(user = %username, "login rejected: unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let credential = Credential::from_stored(&user.password);
        if !credential.verify(password) {
            session.rollback().await?;
            tracing::warn!(user = %username, "login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if credential.needs_upgrade() {
            let hash = hash_password(password)?;
            session.users().update_password(user.id, &hash).await?;
            tracing::info!(user = %username, "plain-text credential upgraded");
        }
        session.commit().await?;

        tracing::info!(user = %username, admin = user.is_admin, "login succeeded");
        Ok(CurrentUser::from(user))
    }
}
