use async_trait::async_trait;

/// Error type for store and transaction operations.
///
/// Every repository call and every unit-of-work lifecycle step reports
/// failures through this type. Handlers surface it as a generic 5xx.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Transaction already finished")]
    Closed,

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl TransactionError {
    /// Whether the failure was caused by a uniqueness constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Constraint(name) => name.ends_with("_key"),
            Self::DatabaseError(sqlx::Error::Database(error)) => error.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type for transaction-aware operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Observers registered with a [`UnitOfWorkSession`](crate::UnitOfWorkSession)
/// receive exactly one callback: `on_commit` after a successful commit or
/// `on_rollback` after a rollback. Checkout uses this to emit its audit record.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> TransactionResult<()>;

    /// Called after a transaction rollback.
    async fn on_rollback(&self) -> TransactionResult<()>;
}
