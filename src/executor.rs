use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::{TransactionError, TransactionResult};

/// Executor wraps a database transaction for use by repositories.
///
/// Every Postgres repository of a session holds a clone, so product,
/// inventory, order and user statements all run inside the same
/// transaction and see each other's row locks.
#[derive(Clone, Debug)]
pub struct Executor {
    tx: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl Executor {
    /// Creates a new Executor from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Locks the transaction slot for the duration of one statement.
    /// Pass the guard to [`Executor::live`] to reach the transaction.
    pub async fn lock(&self) -> MutexGuard<'_, Option<Transaction<'static, Postgres>>> {
        self.tx.lock().await
    }

    /// The live transaction inside a locked slot.
    ///
    /// Fails with [`TransactionError::Closed`] once the session has been
    /// committed or rolled back.
    pub fn live<'a>(
        slot: &'a mut Option<Transaction<'static, Postgres>>,
    ) -> TransactionResult<&'a mut Transaction<'static, Postgres>> {
        slot.as_mut().ok_or(TransactionError::Closed)
    }

    /// Takes ownership of the transaction, leaving None in its place.
    /// This should only be called when committing or rolling back.
    pub(crate) async fn take_transaction(&self) -> TransactionResult<Transaction<'static, Postgres>> {
        self.tx.lock().await.take().ok_or(TransactionError::Closed)
    }
}
