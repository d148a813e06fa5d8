use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::postgres::{
    PgInventoryLedger, PgOrderRepository, PgProductRepository, PgUserRepository,
};
use crate::repository::{InventoryLedger, OrderRepository, ProductRepository, UserRepository};
use crate::{Executor, TransactionAware, TransactionError, TransactionResult};

/// Unit of Work pattern for managing store transactions.
///
/// The UnitOfWork is the store handle injected into every service. It opens
/// sessions; all reads and writes happen through the repositories a session
/// hands out.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> TransactionResult<Self::Session>;
}

/// Represents a single store transaction.
///
/// A session starts out pending and ends in exactly one of two states:
/// committed or rolled back. Dropping a session without either discards
/// its writes.
#[async_trait]
pub trait UnitOfWorkSession: Send + Sync {
    fn products(&self) -> &dyn ProductRepository;

    fn inventory(&self) -> &dyn InventoryLedger;

    fn orders(&self) -> &dyn OrderRepository;

    fn users(&self) -> &dyn UserRepository;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction and notify all registered observers.
    async fn commit(self) -> TransactionResult<()>;

    /// Rollback the transaction and notify all registered observers.
    async fn rollback(self) -> TransactionResult<()>;
}

/// Notifies observers in registration order.
pub(crate) async fn notify_commit(observers: &[Arc<dyn TransactionAware>]) -> TransactionResult<()> {
    for observer in observers {
        observer.on_commit().await?;
    }
    Ok(())
}

pub(crate) async fn notify_rollback(
    observers: &[Arc<dyn TransactionAware>],
) -> TransactionResult<()> {
    for observer in observers {
        observer.on_rollback().await?;
    }
    Ok(())
}

/// Default implementation of UnitOfWork for PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresUnitOfWork {
    pool: Arc<PgPool>,
}

impl PostgresUnitOfWork {
    /// Create a new PostgresUnitOfWork with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Session = PostgresUnitOfWorkSession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWorkSession::new(tx))
    }
}

/// Default implementation of UnitOfWorkSession for PostgreSQL.
pub struct PostgresUnitOfWorkSession {
    executor: Executor,
    products: PgProductRepository,
    inventory: PgInventoryLedger,
    orders: PgOrderRepository,
    users: PgUserRepository,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl PostgresUnitOfWorkSession {
    /// Create a new session from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        let executor = Executor::new(tx);
        Self {
            products: PgProductRepository::new(executor.clone()),
            inventory: PgInventoryLedger::new(executor.clone()),
            orders: PgOrderRepository::new(executor.clone()),
            users: PgUserRepository::new(executor.clone()),
            executor,
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the executor for this session (provides access to the transaction).
    pub fn executor(&self) -> &Executor {
        &self.executor
    }
}

#[async_trait]
impl UnitOfWorkSession for PostgresUnitOfWorkSession {
    fn products(&self) -> &dyn ProductRepository {
        &self.products
    }

    fn inventory(&self) -> &dyn InventoryLedger {
        &self.inventory
    }

    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        tx.commit()
            .await
            .map_err(|error| TransactionError::CommitFailed(error.to_string()))?;

        let observers = self.observers.read().clone();
        notify_commit(&observers).await
    }

    async fn rollback(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        tx.rollback()
            .await
            .map_err(|error| TransactionError::RollbackFailed(error.to_string()))?;

        let observers = self.observers.read().clone();
        notify_rollback(&observers).await
    }
}
