//! In-memory store implementing the same unit-of-work contract as Postgres.
//!
//! Sessions are serialized: `begin` waits for the previous session to end,
//! then works on a staged copy of the data. `commit` publishes the copy,
//! `rollback` (or dropping the session) throws it away. This gives tests and
//! the `--in-memory` server mode the same all-or-nothing and no-oversell
//! behavior the database provides through row locks.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

use crate::model::{
    NewOrderLine, NewUser, OrderLine, OrderLineId, Product, ProductId, ProductInput, User, UserId,
};
use crate::repository::{
    InventoryLedger, LedgerError, OrderRepository, ProductRepository, UserRepository,
};
use crate::unit_of_work::{notify_commit, notify_rollback};
use crate::{
    TransactionAware, TransactionError, TransactionResult, UnitOfWork, UnitOfWorkSession,
};

#[derive(Debug, Clone, Default)]
struct StoreData {
    products: BTreeMap<ProductId, Product>,
    users: BTreeMap<UserId, User>,
    orders: Vec<OrderLine>,
    last_product_id: i64,
    last_user_id: i64,
    last_order_id: i64,
}

/// Store handle backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWork {
    data: Arc<tokio::sync::Mutex<StoreData>>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Session = InMemorySession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let published = Arc::clone(&self.data).lock_owned().await;
        let staged = published.clone();
        Ok(InMemorySession {
            published,
            repositories: InMemoryRepositories {
                staged: Arc::new(Mutex::new(staged)),
            },
            observers: Arc::new(RwLock::new(Vec::new())),
        })
    }
}

/// A pending in-memory transaction.
pub struct InMemorySession {
    published: OwnedMutexGuard<StoreData>,
    repositories: InMemoryRepositories,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

#[async_trait]
impl UnitOfWorkSession for InMemorySession {
    fn products(&self) -> &dyn ProductRepository {
        &self.repositories
    }

    fn inventory(&self) -> &dyn InventoryLedger {
        &self.repositories
    }

    fn orders(&self) -> &dyn OrderRepository {
        &self.repositories
    }

    fn users(&self) -> &dyn UserRepository {
        &self.repositories
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        let mut published = self.published;
        *published = std::mem::take(&mut *self.repositories.staged.lock());
        drop(published);

        let observers = self.observers.read().clone();
        notify_commit(&observers).await
    }

    async fn rollback(self) -> TransactionResult<()> {
        drop(self.published);

        let observers = self.observers.read().clone();
        notify_rollback(&observers).await
    }
}

/// Repositories over the staged copy of one session.
struct InMemoryRepositories {
    staged: Arc<Mutex<StoreData>>,
}

#[async_trait]
impl ProductRepository for InMemoryRepositories {
    async fn list(&self) -> TransactionResult<Vec<Product>> {
        Ok(self.staged.lock().products.values().cloned().collect())
    }

    async fn find(&self, id: ProductId) -> TransactionResult<Option<Product>> {
        Ok(self.staged.lock().products.get(&id).cloned())
    }

    async fn insert(&self, product: &ProductInput) -> TransactionResult<ProductId> {
        if product.quantity < 0 {
            return Err(TransactionError::Constraint("product_quantity_check".to_string()));
        }
        let mut data = self.staged.lock();
        data.last_product_id += 1;
        let id = ProductId::new(data.last_product_id);
        data.products.insert(
            id,
            Product {
                id,
                name: product.name.clone(),
                description: product.description.clone(),
                price: product.price,
                quantity: product.quantity,
                image_url: product.image_url.clone(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: ProductId, product: &ProductInput) -> TransactionResult<bool> {
        if product.quantity < 0 {
            return Err(TransactionError::Constraint("product_quantity_check".to_string()));
        }
        let mut data = self.staged.lock();
        let Some(existing) = data.products.get_mut(&id) else {
            return Ok(false);
        };
        existing.name = product.name.clone();
        existing.description = product.description.clone();
        existing.price = product.price;
        existing.quantity = product.quantity;
        existing.image_url = product.image_url.clone();
        Ok(true)
    }

    async fn delete(&self, id: ProductId) -> TransactionResult<bool> {
        Ok(self.staged.lock().products.remove(&id).is_some())
    }
}

#[async_trait]
impl InventoryLedger for InMemoryRepositories {
    // The session already holds the whole store.
    async fn lock_stock(&self, _ids: &[ProductId]) -> TransactionResult<()> {
        Ok(())
    }

    async fn get_stock(&self, id: ProductId) -> Result<i32, LedgerError> {
        self.staged
            .lock()
            .products
            .get(&id)
            .map(|product| product.quantity)
            .ok_or(LedgerError::NotFound(id))
    }

    async fn decrement_stock(&self, id: ProductId, amount: i32) -> Result<(), LedgerError> {
        let mut data = self.staged.lock();
        let product = data.products.get_mut(&id).ok_or(LedgerError::NotFound(id))?;
        if product.quantity < amount {
            return Err(LedgerError::InsufficientStock {
                product: id,
                available: product.quantity,
                requested: amount,
            });
        }
        product.quantity -= amount;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepositories {
    async fn insert(&self, line: &NewOrderLine) -> TransactionResult<OrderLineId> {
        let mut data = self.staged.lock();
        data.last_order_id += 1;
        let id = OrderLineId::new(data.last_order_id);
        data.orders.push(OrderLine {
            id,
            name: line.name.clone(),
            price: line.price,
            quantity: line.quantity,
            user_id: line.user_id,
            username: line.username.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_for_user(&self, user: UserId) -> TransactionResult<Vec<OrderLine>> {
        let data = self.staged.lock();
        let mut lines: Vec<OrderLine> = data
            .orders
            .iter()
            .filter(|line| line.user_id == Some(user))
            .cloned()
            .collect();
        lines.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(lines)
    }

    async fn list_all(&self) -> TransactionResult<Vec<OrderLine>> {
        let mut lines = self.staged.lock().orders.clone();
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(lines)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepositories {
    async fn find_by_username(&self, username: &str) -> TransactionResult<Option<User>> {
        Ok(self
            .staged
            .lock()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert(&self, user: &NewUser) -> TransactionResult<UserId> {
        let mut data = self.staged.lock();
        if data.users.values().any(|existing| existing.username == user.username) {
            return Err(TransactionError::Constraint("users_username_key".to_string()));
        }
        data.last_user_id += 1;
        let id = UserId::new(data.last_user_id);
        data.users.insert(
            id,
            User {
                id,
                username: user.username.clone(),
                password: user.password.clone(),
                is_admin: user.is_admin,
            },
        );
        Ok(id)
    }

    async fn update_password(&self, id: UserId, password: &str) -> TransactionResult<()> {
        if let Some(user) = self.staged.lock().users.get_mut(&id) {
            user.password = password.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Flags {
        committed: AtomicBool,
        rolled_back: AtomicBool,
    }

    #[async_trait]
    impl TransactionAware for Flags {
        async fn on_commit(&self) -> TransactionResult<()> {
            self.committed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn on_rollback(&self) -> TransactionResult<()> {
            self.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn bread(quantity: i32) -> ProductInput {
        ProductInput {
            name: "Sourdough".to_string(),
            description: None,
            price: Decimal::new(450, 2),
            quantity,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_sessions() {
        let store = InMemoryUnitOfWork::new();

        let session = store.begin().await.expect("Failed to begin");
        let flags = Arc::new(Flags::default());
        session.register_transaction_aware(flags.clone());
        let id = session.products().insert(&bread(4)).await.expect("Failed to insert");
        session.commit().await.expect("Failed to commit");

        assert!(flags.committed.load(Ordering::SeqCst));
        assert!(!flags.rolled_back.load(Ordering::SeqCst));

        let verify = store.begin().await.expect("Failed to begin");
        let product = verify.products().find(id).await.expect("Failed to find");
        assert_eq!(product.map(|p| p.quantity), Some(4));
    }

    #[tokio::test]
    async fn rolled_back_writes_are_discarded() {
        let store = InMemoryUnitOfWork::new();

        let session = store.begin().await.expect("Failed to begin");
        let flags = Arc::new(Flags::default());
        session.register_transaction_aware(flags.clone());
        session.products().insert(&bread(4)).await.expect("Failed to insert");
        session.rollback().await.expect("Failed to rollback");

        assert!(flags.rolled_back.load(Ordering::SeqCst));
        assert!(!flags.committed.load(Ordering::SeqCst));

        let verify = store.begin().await.expect("Failed to begin");
        assert!(verify.products().list().await.expect("Failed to list").is_empty());
    }

    #[tokio::test]
    async fn dropped_session_behaves_like_rollback() {
        let store = InMemoryUnitOfWork::new();

        {
            let session = store.begin().await.expect("Failed to begin");
            session.products().insert(&bread(1)).await.expect("Failed to insert");
        }

        let verify = store.begin().await.expect("Failed to begin");
        assert!(verify.products().list().await.expect("Failed to list").is_empty());
    }

    #[tokio::test]
    async fn decrement_never_drives_stock_negative() {
        let store = InMemoryUnitOfWork::new();
        let session = store.begin().await.expect("Failed to begin");
        let id = session.products().insert(&bread(2)).await.expect("Failed to insert");

        let result = session.inventory().decrement_stock(id, 3).await;
        assert!(
            matches!(
                result,
                Err(LedgerError::InsufficientStock { available: 2, requested: 3, .. })
            ),
            "expected InsufficientStock, got {result:?}"
        );
        assert_eq!(session.inventory().get_stock(id).await.expect("stock"), 2);

        session.inventory().decrement_stock(id, 2).await.expect("Failed to decrement");
        assert_eq!(session.inventory().get_stock(id).await.expect("stock"), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let store = InMemoryUnitOfWork::new();
        let session = store.begin().await.expect("Failed to begin");

        let result = session.inventory().get_stock(ProductId::new(42)).await;
        assert!(matches!(result, Err(LedgerError::NotFound(id)) if id == ProductId::new(42)));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let store = InMemoryUnitOfWork::new();
        let session = store.begin().await.expect("Failed to begin");
        let user = NewUser {
            username: "ana".to_string(),
            password: "secret".to_string(),
            is_admin: false,
        };

        session.users().insert(&user).await.expect("Failed to insert");
        let error = session.users().insert(&user).await.expect_err("duplicate accepted");
        assert!(error.is_unique_violation());
    }
}
