//! Repository seams bound to a unit-of-work session.
//!
//! Every method runs inside the transaction of the session that handed out
//! the repository, so a caller composes several calls into one atomic unit
//! and decides at the end whether to commit or roll back.

use async_trait::async_trait;

use crate::model::{
    NewOrderLine, NewUser, OrderLine, OrderLineId, Product, ProductId, ProductInput, User, UserId,
};
use crate::{TransactionError, TransactionResult};

/// Catalog reads and admin edits.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All products ordered by id.
    async fn list(&self) -> TransactionResult<Vec<Product>>;

    async fn find(&self, id: ProductId) -> TransactionResult<Option<Product>>;

    async fn insert(&self, product: &ProductInput) -> TransactionResult<ProductId>;

    /// Replaces every field of an existing product. Returns `false` when no
    /// product has the given id.
    async fn update(&self, id: ProductId, product: &ProductInput) -> TransactionResult<bool>;

    /// Returns `false` when no product has the given id.
    async fn delete(&self, id: ProductId) -> TransactionResult<bool>;
}

/// Errors reported by the [`InventoryLedger`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("insufficient stock for product {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: ProductId,
        available: i32,
        requested: i32,
    },

    #[error(transparent)]
    Store(#[from] TransactionError),
}

/// Quantity on hand per product.
///
/// Stock is only ever lowered through [`decrement_stock`](Self::decrement_stock);
/// it never goes below zero.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Locks the rows of every listed product in ascending id order until
    /// the session ends. Unknown ids are skipped.
    async fn lock_stock(&self, ids: &[ProductId]) -> TransactionResult<()>;

    /// Reads the stock of a product and locks its row until the session ends.
    async fn get_stock(&self, id: ProductId) -> Result<i32, LedgerError>;

    /// Lowers stock by `amount` if at least that much is available.
    async fn decrement_stock(&self, id: ProductId, amount: i32) -> Result<(), LedgerError>;
}

/// Append-only order records.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, line: &NewOrderLine) -> TransactionResult<OrderLineId>;

    /// Lines owned by one user, newest first.
    async fn list_for_user(&self, user: UserId) -> TransactionResult<Vec<OrderLine>>;

    /// Lines of every user, newest first.
    async fn list_all(&self) -> TransactionResult<Vec<OrderLine>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> TransactionResult<Option<User>>;

    /// Fails with a unique violation when the username is taken.
    async fn insert(&self, user: &NewUser) -> TransactionResult<UserId>;

    /// Replaces the stored credential of a user.
    async fn update_password(&self, id: UserId, password: &str) -> TransactionResult<()>;
}
