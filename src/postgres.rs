//! PostgreSQL repositories sharing one session [`Executor`].
//!
//! All statements are parameterized. Stock reads take a row lock
//! (`FOR UPDATE`) so the check-then-decrement of a checkout cannot be
//! invalidated by a concurrent transaction before it commits.

use async_trait::async_trait;

use crate::model::{
    NewOrderLine, NewUser, OrderLine, OrderLineId, Product, ProductId, ProductInput, User, UserId,
};
use crate::repository::{
    InventoryLedger, LedgerError, OrderRepository, ProductRepository, UserRepository,
};
use crate::{Executor, TransactionError, TransactionResult};

const PRODUCT_COLUMNS: &str = "id, name, description, price, quantity, image_url";
const ORDER_LINE_COLUMNS: &str = "id, name, price, quantity, user_id, username, created_at";

#[derive(Debug, Clone)]
pub struct PgProductRepository {
    executor: Executor,
}

impl PgProductRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list(&self) -> TransactionResult<Vec<Product>> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product ORDER BY id"
        ))
        .fetch_all(&mut **tx)
        .await?;
        Ok(products)
    }

    async fn find(&self, id: ProductId) -> TransactionResult<Option<Product>> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(product)
    }

    async fn insert(&self, product: &ProductInput) -> TransactionResult<ProductId> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let (id,): (ProductId,) = sqlx::query_as(
            "INSERT INTO product (name, description, price, quantity, image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.image_url)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: ProductId, product: &ProductInput) -> TransactionResult<bool> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let result = sqlx::query(
            "UPDATE product SET name = $1, description = $2, price = $3, quantity = $4, \
             image_url = $5 WHERE id = $6",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.image_url)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: ProductId) -> TransactionResult<bool> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct PgInventoryLedger {
    executor: Executor,
}

impl PgInventoryLedger {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl InventoryLedger for PgInventoryLedger {
    async fn lock_stock(&self, ids: &[ProductId]) -> TransactionResult<()> {
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        sqlx::query("SELECT id FROM product WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&ids)
            .fetch_all(&mut **tx)
            .await?;
        Ok(())
    }

    async fn get_stock(&self, id: ProductId) -> Result<i32, LedgerError> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT quantity FROM product WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(TransactionError::from)?;

        row.map(|(quantity,)| quantity)
            .ok_or(LedgerError::NotFound(id))
    }

    async fn decrement_stock(&self, id: ProductId, amount: i32) -> Result<(), LedgerError> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let updated: Option<(i32,)> = sqlx::query_as(
            "UPDATE product SET quantity = quantity - $2 \
             WHERE id = $1 AND quantity >= $2 RETURNING quantity",
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await
        .map_err(TransactionError::from)?;

        if updated.is_some() {
            return Ok(());
        }

        // Nothing updated: either the row is gone or stock is short.
        let current: Option<(i32,)> = sqlx::query_as("SELECT quantity FROM product WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(TransactionError::from)?;

        match current {
            None => Err(LedgerError::NotFound(id)),
            Some((available,)) => Err(LedgerError::InsufficientStock {
                product: id,
                available,
                requested: amount,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    executor: Executor,
}

impl PgOrderRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, line: &NewOrderLine) -> TransactionResult<OrderLineId> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let (id,): (OrderLineId,) = sqlx::query_as(
            "INSERT INTO order_line (name, price, quantity, user_id, username) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&line.name)
        .bind(line.price)
        .bind(line.quantity)
        .bind(line.user_id)
        .bind(&line.username)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn list_for_user(&self, user: UserId) -> TransactionResult<Vec<OrderLine>> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM order_line WHERE user_id = $1 ORDER BY id DESC"
        ))
        .bind(user)
        .fetch_all(&mut **tx)
        .await?;
        Ok(lines)
    }

    async fn list_all(&self) -> TransactionResult<Vec<OrderLine>> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let lines = sqlx::query_as::<_, OrderLine>(&format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM order_line ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&mut **tx)
        .await?;
        Ok(lines)
    }
}

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    executor: Executor,
}

impl PgUserRepository {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_username(&self, username: &str) -> TransactionResult<Option<User>> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, is_admin FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &NewUser) -> TransactionResult<UserId> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        let (id,): (UserId,) = sqlx::query_as(
            "INSERT INTO users (username, password, is_admin) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.is_admin)
        .fetch_one(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn update_password(&self, id: UserId, password: &str) -> TransactionResult<()> {
        let mut guard = self.executor.lock().await;
        let tx = Executor::live(&mut guard)?;
        sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
