//! Read-only order history.

use crate::model::{OrderLine, UserId};
use crate::{TransactionResult, UnitOfWork, UnitOfWorkSession};

pub struct OrderHistory<'a, U> {
    store: &'a U,
}

impl<'a, U: UnitOfWork> OrderHistory<'a, U> {
    pub fn new(store: &'a U) -> Self {
        Self { store }
    }

    /// Lines placed by one user, newest first.
    pub async fn list_for_user(&self, user: UserId) -> TransactionResult<Vec<OrderLine>> {
        let session = self.store.begin().await?;
        let lines = session.orders().list_for_user(user).await?;
        session.commit().await?;
        Ok(lines)
    }

    /// Every order line in the store, newest first.
    pub async fn list_all(&self) -> TransactionResult<Vec<OrderLine>> {
        let session = self.store.begin().await?;
        let lines = session.orders().list_all().await?;
        session.commit().await?;
        Ok(lines)
    }
}
