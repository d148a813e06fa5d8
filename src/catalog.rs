//! Product catalog: public listing and admin edits.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::model::{CurrentUser, Product, ProductId, ProductInput};
use crate::sanitize::{coerce_decimal, coerce_i32, coerce_optional_text, coerce_text, price_limit};
use crate::{TransactionError, UnitOfWork, UnitOfWorkSession};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error(transparent)]
    Store(#[from] TransactionError),
}

/// Coerces and validates the fields of a create or update request.
///
/// The name is required, the price must be positive once rounded to cents
/// and the quantity must not be negative.
pub fn parse_product(body: &Value) -> Result<ProductInput, CatalogError> {
    let name = coerce_text(body.get("name")).trim().to_string();
    let price = coerce_decimal(body.get("price")).round_dp(2);
    let quantity = coerce_i32(body.get("quantity"));

    if name.is_empty() {
        return Err(CatalogError::Validation("name is required".to_string()));
    }
    if price <= Decimal::ZERO {
        return Err(CatalogError::Validation(
            "price must be greater than zero".to_string(),
        ));
    }
    if price >= price_limit() {
        return Err(CatalogError::Validation("price is out of range".to_string()));
    }
    if quantity < 0 {
        return Err(CatalogError::Validation(
            "quantity must not be negative".to_string(),
        ));
    }

    Ok(ProductInput {
        name,
        description: coerce_optional_text(body.get("description")),
        price,
        quantity,
        image_url: coerce_optional_text(body.get("image_url")),
    })
}

pub struct Catalog<'a, U> {
    store: &'a U,
}

impl<'a, U: UnitOfWork> Catalog<'a, U> {
    pub fn new(store: &'a U) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        let session = self.store.begin().await?;
        let products = session.products().list().await?;
        session.commit().await?;
        Ok(products)
    }

    pub async fn create(
        &self,
        admin: &CurrentUser,
        input: &ProductInput,
    ) -> Result<ProductId, CatalogError> {
        let session = self.store.begin().await?;
        let id = session.products().insert(input).await?;
        session.commit().await?;

        tracing::info!(admin = %admin.username, product = %id, name = %input.name, "product created");
        Ok(id)
    }

    pub async fn update(
        &self,
        admin: &CurrentUser,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<(), CatalogError> {
        let session = self.store.begin().await?;
        if !session.products().update(id, input).await? {
            session.rollback().await?;
            return Err(CatalogError::NotFound(id));
        }
        session.commit().await?;

        tracing::info!(admin = %admin.username, product = %id, "product updated");
        Ok(())
    }

    pub async fn delete(&self, admin: &CurrentUser, id: ProductId) -> Result<(), CatalogError> {
        let session = self.store.begin().await?;
        let Some(product) = session.products().find(id).await? else {
            session.rollback().await?;
            return Err(CatalogError::NotFound(id));
        };
        session.products().delete(id).await?;
        session.commit().await?;

        tracing::info!(admin = %admin.username, product = %id, name = %product.name, "product deleted");
        Ok(())
    }
}
