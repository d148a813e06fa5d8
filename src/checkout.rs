//! Order placement: the all-or-nothing checkout of a cart.
//!
//! A checkout runs inside one unit-of-work session. Every cart line is
//! checked against a locked stock read, recorded as an order line and
//! deducted from inventory; the first failing line rolls the whole batch
//! back, so either every line is committed or none is.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{CurrentUser, NewOrderLine, ProductId};
use crate::repository::LedgerError;
use crate::sanitize::{coerce_i32, coerce_int, coerce_price, coerce_text};
use crate::{TransactionAware, TransactionError, TransactionResult, UnitOfWork, UnitOfWorkSession};

/// One requested (product, quantity) pair.
///
/// `name` and `unit_price` come from the client and are recorded on the
/// order line as given, the price rounded to cents.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    /// Coerces one JSON cart entry. Accepts `id` or `product_id` for the
    /// product; missing or malformed fields become zero or empty.
    pub fn from_value(value: &Value) -> Self {
        let id = value.get("id").or_else(|| value.get("product_id"));
        Self {
            product_id: ProductId::new(coerce_int(id)),
            name: coerce_text(value.get("name")).trim().to_string(),
            unit_price: coerce_price(value.get("price")),
            quantity: coerce_i32(value.get("quantity")),
        }
    }

    fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("product {}", self.product_id)
        } else {
            self.name.clone()
        }
    }
}

/// Reads the cart lines out of a checkout body: either a bare array or an
/// object carrying an `items` array. Anything else is an empty cart.
pub fn parse_cart(body: &Value) -> Vec<CartLine> {
    let items: &[Value] = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(fields) => match fields.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    items.iter().map(CartLine::from_value).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("line {line}: quantity must be at least 1, got {quantity}")]
    InvalidQuantity { line: usize, quantity: i32 },

    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error(transparent)]
    Store(#[from] TransactionError),
}

/// Result of a committed checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReceipt {
    /// Number of order lines written.
    pub lines: usize,
    /// Correlation id of this checkout in logs and responses.
    pub reference: Uuid,
}

/// Places orders against an injected store.
pub struct CheckoutCoordinator<'a, U> {
    store: &'a U,
}

impl<'a, U: UnitOfWork> CheckoutCoordinator<'a, U> {
    pub fn new(store: &'a U) -> Self {
        Self { store }
    }

    /// Validates the cart, then applies every line in submission order
    /// inside one session. Commits only if all lines succeed.
    pub async fn place_order(
        &self,
        customer: &CurrentUser,
        lines: Vec<CartLine>,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        validate(&lines)?;

        let reference = Uuid::new_v4();
        let session = self.store.begin().await?;
        session.register_transaction_aware(Arc::new(CheckoutAudit {
            reference,
            username: customer.username.clone(),
            lines: lines.len(),
        }));

        match apply_lines(&session, customer, &lines).await {
            Ok(()) => {
                session.commit().await?;
                Ok(CheckoutReceipt {
                    lines: lines.len(),
                    reference,
                })
            }
            Err(error) => {
                if let Err(rollback_error) = session.rollback().await {
                    tracing::error!(
                        %reference,
                        error = %rollback_error,
                        "checkout rollback failed"
                    );
                }
                Err(error)
            }
        }
    }
}

fn validate(lines: &[CartLine]) -> Result<(), CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    match lines.iter().position(|line| line.quantity < 1) {
        Some(index) => Err(CheckoutError::InvalidQuantity {
            line: index + 1,
            quantity: lines[index].quantity,
        }),
        None => Ok(()),
    }
}

async fn apply_lines<S: UnitOfWorkSession>(
    session: &S,
    customer: &CurrentUser,
    lines: &[CartLine],
) -> Result<(), CheckoutError> {
    // Rows are locked in id order up front so crossed carts wait on each
    // other instead of deadlocking.
    let mut ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    session.inventory().lock_stock(&ids).await?;

    for line in lines {
        let available = session
            .inventory()
            .get_stock(line.product_id)
            .await
            .map_err(|error| ledger_failure(line, error))?;

        if available < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                product: line.display_name(),
                available,
                requested: line.quantity,
            });
        }

        session
            .orders()
            .insert(&NewOrderLine {
                name: line.name.clone(),
                price: line.unit_price,
                quantity: line.quantity,
                user_id: Some(customer.id),
                username: Some(customer.username.clone()),
            })
            .await?;

        session
            .inventory()
            .decrement_stock(line.product_id, line.quantity)
            .await
            .map_err(|error| ledger_failure(line, error))?;
    }
    Ok(())
}

fn ledger_failure(line: &CartLine, error: LedgerError) -> CheckoutError {
    match error {
        LedgerError::NotFound(id) => CheckoutError::NotFound(id),
        LedgerError::InsufficientStock {
            available,
            requested,
            ..
        } => CheckoutError::InsufficientStock {
            product: line.display_name(),
            available,
            requested,
        },
        LedgerError::Store(error) => CheckoutError::Store(error),
    }
}

/// Writes the audit record of a checkout once its session has ended.
struct CheckoutAudit {
    reference: Uuid,
    username: String,
    lines: usize,
}

#[async_trait]
impl TransactionAware for CheckoutAudit {
    async fn on_commit(&self) -> TransactionResult<()> {
        tracing::info!(
            reference = %self.reference,
            user = %self.username,
            lines = self.lines,
            "order placed"
        );
        Ok(())
    }

    async fn on_rollback(&self) -> TransactionResult<()> {
        tracing::warn!(
            reference = %self.reference,
            user = %self.username,
            lines = self.lines,
            "order rolled back"
        );
        Ok(())
    }
}
