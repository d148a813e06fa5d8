//! Storefront domain types shared by the repositories, services and HTTP layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Defines an `i64`-backed identifier that cannot be mixed up with other ids.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Server-assigned product identifier.
    ProductId
);
define_id!(
    /// Server-assigned user identifier.
    UserId
);
define_id!(
    /// Server-assigned order line identifier.
    OrderLineId
);

/// A catalog entry together with its quantity on hand.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub image_url: Option<String>,
}

/// Validated fields for creating or replacing a product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub image_url: Option<String>,
}

/// A stored account. `password` holds either a legacy plaintext value or a
/// PHC hash string; see [`Credential`](crate::auth::Credential).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub is_admin: bool,
}

/// One persisted order record. Name and price are snapshots taken at
/// checkout time and never follow later catalog edits.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i32,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Display name of the buyer, `"Guest"` for lines without a user.
    pub fn customer(&self) -> &str {
        self.username.as_deref().unwrap_or("Guest")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub user_id: Option<UserId>,
    pub username: Option<String>,
}

/// The authenticated caller as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}
