//! Storefront
//!
//! A product catalog with cart checkout, user accounts and an admin surface,
//! backed by PostgreSQL. All store access goes through a unit of work: a
//! session bundles the repositories bound to one transaction and ends in
//! either a commit or a rollback. Checkout relies on this to place every
//! line of a cart or none of them.

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod database;
pub mod executor;
pub mod http;
pub mod memory;
pub mod model;
pub mod orders;
pub mod postgres;
pub mod repository;
pub mod sanitize;
pub mod state;
pub mod telemetry;
pub mod transaction_aware;
pub mod unit_of_work;

pub use executor::Executor;
pub use memory::InMemoryUnitOfWork;
pub use state::AppState;
pub use transaction_aware::{TransactionAware, TransactionError, TransactionResult};
pub use unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkSession, UnitOfWork, UnitOfWorkSession};
