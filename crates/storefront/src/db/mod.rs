//! Order persistence.
//!
//! Orders are appended once and read back in insertion order. Call sites
//! depend only on [`OrderRepository`]; three back ends implement it:
//!
//! - [`MemoryOrderRepository`] - process-local, for tests and throwaway runs
//! - [`LocalOrderRepository`] - JSON list under the `orders` record of a
//!   [`LocalStore`](crate::storage::LocalStore)
//! - `PgOrderRepository` - `PostgreSQL` table (feature `postgres`)
//!
//! # Migrations
//!
//! The `PostgreSQL` schema lives in `crates/storefront/migrations/` and is
//! applied with:
//! ```bash
//! cargo run -p tienda-cli --features postgres -- migrate
//! ```

mod local;
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use local::LocalOrderRepository;
pub use memory::MemoryOrderRepository;
#[cfg(feature = "postgres")]
pub use postgres::{MIGRATOR, PgOrderRepository, create_pool};

use std::future::Future;

use thiserror::Error;

use tienda_core::OrderId;

use crate::models::Order;
use crate::storage::StorageError;

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Local store error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Database error from sqlx.
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// An order with the same id already exists.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Append-only order history.
pub trait OrderRepository: Clone + Send + Sync + 'static {
    /// Append `order` after every existing one.
    ///
    /// Fails with [`RepositoryError::Conflict`] if its id is already taken.
    fn append(&self, order: &Order) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// All orders, oldest first.
    fn list(&self) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Id of the most recently appended order.
    fn latest_id(&self) -> impl Future<Output = Result<Option<OrderId>, RepositoryError>> + Send {
        async move { Ok(self.list().await?.last().map(|order| order.id)) }
    }
}
