//! `PostgreSQL` order repository.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use tienda_core::{OrderId, Price};

use crate::models::{CartItem, CartTotals, CustomerDetails, Order};

use super::{OrderRepository, RepositoryError};

/// Embedded schema migrations for the `orders` table.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Orders stored one row per order; lines are a JSON document column.
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn price(row: &PgRow, column: &str) -> Result<Price, RepositoryError> {
    let amount: Decimal = row.try_get(column)?;
    Price::new(amount)
        .map_err(|e| RepositoryError::DataCorruption(format!("{column} in database: {e}")))
}

fn order_from_row(row: &PgRow) -> Result<Order, RepositoryError> {
    let items: String = row.try_get("items")?;
    let items: Vec<CartItem> = serde_json::from_str(&items)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid order items: {e}")))?;

    Ok(Order {
        id: row.try_get::<OrderId, _>("id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        items,
        totals: CartTotals {
            subtotal: price(row, "subtotal")?,
            tax: price(row, "tax")?,
            shipping: price(row, "shipping")?,
            total: price(row, "total")?,
        },
        customer: CustomerDetails {
            name: row.try_get("customer_name")?,
            address: row.try_get("address")?,
            card_hint: row.try_get("card_hint")?,
        },
    })
}

impl OrderRepository for PgOrderRepository {
    async fn append(&self, order: &Order) -> Result<(), RepositoryError> {
        let items = serde_json::to_string(&order.items)
            .map_err(|e| RepositoryError::DataCorruption(format!("unencodable items: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO orders
                (id, created_at, customer_name, address, card_hint,
                 subtotal, tax, shipping, total, items)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(order.id)
        .bind(order.created_at)
        .bind(&order.customer.name)
        .bind(&order.customer.address)
        .bind(&order.customer.card_hint)
        .bind(order.totals.subtotal.amount())
        .bind(order.totals.tax.amount())
        .bind(order.totals.shipping.amount())
        .bind(order.totals.total.amount())
        .bind(items)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Conflict(format!("order {} exists", order.id))
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, created_at, customer_name, address, card_hint,
                   subtotal, tax, shipping, total, items
            FROM orders
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(order_from_row).collect()
    }

    async fn latest_id(&self) -> Result<Option<OrderId>, RepositoryError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(id.map(OrderId::new))
    }
}
