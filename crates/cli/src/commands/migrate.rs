//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! TIENDA_DATABASE_URL=postgres://localhost/tienda tienda migrate
//! ```
//!
//! Applies the storefront's embedded migrations (the `orders` table). Only
//! available with the `postgres` feature.

use tienda_storefront::StorefrontConfig;
use tienda_storefront::db::{MIGRATOR, create_pool};

use crate::error::Result;

/// Run the storefront migrations against `TIENDA_DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if no database URL is configured, the connection fails,
/// or a migration fails.
pub async fn run(config: &StorefrontConfig) -> Result<()> {
    let database_url = config
        .require_database_url()
        .map_err(tienda_storefront::AppError::from)?;

    tracing::info!("Connecting to storefront database...");
    let pool = create_pool(database_url).await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete");
    #[allow(clippy::print_stdout)]
    {
        println!("Migrations applied");
    }
    Ok(())
}
