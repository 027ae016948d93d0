//! CLI error type.

use thiserror::Error;

use tienda_storefront::AppError;

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum CliError {
    /// Storefront operation failed.
    #[error(transparent)]
    App(#[from] AppError),

    /// Reading from stdin failed.
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),

    /// Database connection failed.
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migrations could not be applied.
    #[cfg(feature = "postgres")]
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl CliError {
    /// Message shown on stderr.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::App(err) => err.user_message(),
            Self::Input(_) => "Could not read input",
            #[cfg(feature = "postgres")]
            Self::Database(_) => "Could not connect to the database",
            #[cfg(feature = "postgres")]
            Self::Migrate(_) => "Database migrations failed",
        }
    }

    /// Log the full error.
    pub fn report(&self) {
        match self {
            Self::App(err) => err.report(),
            other => tracing::error!(error = %other, "Command failed"),
        }
    }
}

/// Result type alias for `CliError`.
pub type Result<T> = std::result::Result<T, CliError>;
