//! Unified error handling.
//!
//! Provides a unified `AppError` type for everything the [`AppState`]
//! facade can fail with. Front ends show [`AppError::user_message`] and log
//! the full error with [`AppError::report`].
//!
//! [`AppState`]: crate::state::AppState

use thiserror::Error;

use tienda_core::ProductId;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order history operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Not enough stock for the requested quantity.
    #[error("Out of stock: product {product} has {available} available")]
    OutOfStock {
        /// Product requested.
        product: ProductId,
        /// Units still available after what the cart holds.
        available: u32,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether the error is a problem on our side rather than the user's input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Storage(_)
                | Self::Backend(_)
                | Self::Repository(_)
                | Self::Auth(AuthError::Storage(_))
                | Self::Checkout(CheckoutError::Repository(_))
        )
    }

    /// Static message safe to show the user.
    ///
    /// Internal details are never included.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Config(_) => "The application is misconfigured",
            Self::Storage(_) | Self::Repository(_) => "Could not access saved data",
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => "Not found",
            Self::Backend(_) => "The store is unavailable, please try again later",
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address",
                AuthError::MissingName => "Name is required",
                AuthError::MissingPassword => "Password is required",
                AuthError::LoginFailed(_) => "Login failed",
                AuthError::RegistrationFailed { .. } => "Registration failed",
                AuthError::NotAuthenticated => "Please log in first",
                AuthError::MissingToken => "Please log in again to view purchases",
                AuthError::Storage(_) => "Could not access saved data",
            },
            Self::Cart(CartError::Quantity(_)) => "Invalid quantity",
            Self::Cart(CartError::Overflow) => "Cart total is too large",
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => "Your cart is empty",
                CheckoutError::MissingFields(_) => "Please complete all required fields",
                CheckoutError::InvalidCard => "Invalid card number",
                CheckoutError::Cart(_) => "Cart total is too large",
                CheckoutError::Repository(_) => "Could not save your order",
            },
            Self::OutOfStock { .. } => "Not enough stock",
        }
    }

    /// Log the error with the level its kind deserves.
    pub fn report(&self) {
        if self.is_internal() {
            tracing::error!(error = %self, "Operation failed");
        } else {
            tracing::warn!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::OutOfStock {
            product: ProductId::new(4),
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "Out of stock: product 4 has 1 available"
        );
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = AppError::Backend(BackendError::Status {
            status: 500,
            detail: Some("Traceback (most recent call last)".to_string()),
        });
        assert!(err.is_internal());
        assert!(!err.user_message().contains("Traceback"));

        let err = AppError::Storage(StorageError::InvalidKey("../x".to_string()));
        assert_eq!(err.user_message(), "Could not access saved data");
    }

    #[test]
    fn test_user_errors_are_not_internal() {
        let err = AppError::from(AuthError::NotAuthenticated);
        assert!(!err.is_internal());
        assert_eq!(err.user_message(), "Please log in first");

        let err = AppError::from(CheckoutError::EmptyCart);
        assert!(!err.is_internal());
        assert_eq!(err.user_message(), "Your cart is empty");
    }
}
