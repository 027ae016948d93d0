//! REST backend client.
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |---|---|---|
//! | `POST` | `/auth/iniciar-sesion` | login |
//! | `POST` | `/auth/registrar` | registration |
//! | `GET` | `/productos` | catalog listing |
//! | `GET` | `/productos/{id}` | single product |
//! | `GET` | `/compras` | purchase history (Bearer token) |
//!
//! The services talk to the [`Backend`] trait; [`HttpBackend`] is the real
//! implementation and `StubBackend` (feature `test-util`) an in-process fake.

mod cache;
mod http;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
mod stub;

pub use http::HttpBackend;
#[cfg(any(test, feature = "test-util"))]
pub use stub::StubBackend;

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;

use tienda_core::{Email, ProductId};

use crate::models::{Product, RemotePurchase, SessionToken};

use types::ConversionError;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `detail` field of the error body, if any.
        detail: Option<String>,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response parsed but holds values the domain rejects.
    #[error("invalid record: {0}")]
    Conversion(#[from] ConversionError),
}

impl BackendError {
    /// The backend's `detail` message, when it sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status code, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Login form data.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email.
    pub email: Email,
    /// Account password.
    pub password: SecretString,
}

/// Registration form data.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Chosen password.
    pub password: SecretString,
}

/// What a successful login returns.
#[derive(Debug, Clone, Default)]
pub struct LoginOutcome {
    /// Bearer token, if the backend issued one.
    pub token: Option<SessionToken>,
}

/// Operations the storefront needs from the backend.
///
/// Implementations are cheap cloneable handles.
pub trait Backend: Clone + Send + Sync + 'static {
    /// Check credentials.
    ///
    /// Any non-success status is reported as [`BackendError::Status`].
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginOutcome, BackendError>> + Send;

    /// Create an account.
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Full product listing.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    /// A single product.
    ///
    /// Fails with [`BackendError::NotFound`] for an unknown id.
    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, BackendError>> + Send;

    /// Purchases the backend holds for the token's owner.
    fn purchase_history(
        &self,
        token: &SessionToken,
    ) -> impl Future<Output = Result<Vec<RemotePurchase>, BackendError>> + Send;
}
