//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::storage::StorageError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] tienda_core::EmailError),

    /// Registration needs a display name.
    #[error("name is required")]
    MissingName,

    /// Password is empty.
    #[error("password is required")]
    MissingPassword,

    /// Backend rejected the login or could not be reached.
    ///
    /// Wrong credentials and server failures are deliberately not told apart.
    #[error("login failed")]
    LoginFailed(#[source] BackendError),

    /// Backend rejected the registration or could not be reached.
    #[error("registration failed{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    RegistrationFailed {
        /// Backend's explanation, e.g. "Email ya registrado".
        detail: Option<String>,
        /// Underlying error.
        #[source]
        source: BackendError,
    },

    /// No user is logged in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Logged in without a backend token, so token-only calls are unavailable.
    #[error("session has no backend token")]
    MissingToken,

    /// Session record could not be persisted.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}
