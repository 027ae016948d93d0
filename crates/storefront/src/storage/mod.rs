//! Local key-value persistence.
//!
//! The storefront keeps three records on the shopper's side:
//!
//! - `user` - the logged-in identity ([`keys::USER`])
//! - `cart` - cart lines between runs ([`keys::CART`])
//! - `orders` - locally recorded order history ([`keys::ORDERS`])
//!
//! Values are JSON documents. There is no schema version and no migration;
//! a record that fails to parse surfaces as [`StorageError::Json`] and callers
//! decide whether to discard it.
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local map, used by tests and ephemeral runs
//! - [`FileStore`] - one `<key>.json` file per key in a data directory

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Record keys used by the storefront.
pub mod keys {
    /// Current logged-in user.
    pub const USER: &str = "user";

    /// Cart lines.
    pub const CART: &str = "cart";

    /// Local order history.
    pub const ORDERS: &str = "orders";
}

/// Errors raised by a [`LocalStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O error for '{key}': {source}")]
    Io {
        /// Record key.
        key: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("malformed record '{key}': {source}")]
    Json {
        /// Record key.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Keys are limited to ASCII letters, digits, `-` and `_`.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string-keyed store of JSON records.
///
/// Implementations are cheap handles: cloning one yields another handle onto
/// the same records.
pub trait LocalStore: Clone + Send + Sync + 'static {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Read and decode the JSON record under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Json`] if the stored value does not decode as `T`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Json {
                key: key.to_owned(),
                source,
            })
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if encoding or writing fails.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Json {
            key: key.to_owned(),
            source,
        })?;
        self.set(key, &raw)
    }
}

/// Check that a key is safe to use as a file stem.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}
