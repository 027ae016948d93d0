//! In-memory store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{LocalStore, StorageError, validate_key};

/// A [`LocalStore`] backed by a shared `HashMap`.
///
/// Records live as long as any clone of the handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_records() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("user", "{}").unwrap();
        assert_eq!(b.get("user").unwrap().as_deref(), Some("{}"));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let store = MemoryStore::new();
        store.remove("cart").unwrap();
        assert!(store.is_empty());
    }
}
