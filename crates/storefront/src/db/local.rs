//! Order repository over a [`LocalStore`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::models::Order;
use crate::storage::{LocalStore, StorageError, keys};

use super::{OrderRepository, RepositoryError};

/// Orders stored as one JSON list under the `orders` record.
///
/// Appends are read-modify-write; the lock serializes them within a process.
#[derive(Debug, Clone)]
pub struct LocalOrderRepository<S> {
    store: S,
    write_lock: Arc<Mutex<()>>,
}

impl<S: LocalStore> LocalOrderRepository<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<Vec<Order>, RepositoryError> {
        match self.store.get_json::<Vec<Order>>(keys::ORDERS) {
            Ok(orders) => Ok(orders.unwrap_or_default()),
            Err(StorageError::Json { source, .. }) => Err(RepositoryError::DataCorruption(
                format!("unreadable order history: {source}"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S: LocalStore> OrderRepository for LocalOrderRepository<S> {
    async fn append(&self, order: &Order) -> Result<(), RepositoryError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut orders = self.load()?;
        if orders.iter().any(|o| o.id == order.id) {
            return Err(RepositoryError::Conflict(format!("order {} exists", order.id)));
        }
        orders.push(order.clone());
        self.store.set_json(keys::ORDERS, &orders)?;

        debug!(order_id = %order.id, count = orders.len(), "order appended");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        self.load()
    }
}
