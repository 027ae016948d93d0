//! In-memory order repository.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::Order;

use super::{OrderRepository, RepositoryError};

/// Orders kept in a shared `Vec`, lost when the last handle drops.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderRepository {
    orders: Arc<Mutex<Vec<Order>>>,
}

impl MemoryOrderRepository {
    /// An empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OrderRepository for MemoryOrderRepository {
    async fn append(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.lock();
        if orders.iter().any(|o| o.id == order.id) {
            return Err(RepositoryError::Conflict(format!("order {} exists", order.id)));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.lock().clone())
    }
}
