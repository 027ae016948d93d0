//! Order history.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{CartView, CustomerDetails, Order, next_order_id};

/// Records completed carts and reads them back.
#[derive(Debug, Clone)]
pub struct OrderHistory<R> {
    repo: R,
}

impl<R: OrderRepository> OrderHistory<R> {
    /// Create a history over `repo`.
    pub const fn new(repo: R) -> Self {
        Self { repo }
    }

    /// The underlying repository.
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Record a cart snapshot as an order created at `now` and append it.
    ///
    /// The order owns the snapshot's lines; mutating the cart afterwards
    /// does not affect it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the order cannot be stored.
    #[instrument(skip(self, cart, customer), fields(lines = cart.items.len()))]
    pub async fn record_order(
        &self,
        cart: CartView,
        customer: CustomerDetails,
        now: DateTime<Utc>,
    ) -> Result<Order, RepositoryError> {
        let latest = self.repo.latest_id().await?;
        let order = Order {
            id: next_order_id(now, latest),
            created_at: now,
            items: cart.items,
            totals: cart.totals,
            customer,
        };

        self.repo.append(&order).await?;
        info!(order_id = %order.id, total = %order.totals.total, "order recorded");
        Ok(order)
    }

    /// Every recorded order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the history cannot be read.
    pub async fn list_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        self.repo.list().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryOrderRepository;
    use crate::db::test_support::at;
    use crate::models::CartItem;
    use crate::services::cart::CartStore;
    use tienda_core::{ItemId, OrderId, Price, Quantity};

    fn customer() -> CustomerDetails {
        CustomerDetails {
            name: "Ana".to_owned(),
            address: "Calle 1".to_owned(),
            card_hint: "**** 4242".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_record_then_list_snapshot() {
        let history = OrderHistory::new(MemoryOrderRepository::new());
        let mut cart = CartStore::default();
        cart.add(CartItem::new(1_i64, "Mate", Price::from_whole(100)));
        cart.add(
            CartItem::new(2_i64, "Bombilla", Price::from_whole(20))
                .with_quantity(Quantity::new(2).unwrap()),
        );
        let expected_items = cart.items().to_vec();
        let expected_totals = cart.totals().unwrap();

        let recorded = history
            .record_order(cart.view().unwrap(), customer(), at(1_700_000_000_000))
            .await
            .unwrap();

        cart.update_quantity(&ItemId::Number(1), 5).unwrap();
        cart.clear();

        let orders = history.list_orders().await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0], recorded);
        assert_eq!(orders[0].items, expected_items);
        assert_eq!(orders[0].totals, expected_totals);
        assert_eq!(orders[0].id, OrderId::new(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_same_millisecond_gets_distinct_ids() {
        let history = OrderHistory::new(MemoryOrderRepository::new());
        let mut cart = CartStore::default();
        cart.add(CartItem::new(1_i64, "Mate", Price::from_whole(100)));

        let first = history
            .record_order(cart.view().unwrap(), customer(), at(5_000))
            .await
            .unwrap();
        let second = history
            .record_order(cart.view().unwrap(), customer(), at(5_000))
            .await
            .unwrap();

        assert_eq!(first.id, OrderId::new(5_000));
        assert_eq!(second.id, OrderId::new(5_001));
        let ids: Vec<_> = history.list_orders().await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
