//! Order types.
//!
//! [`Order`] is what checkout records locally. [`RemotePurchase`] is what the
//! backend reports from its own purchase history; the two are not reconciled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tienda_core::{OrderId, Price, ProductId};

use super::{CartItem, CartTotals};

/// Customer and delivery data attached to an order.
///
/// Only a masked hint of the card number is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    /// Name the order is addressed to.
    pub name: String,
    /// Free-text delivery address.
    pub address: String,
    /// Masked card number, e.g. `**** 4242`.
    pub card_hint: String,
}

/// A completed checkout.
///
/// Created once, never modified, never deleted by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Milliseconds since the Unix epoch at creation, bumped if needed to stay unique.
    pub id: OrderId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Deep copy of the cart lines at checkout.
    pub items: Vec<CartItem>,
    /// Amounts computed at checkout.
    pub totals: CartTotals,
    /// Customer data.
    pub customer: CustomerDetails,
}

impl Order {
    /// Σ quantities across the order's lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }
}

/// Pick the id for an order created at `now`.
///
/// Ids are timestamp-derived; when the clock has not advanced past the most
/// recent id (two orders in the same millisecond, or a clock step backwards)
/// the new id is `latest + 1`.
#[must_use]
pub fn next_order_id(now: DateTime<Utc>, latest: Option<OrderId>) -> OrderId {
    let stamp = now.timestamp_millis();
    match latest {
        Some(latest) if latest.as_i64() >= stamp => {
            OrderId::new(latest.as_i64().saturating_add(1))
        }
        _ => OrderId::new(stamp),
    }
}

/// One line of a purchase held by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePurchaseItem {
    /// Product bought.
    pub product_id: ProductId,
    /// Units bought.
    pub quantity: u32,
    /// Unit price charged.
    pub unit_price: Price,
}

/// A purchase from the backend's history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePurchase {
    /// Backend purchase id.
    pub id: i64,
    /// Date as the backend formats it.
    pub placed_at: String,
    /// Delivery address, if the backend reports one.
    pub address: Option<String>,
    /// Total charged.
    pub total: Price,
    /// Lines.
    pub items: Vec<RemotePurchaseItem>,
}
