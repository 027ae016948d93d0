//! Catalog product domain type.
//!
//! Separate from the backend's wire record; see
//! `backend::types::ProductRecord` for the JSON shape.

use serde::{Deserialize, Serialize};

use tienda_core::{Category, Price, ProductId, Quantity};

/// A purchasable product as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Long description, if any.
    pub description: Option<String>,
    /// Category tag, if any.
    pub category: Option<Category>,
    /// Unit price.
    pub price: Price,
    /// Units available according to the backend.
    pub stock: u32,
    /// Image reference (URL or backend-relative path).
    pub image: Option<String>,
}

impl Product {
    /// Whether `requested` more units fit in stock when `in_cart` are
    /// already reserved by the cart.
    #[must_use]
    pub fn has_stock_for(&self, in_cart: u32, requested: Quantity) -> bool {
        u64::from(in_cart) + u64::from(requested.get()) <= u64::from(self.stock)
    }

    /// Whether any unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}
