//! Cart line and totals types.

use serde::{Deserialize, Serialize};

use tienda_core::{Category, ItemId, Price, Quantity};

use super::Product;

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Identifier, unique within a cart.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Units of this item; never zero.
    pub quantity: Quantity,
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Category tag, consulted by category-specific tax rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl CartItem {
    /// A single unit of an item.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity: Quantity::ONE,
            image: None,
            category: None,
        }
    }

    /// A cart line for `quantity` units of a catalog product.
    #[must_use]
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        Self {
            id: product.id.into(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            image: product.image.clone(),
            category: product.category.clone(),
        }
    }

    /// Set the quantity.
    #[must_use]
    pub fn with_quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = quantity;
        self
    }

    /// Set the category tag.
    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// `price × quantity`, exact; `None` if the amount overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_mul(self.quantity)
    }
}

/// Derived cart amounts.
///
/// `subtotal`, `tax` and `shipping` are exact; `total` is their sum rounded
/// once to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    /// Σ price × quantity.
    pub subtotal: Price,
    /// Tax on the subtotal.
    pub tax: Price,
    /// Flat shipping fee; zero for an empty cart.
    pub shipping: Price,
    /// `subtotal + tax + shipping`, rounded to two decimals.
    pub total: Price,
}

impl CartTotals {
    /// All-zero totals of an empty cart.
    pub const ZERO: Self = Self {
        subtotal: Price::ZERO,
        tax: Price::ZERO,
        shipping: Price::ZERO,
        total: Price::ZERO,
    };
}

/// Read-only snapshot of the cart handed to views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Lines in insertion order.
    pub items: Vec<CartItem>,
    /// Derived amounts.
    pub totals: CartTotals,
    /// Σ quantities.
    pub item_count: u64,
}

impl CartView {
    /// Whether the snapshot has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
