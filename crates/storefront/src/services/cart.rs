//! Cart store and pricing.
//!
//! # Totals
//!
//! ```text
//! subtotal = Σ price × quantity                    (exact)
//! tax      = Σ line_total × rate(line.category)    (exact)
//! shipping = shipping_fee if non-empty, else 0
//! total    = round2(subtotal + tax + shipping)     (midpoint away from zero)
//! ```
//!
//! Totals are recomputed on every read; nothing is cached on the store.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use tienda_core::{Category, ItemId, Price, Quantity, QuantityError};

use crate::models::{CartItem, CartTotals, CartView};

/// Errors from cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity cannot be represented.
    #[error("invalid quantity: {0}")]
    Quantity(#[from] QuantityError),

    /// An amount is too large to represent.
    #[error("cart amounts overflow")]
    Overflow,
}

/// Tax rates: one default, plus optional per-category overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxPolicy {
    default_rate: Decimal,
    category_rates: Vec<(Category, Decimal)>,
}

impl TaxPolicy {
    /// The store's standard rate, 21%.
    pub const STANDARD_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

    /// A single rate for every item.
    #[must_use]
    pub const fn flat(rate: Decimal) -> Self {
        Self {
            default_rate: rate,
            category_rates: Vec::new(),
        }
    }

    /// Override the rate for one category. Later overrides replace earlier ones.
    #[must_use]
    pub fn with_category_rate(mut self, category: Category, rate: Decimal) -> Self {
        self.category_rates.retain(|(c, _)| *c != category);
        self.category_rates.push((category, rate));
        self
    }

    /// The rate applied to items without an override.
    #[must_use]
    pub const fn default_rate(&self) -> Decimal {
        self.default_rate
    }

    /// Configured overrides.
    #[must_use]
    pub fn category_rates(&self) -> &[(Category, Decimal)] {
        &self.category_rates
    }

    /// The rate for an item in `category`.
    #[must_use]
    pub fn rate_for(&self, category: Option<&Category>) -> Decimal {
        category
            .and_then(|category| {
                self.category_rates
                    .iter()
                    .find(|(c, _)| c == category)
                    .map(|(_, rate)| *rate)
            })
            .unwrap_or(self.default_rate)
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::flat(Self::STANDARD_RATE)
    }
}

/// Everything needed to turn cart lines into [`CartTotals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pricing {
    /// Tax rates.
    pub tax: TaxPolicy,
    /// Flat shipping fee charged on a non-empty cart.
    pub shipping_fee: Price,
}

impl Pricing {
    /// Default flat shipping fee.
    pub const STANDARD_SHIPPING: Price = Price::from_whole(50);

    /// Compute totals for `items`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if any amount does not fit a decimal.
    pub fn totals(&self, items: &[CartItem]) -> Result<CartTotals, CartError> {
        if items.is_empty() {
            return Ok(CartTotals::ZERO);
        }

        let subtotal = subtotal(items)?;
        let tax = items
            .iter()
            .map(|item| {
                item.line_total()?
                    .apply_rate(self.tax.rate_for(item.category.as_ref()))
            })
            .try_fold(Price::ZERO, |sum, line| sum.checked_add(line?))
            .ok_or(CartError::Overflow)?;
        let shipping = self.shipping_fee;
        let total = Price::checked_sum([subtotal, tax, shipping]).ok_or(CartError::Overflow)?;

        Ok(CartTotals {
            subtotal,
            tax,
            shipping,
            total: total.round_cents(),
        })
    }
}

fn subtotal(items: &[CartItem]) -> Result<Price, CartError> {
    items
        .iter()
        .try_fold(Price::ZERO, |sum, item| sum.checked_add(item.line_total()?))
        .ok_or(CartError::Overflow)
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            tax: TaxPolicy::default(),
            shipping_fee: Self::STANDARD_SHIPPING,
        }
    }
}

/// The shopper's cart.
///
/// Lines are kept in insertion order and identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    items: Vec<CartItem>,
    pricing: Pricing,
}

impl CartStore {
    /// An empty cart.
    #[must_use]
    pub fn new(pricing: Pricing) -> Self {
        Self {
            items: Vec::new(),
            pricing,
        }
    }

    /// A cart rehydrated from stored lines.
    ///
    /// Duplicate identifiers are merged as if the lines had been added one
    /// by one.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>, pricing: Pricing) -> Self {
        let mut cart = Self::new(pricing);
        for item in items {
            cart.merge(item);
        }
        cart
    }

    /// Add an item, merging quantities when its identifier is already present.
    pub fn add(&mut self, item: CartItem) {
        debug!(item_id = %item.id, quantity = %item.quantity, "adding to cart");
        self.merge(item);
    }

    fn merge(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Set the quantity of a line. Zero or negative removes it.
    ///
    /// Unknown identifiers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Quantity`] if `quantity` exceeds `u32::MAX`.
    pub fn update_quantity(&mut self, id: &ItemId, quantity: i64) -> Result<(), CartError> {
        match Quantity::from_signed(quantity)? {
            None => {
                self.remove(id);
            }
            Some(quantity) => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == *id) {
                    debug!(item_id = %id, %quantity, "updating cart quantity");
                    item.quantity = quantity;
                }
            }
        }
        Ok(())
    }

    /// Remove a line, returning it if it was present.
    pub fn remove(&mut self, id: &ItemId) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.id == *id)?;
        debug!(item_id = %id, "removing from cart");
        Some(self.items.remove(index))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        debug!(lines = self.items.len(), "clearing cart");
        self.items.clear();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The line with identifier `id`.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == *id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Σ quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Σ price × quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if the sum does not fit a decimal.
    pub fn subtotal(&self) -> Result<Price, CartError> {
        subtotal(&self.items)
    }

    /// Current totals.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if any amount does not fit a decimal.
    pub fn totals(&self) -> Result<CartTotals, CartError> {
        self.pricing.totals(&self.items)
    }

    /// The pricing in effect.
    #[must_use]
    pub const fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// Immutable snapshot for rendering.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Overflow`] if the totals cannot be computed.
    pub fn view(&self) -> Result<CartView, CartError> {
        Ok(CartView {
            items: self.items.clone(),
            totals: self.totals()?,
            item_count: self.item_count(),
        })
    }
}
