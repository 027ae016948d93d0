//! Checkout: form validation, order recording and cart clearing.

use core::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{info, instrument};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::{CartView, CustomerDetails, Order};
use crate::services::cart::{CartError, CartStore};
use crate::services::orders::OrderHistory;

/// Card numbers outside this many digits are rejected.
const CARD_DIGITS: core::ops::RangeInclusive<usize> = 12..=19;

/// A required checkout field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Address,
    Card,
}

impl Field {
    /// Static message shown next to the field.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Address => "Address is required",
            Self::Card => "Card number is required",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Address => "address",
            Self::Card => "card",
        })
    }
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// One or more required fields are blank.
    #[error("missing required fields: {}", join_fields(.0))]
    MissingFields(Vec<Field>),

    /// Card number is not 12-19 digits.
    #[error("invalid card number")]
    InvalidCard,

    /// Cart totals could not be computed.
    #[error("could not price the cart: {0}")]
    Cart(#[from] CartError),

    /// Order could not be stored.
    #[error("could not record order: {0}")]
    Repository(#[from] RepositoryError),
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Customer data submitted at checkout.
#[derive(Debug, Clone)]
pub struct CheckoutForm {
    /// Customer name; may be blank.
    pub name: String,
    /// Delivery address.
    pub address: String,
    /// Card number; only a masked hint is ever stored.
    pub card_number: SecretString,
}

impl CheckoutForm {
    /// Check required fields and mask the card. A blank name is kept blank.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingFields`] listing every blank field, or
    /// [`CheckoutError::InvalidCard`] if the card number is malformed.
    pub fn validate(&self) -> Result<CustomerDetails, CheckoutError> {
        let name = self.name.trim();
        let address = self.address.trim();
        let card = self.card_number.expose_secret().trim();

        let missing: Vec<Field> = [
            (Field::Address, address.is_empty()),
            (Field::Card, card.is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, blank)| blank.then_some(field))
        .collect();
        if !missing.is_empty() {
            return Err(CheckoutError::MissingFields(missing));
        }

        Ok(CustomerDetails {
            name: name.to_owned(),
            address: address.to_owned(),
            card_hint: mask_card(card)?,
        })
    }
}

/// `**** 1234` from a card number written with optional spaces or dashes.
fn mask_card(number: &str) -> Result<String, CheckoutError> {
    let mut digits = String::with_capacity(number.len());
    for c in number.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' => {}
            _ => return Err(CheckoutError::InvalidCard),
        }
    }
    if !CARD_DIGITS.contains(&digits.len()) {
        return Err(CheckoutError::InvalidCard);
    }
    let last4 = digits.get(digits.len() - 4..).ok_or(CheckoutError::InvalidCard)?;
    Ok(format!("**** {last4}"))
}

/// Check that `cart` can be checked out with `form`.
///
/// Returns the priced snapshot to record and the customer details.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`], the form's validation error, or
/// [`CheckoutError::Cart`] if the cart cannot be priced.
pub fn prepare(
    cart: &CartStore,
    form: &CheckoutForm,
) -> Result<(CartView, CustomerDetails), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let customer = form.validate()?;
    Ok((cart.view()?, customer))
}

/// Turn the cart into an order and empty the cart.
///
/// On any error the cart is left untouched.
///
/// # Errors
///
/// Returns [`CheckoutError`] if the cart is empty or cannot be priced, the
/// form is invalid, or the order cannot be stored.
#[instrument(skip_all, fields(lines = cart.len()))]
pub async fn checkout<R: OrderRepository>(
    cart: &mut CartStore,
    history: &OrderHistory<R>,
    form: &CheckoutForm,
    now: DateTime<Utc>,
) -> Result<Order, CheckoutError> {
    let (snapshot, customer) = prepare(cart, form)?;

    let order = history.record_order(snapshot, customer, now).await?;
    cart.clear();

    info!(order_id = %order.id, "checkout complete");
    Ok(order)
}
