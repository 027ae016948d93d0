//! Positive item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at one.
    #[error("quantity must be at least 1")]
    Zero,
    /// The value does not fit in a `u32`.
    #[error("quantity {0} is out of range")]
    OutOfRange(i64),
}

/// Number of units of an item; always at least one.
///
/// A cart line whose quantity would drop to zero is removed instead, so the
/// zero case is unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] if `n` is zero.
    pub fn new(n: u32) -> Result<Self, QuantityError> {
        NonZeroU32::new(n).map(Self).ok_or(QuantityError::Zero)
    }

    /// Interpret a signed request.
    ///
    /// Returns `Ok(None)` for zero or negative values, which callers treat as
    /// "remove the line".
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::OutOfRange`] if `n` exceeds `u32::MAX`.
    pub fn from_signed(n: i64) -> Result<Option<Self>, QuantityError> {
        if n <= 0 {
            return Ok(None);
        }
        let n = u32::try_from(n).map_err(|_| QuantityError::OutOfRange(n))?;
        Ok(NonZeroU32::new(n).map(Self))
    }

    /// The quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0.get()))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_from_signed() {
        assert_eq!(Quantity::from_signed(0).unwrap(), None);
        assert_eq!(Quantity::from_signed(-4).unwrap(), None);
        assert_eq!(Quantity::from_signed(2).unwrap().map(Quantity::get), Some(2));
        assert!(matches!(
            Quantity::from_signed(i64::from(u32::MAX) + 1),
            Err(QuantityError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_saturating_add() {
        let max = Quantity::new(u32::MAX).unwrap();
        assert_eq!(max.saturating_add(Quantity::ONE).get(), u32::MAX);
        assert_eq!(Quantity::ONE.saturating_add(Quantity::ONE).get(), 2);
    }

    #[test]
    fn test_serde() {
        let q: Quantity = serde_json::from_str("5").unwrap();
        assert_eq!(q.get(), 5);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::to_string(&q).unwrap(), "5");
    }
}
