//! Positive line-item quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative value.
    #[error("quantity must be positive (got {0})")]
    NotPositive(i64),
    /// The value does not fit the stock counter.
    #[error("quantity is too large")]
    Overflow,
}

/// A strictly positive number of units.
///
/// Stock reservations and cart lines are always expressed in `Quantity`, so
/// a zero or negative amount can never reach the inventory ledger.
///
/// ```
/// use bazaar_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity from a signed value.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::NotPositive` if `value <= 0`.
    pub const fn new(value: i32) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive(value as i64));
        }
        Ok(Self(value))
    }

    /// Get the number of units.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Add two quantities.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::Overflow` if the sum exceeds `i32::MAX`.
    pub const fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        match self.0.checked_add(other.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(QuantityError::Overflow),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(QuantityError::NotPositive(value));
        }
        i32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError::Overflow)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}
