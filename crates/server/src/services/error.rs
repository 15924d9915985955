//! Marketplace error types.

use thiserror::Error;

use bazaar_core::{IdentityError, PriceError, ProductId, QuantityError, TransitionError};

use crate::db::RepositoryError;

/// Errors raised by cart, order and catalog operations.
///
/// Every variant except [`Persistence`](Self::Persistence) describes a
/// condition the caller can act on and is safe to show to users.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The product, item, order or seller is absent, or not visible to the caller.
    #[error("{0} not found")]
    NotFound(String),

    /// The entity exists but belongs to someone else.
    #[error("{0}")]
    Forbidden(String),

    /// A reservation asked for more units than remain.
    #[error("insufficient stock for product {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that could not be reserved.
        product: ProductId,
        /// Units requested by this operation.
        requested: i32,
        /// Units remaining at the time of the attempt.
        available: i32,
    },

    /// A status change that the order or item state machine does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// Transaction, connection or timeout failure.
    #[error("persistence failure: {0}")]
    Persistence(#[from] RepositoryError),
}

impl MarketError {
    /// Whether this error signals a fault on our side rather than a caller mistake.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl From<QuantityError> for MarketError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(format!("invalid quantity: {err}"))
    }
}

impl From<IdentityError> for MarketError {
    fn from(err: IdentityError) -> Self {
        Self::Validation(format!("invalid identity: {err}"))
    }
}

impl From<PriceError> for MarketError {
    fn from(err: PriceError) -> Self {
        Self::Validation(format!("invalid price: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = MarketError::InsufficientStock {
            product: ProductId::new(7),
            requested: 3,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 7: requested 3, available 1"
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_persistence_is_internal() {
        let err = MarketError::from(RepositoryError::Timeout("statement timeout exceeded"));
        assert!(err.is_internal());
    }

    #[test]
    fn test_quantity_error_is_validation() {
        let err = MarketError::from(bazaar_core::Quantity::new(0).unwrap_err());
        assert!(matches!(err, MarketError::Validation(_)));
    }
}
