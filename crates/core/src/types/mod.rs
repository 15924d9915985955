//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for the marketplace's domain concepts.

pub mod id;
pub mod identity;
pub mod price;
pub mod quantity;
pub mod status;

pub use id::*;
pub use identity::{BuyerId, IdentityError, SellerId};
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::{ItemStatus, OrderStatus, TransitionError};
