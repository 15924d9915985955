//! Order and order-item status machines.
//!
//! An order starts life as the buyer's cart and moves forward only:
//!
//! ```text
//! order:  cart ──mark_paid──▶ paid ──▶ shipping ──▶ shipped
//! item:          (awaiting)  paid ──start_shipping──▶ shipping ──confirm_receipt──▶ shipped
//! ```
//!
//! Item transitions are driven by sellers (`start_shipping`) and buyers
//! (`confirm_receipt`). The order-level status after payment is never set
//! directly; it is derived from its items with [`OrderStatus::rollup`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move from '{from}' to '{to}'")]
pub struct TransitionError {
    /// Status the entity was in.
    pub from: &'static str,
    /// Status that was requested.
    pub to: &'static str,
}

/// Order-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Open cart; items may still be added, changed or removed.
    #[default]
    Cart,
    /// Payment completed; no item is on its way yet.
    Paid,
    /// At least one item has been dispatched.
    Shipping,
    /// Every item has been received.
    Shipped,
}

impl OrderStatus {
    /// Returns the status as its wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Paid => "paid",
            Self::Shipping => "shipping",
            Self::Shipped => "shipped",
        }
    }

    /// Whether items may still be mutated.
    #[must_use]
    pub const fn is_cart(self) -> bool {
        matches!(self, Self::Cart)
    }

    /// Close the cart after payment.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` unless the order is currently a cart.
    pub const fn mark_paid(self) -> Result<Self, TransitionError> {
        match self {
            Self::Cart => Ok(Self::Paid),
            other => Err(TransitionError {
                from: other.as_str(),
                to: Self::Paid.as_str(),
            }),
        }
    }

    /// Derive the post-payment order status from its item statuses.
    ///
    /// A cart (or an order without items) keeps its current status. Because
    /// item statuses only move forward, the derived status does too.
    #[must_use]
    pub fn rollup(self, items: &[ItemStatus]) -> Self {
        if self.is_cart() || items.is_empty() {
            return self;
        }
        if items.iter().all(|s| *s == ItemStatus::Shipped) {
            Self::Shipped
        } else if items.iter().any(|s| *s != ItemStatus::Paid) {
            Self::Shipping
        } else {
            Self::Paid
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "paid" => Ok(Self::Paid),
            "shipping" => Ok(Self::Shipping),
            "shipped" => Ok(Self::Shipped),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Per-item fulfillment status.
///
/// Items are created in `Paid` (awaiting shipment); the state only becomes
/// meaningful once the parent order has left the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bazaar.item_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Paid for and awaiting shipment by the seller.
    #[default]
    Paid,
    /// Dispatched by the seller.
    Shipping,
    /// Receipt confirmed by the buyer.
    Shipped,
}

impl ItemStatus {
    /// Returns the status as its wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Shipping => "shipping",
            Self::Shipped => "shipped",
        }
    }

    /// Seller dispatches the item.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` unless the item is awaiting shipment.
    pub const fn start_shipping(self) -> Result<Self, TransitionError> {
        match self {
            Self::Paid => Ok(Self::Shipping),
            other => Err(TransitionError {
                from: other.as_str(),
                to: Self::Shipping.as_str(),
            }),
        }
    }

    /// Buyer confirms receipt.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` unless the item is currently shipping.
    pub const fn confirm_receipt(self) -> Result<Self, TransitionError> {
        match self {
            Self::Shipping => Ok(Self::Shipped),
            other => Err(TransitionError {
                from: other.as_str(),
                to: Self::Shipped.as_str(),
            }),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(Self::Paid),
            "shipping" => Ok(Self::Shipping),
            "shipped" => Ok(Self::Shipped),
            _ => Err(format!("invalid item status: {s}")),
        }
    }
}
