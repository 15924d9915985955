//! Inventory ledger: the product stock counter that every cart debits.
//!
//! Stock is reserved the moment an item enters a cart and released when it
//! leaves, so at every committed state
//!
//! ```text
//! stock + sum(quantity in open carts) == initial stock
//! ```
//!
//! The ledger never checks that a release matches an earlier reservation;
//! callers release exactly the quantity they remove from a line.

use tracing::debug;

use bazaar_core::{ProductId, Quantity};

use crate::db::UnitOfWork;

use super::MarketError;

/// Stock operations inside one unit of work.
pub struct InventoryLedger<'t, U: UnitOfWork> {
    tx: &'t mut U,
}

impl<'t, U: UnitOfWork> InventoryLedger<'t, U> {
    /// Wrap an open unit of work.
    pub const fn new(tx: &'t mut U) -> Self {
        Self { tx }
    }

    /// Take `qty` units out of stock and return what remains.
    ///
    /// The availability check and the decrement are one conditional update,
    /// so two concurrent reservations of the last unit cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product does not exist and
    /// `MarketError::InsufficientStock` if fewer than `qty` units remain; in
    /// both cases stock is unchanged.
    pub async fn reserve(&mut self, product: ProductId, qty: Quantity) -> Result<i32, MarketError> {
        if let Some(remaining) = self.tx.try_debit_stock(product, qty).await? {
            debug!(product = %product, qty = %qty, remaining, "Reserved stock");
            return Ok(remaining);
        }

        match self.tx.product(product).await? {
            None => Err(MarketError::NotFound(format!("product {product}"))),
            Some(p) => Err(MarketError::InsufficientStock {
                product,
                requested: qty.get(),
                available: p.stock,
            }),
        }
    }

    /// Return `qty` units to stock and return the new level.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product does not exist.
    pub async fn release(&mut self, product: ProductId, qty: Quantity) -> Result<i32, MarketError> {
        let stock = self
            .tx
            .credit_stock(product, qty)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("product {product}")))?;
        debug!(product = %product, qty = %qty, stock, "Released stock");
        Ok(stock)
    }

    /// Current stock level.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product does not exist.
    pub async fn available(&mut self, product: ProductId) -> Result<i32, MarketError> {
        self.tx
            .product(product)
            .await?
            .map(|p| p.stock)
            .ok_or_else(|| MarketError::NotFound(format!("product {product}")))
    }
}
