//! Cart operations.
//!
//! A buyer has at most one open cart: an order in status `cart`. It is
//! created by the first `add_item` and deleted as soon as its last line is
//! removed. Every mutation locks the cart row before touching product stock,
//! so mutations of the same cart are serialized and the lock order (order
//! row, then product row) is the same everywhere.

use std::cmp::Ordering;

use tracing::{info, instrument};

use bazaar_core::{BuyerId, OrderId, ProductId, Quantity};

use crate::db::{Store, UnitOfWork};
use crate::models::{Cart, CartChange, OrderItem};

use super::{InventoryLedger, MarketError, TransactionCoordinator};

/// Cart service.
pub struct CartService<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> CartService<'a, S> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add `qty` units of `product` to the buyer's cart, opening one if needed.
    ///
    /// If the product is already in the cart only the additional units are
    /// reserved.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product does not exist,
    /// `MarketError::InsufficientStock` if the units cannot be reserved and
    /// `MarketError::Validation` if the merged quantity overflows. Nothing is
    /// changed on error.
    #[instrument(skip(self), fields(buyer = %buyer, product = %product, qty = %qty))]
    pub async fn add_item(
        &self,
        buyer: &BuyerId,
        product: ProductId,
        qty: Quantity,
    ) -> Result<CartChange, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::add_item_in(&mut tx, buyer, product, qty).await;
        let change = coordinator.settle(tx, outcome).await?;

        info!(stock = change.stock, "Item added to cart");
        Ok(change)
    }

    /// Set the quantity of `product` in the buyer's cart.
    ///
    /// A quantity of zero or less removes the line, exactly like
    /// [`remove_item`](Self::remove_item).
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product is not in the cart and
    /// `MarketError::InsufficientStock` if an increase cannot be reserved, in
    /// which case the line keeps its previous quantity.
    #[instrument(skip(self), fields(buyer = %buyer, product = %product))]
    pub async fn update_item(
        &self,
        buyer: &BuyerId,
        product: ProductId,
        new_qty: i64,
    ) -> Result<CartChange, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::update_item_in(&mut tx, buyer, product, new_qty).await;
        let change = coordinator.settle(tx, outcome).await?;

        info!(stock = change.stock, cart_deleted = change.cart_deleted, "Cart item updated");
        Ok(change)
    }

    /// Remove `product` from the buyer's cart and release its units.
    ///
    /// The cart itself is deleted when this removes its last line.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product is not in the cart.
    #[instrument(skip(self), fields(buyer = %buyer, product = %product))]
    pub async fn remove_item(
        &self,
        buyer: &BuyerId,
        product: ProductId,
    ) -> Result<CartChange, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::remove_item_in(&mut tx, buyer, product).await;
        let change = coordinator.settle(tx, outcome).await?;

        info!(stock = change.stock, cart_deleted = change.cart_deleted, "Cart item removed");
        Ok(change)
    }

    /// The buyer's open cart with current product details.
    ///
    /// A buyer without an open cart gets an empty cart, not an error.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Persistence` if the store cannot be read.
    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn list_items(&self, buyer: &BuyerId) -> Result<Cart, MarketError> {
        let (order_id, lines) = self.store.cart_lines(buyer).await?;
        Ok(Cart { order_id, lines })
    }

    // =========================================================================
    // Transaction bodies
    // =========================================================================

    async fn add_item_in(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        product: ProductId,
        qty: Quantity,
    ) -> Result<CartChange, MarketError> {
        tx.ensure_buyer(buyer).await?;
        let cart = tx.open_cart(buyer).await?;
        let existing = tx.order_item(cart.id, product).await?;

        // Validate the merged quantity before touching stock.
        let merged = existing
            .as_ref()
            .map(|item| item.quantity.checked_add(qty))
            .transpose()?;

        let stock = InventoryLedger::new(&mut *tx).reserve(product, qty).await?;

        let item = match (existing, merged) {
            (Some(mut item), Some(merged)) => {
                tx.set_item_quantity(item.id, merged).await?;
                item.quantity = merged;
                item
            }
            _ => tx.insert_item(cart.id, product, qty).await?,
        };

        Ok(CartChange {
            product_id: product,
            item: Some(item),
            stock,
            cart_deleted: false,
        })
    }

    async fn update_item_in(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        product: ProductId,
        new_qty: i64,
    ) -> Result<CartChange, MarketError> {
        let (cart, mut item) = Self::locked_line(tx, buyer, product).await?;

        if new_qty <= 0 {
            return Self::remove_line(tx, cart, item).await;
        }

        let target = Quantity::try_from(new_qty)?;
        let current = item.quantity;
        let mut ledger = InventoryLedger::new(&mut *tx);
        let stock = match target.cmp(&current) {
            Ordering::Greater => {
                let delta = Quantity::new(target.get() - current.get())?;
                ledger.reserve(product, delta).await?
            }
            Ordering::Less => {
                let delta = Quantity::new(current.get() - target.get())?;
                ledger.release(product, delta).await?
            }
            Ordering::Equal => ledger.available(product).await?,
        };

        if target != current {
            tx.set_item_quantity(item.id, target).await?;
            item.quantity = target;
        }

        Ok(CartChange {
            product_id: product,
            item: Some(item),
            stock,
            cart_deleted: false,
        })
    }

    async fn remove_item_in(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        product: ProductId,
    ) -> Result<CartChange, MarketError> {
        let (cart, item) = Self::locked_line(tx, buyer, product).await?;
        Self::remove_line(tx, cart, item).await
    }

    /// Lock the buyer's cart and find the line for `product`.
    async fn locked_line(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        product: ProductId,
    ) -> Result<(OrderId, OrderItem), MarketError> {
        let not_in_cart = || MarketError::NotFound(format!("product {product} in cart"));

        let cart = tx.lock_cart(buyer).await?.ok_or_else(not_in_cart)?;
        let item = tx
            .order_item(cart.id, product)
            .await?
            .ok_or_else(not_in_cart)?;

        Ok((cart.id, item))
    }

    /// Release a line's units, delete it, and delete the cart if it is now empty.
    async fn remove_line(
        tx: &mut S::Tx,
        cart: OrderId,
        item: OrderItem,
    ) -> Result<CartChange, MarketError> {
        let stock = InventoryLedger::new(&mut *tx)
            .release(item.product_id, item.quantity)
            .await?;
        tx.delete_item(item.id).await?;

        let cart_deleted = tx.order_items(cart).await?.is_empty();
        if cart_deleted {
            tx.delete_order(cart).await?;
        }

        Ok(CartChange {
            product_id: item.product_id,
            item: None,
            stock,
            cart_deleted,
        })
    }
}
