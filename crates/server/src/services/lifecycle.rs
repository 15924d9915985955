//! Order lifecycle: payment, shipping and receipt.
//!
//! ```text
//! cart ──mark_paid──▶ paid
//! item: paid ──mark_shipping (seller)──▶ shipping ──confirm_receipt (buyer)──▶ shipped
//! ```
//!
//! After payment the order-level status is derived from its items: it moves
//! to `shipping` when the first item ships and to `shipped` once every item
//! has been received. There is no way back to `cart` and no cancellation.

use tracing::{info, instrument};

use bazaar_core::{BuyerId, ItemStatus, OrderId, OrderItemId, OrderStatus, SellerId};

use crate::db::{Store, UnitOfWork};
use crate::models::{FulfillmentEntry, ItemRecord, OrderItem, OrderReceipt, OrderWithItems};

use super::{MarketError, TransactionCoordinator};

/// Order lifecycle service.
pub struct OrderLifecycle<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> OrderLifecycle<'a, S> {
    /// Create a new lifecycle service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Close the buyer's open cart after a completed payment.
    ///
    /// Repeating the call after success finds no open cart and reports
    /// `NotFound`; the paid order is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the buyer has no open cart.
    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn mark_paid(&self, buyer: &BuyerId) -> Result<OrderReceipt, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::mark_paid_in(&mut tx, buyer).await;
        let receipt = coordinator.settle(tx, outcome).await?;

        info!(order = %receipt.order.id, items = receipt.items.len(), "Order paid");
        Ok(receipt)
    }

    /// Seller dispatches one of their items (`paid` to `shipping`).
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the item does not exist,
    /// `MarketError::Forbidden` if it is another seller's product and
    /// `MarketError::InvalidTransition` if the item is not awaiting shipment.
    #[instrument(skip(self), fields(seller = %seller, item = %item))]
    pub async fn mark_shipping(
        &self,
        seller: &SellerId,
        item: OrderItemId,
    ) -> Result<OrderItem, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::mark_shipping_in(&mut tx, seller, item).await;
        let updated = coordinator.settle(tx, outcome).await?;

        info!(order = %updated.order_id, "Item shipped by seller");
        Ok(updated)
    }

    /// Buyer confirms receipt of one of their items (`shipping` to `shipped`).
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the item does not exist,
    /// `MarketError::Forbidden` if it belongs to another buyer's order and
    /// `MarketError::InvalidTransition` if the item is not on its way.
    #[instrument(skip(self), fields(buyer = %buyer, item = %item))]
    pub async fn confirm_receipt(
        &self,
        buyer: &BuyerId,
        item: OrderItemId,
    ) -> Result<OrderItem, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::confirm_receipt_in(&mut tx, buyer, item).await;
        let updated = coordinator.settle(tx, outcome).await?;

        info!(order = %updated.order_id, "Item received by buyer");
        Ok(updated)
    }

    /// The buyer's placed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Persistence` if the store cannot be read.
    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn list_orders(&self, buyer: &BuyerId) -> Result<Vec<OrderWithItems>, MarketError> {
        Ok(self.store.buyer_orders(buyer).await?)
    }

    /// Items the seller still has to ship or that are in transit, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Persistence` if the store cannot be read.
    #[instrument(skip(self), fields(seller = %seller))]
    pub async fn fulfillment_queue(
        &self,
        seller: &SellerId,
    ) -> Result<Vec<FulfillmentEntry>, MarketError> {
        Ok(self.store.fulfillment_queue(seller).await?)
    }

    // =========================================================================
    // Transaction bodies
    // =========================================================================

    async fn mark_paid_in(tx: &mut S::Tx, buyer: &BuyerId) -> Result<OrderReceipt, MarketError> {
        let cart = tx
            .lock_cart(buyer)
            .await?
            .ok_or_else(|| MarketError::NotFound("open cart".to_owned()))?;

        let paid = cart.status.mark_paid()?;
        let order = tx.set_order_status(cart.id, paid).await?;
        let items = tx.order_items(cart.id).await?;

        Ok(OrderReceipt { order, items })
    }

    async fn mark_shipping_in(
        tx: &mut S::Tx,
        seller: &SellerId,
        item: OrderItemId,
    ) -> Result<OrderItem, MarketError> {
        let record = Self::locked_item(tx, item).await?;
        if &record.seller_id != seller {
            return Err(MarketError::Forbidden(format!(
                "order item {item} is not one of your products"
            )));
        }

        let next = Self::placed(&record, ItemStatus::Shipping)?.start_shipping()?;
        Self::advance(tx, record, next).await
    }

    async fn confirm_receipt_in(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        item: OrderItemId,
    ) -> Result<OrderItem, MarketError> {
        let record = Self::locked_item(tx, item).await?;
        if &record.buyer_id != buyer {
            return Err(MarketError::Forbidden(format!(
                "order item {item} belongs to another buyer"
            )));
        }

        let next = Self::placed(&record, ItemStatus::Shipped)?.confirm_receipt()?;
        Self::advance(tx, record, next).await
    }

    async fn locked_item(tx: &mut S::Tx, item: OrderItemId) -> Result<ItemRecord, MarketError> {
        tx.lock_item(item)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("order item {item}")))
    }

    /// The item's status, provided its order has left the cart.
    fn placed(record: &ItemRecord, target: ItemStatus) -> Result<ItemStatus, MarketError> {
        if record.order_status.is_cart() {
            return Err(bazaar_core::TransitionError {
                from: OrderStatus::Cart.as_str(),
                to: target.as_str(),
            }
            .into());
        }
        Ok(record.item.status)
    }

    /// Persist the item's new status and re-derive its order's status.
    async fn advance(
        tx: &mut S::Tx,
        record: ItemRecord,
        next: ItemStatus,
    ) -> Result<OrderItem, MarketError> {
        let mut item = record.item;
        tx.set_item_status(item.id, next).await?;
        item.status = next;

        Self::roll_up(tx, item.order_id, record.order_status).await?;
        Ok(item)
    }

    async fn roll_up(
        tx: &mut S::Tx,
        order: OrderId,
        current: OrderStatus,
    ) -> Result<(), MarketError> {
        let statuses: Vec<ItemStatus> = tx
            .order_items(order)
            .await?
            .iter()
            .map(|i| i.status)
            .collect();

        let next = current.rollup(&statuses);
        if next != current {
            tx.set_order_status(order, next).await?;
            info!(order = %order, status = %next, "Order status advanced");
        }
        Ok(())
    }
}
