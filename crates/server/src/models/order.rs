//! Order, cart and fulfillment domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{
    BuyerId, ItemStatus, OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, SellerId,
};

/// An order header. A buyer's open cart is an order in `OrderStatus::Cart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Buyer who owns the order.
    pub buyer_id: BuyerId,
    /// Overall progress.
    pub status: OrderStatus,
    /// When the cart was opened.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// One product line inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Order item ID.
    pub id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Reserved units; always positive.
    pub quantity: Quantity,
    /// Fulfillment progress of this line.
    pub status: ItemStatus,
}

/// An order item together with the ownership facts needed to authorize a
/// fulfillment transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    /// The item itself.
    pub item: OrderItem,
    /// Buyer who owns the parent order.
    pub buyer_id: BuyerId,
    /// Status of the parent order.
    pub order_status: OrderStatus,
    /// Seller who owns the product.
    pub seller_id: SellerId,
}

/// A cart line joined with the current product data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Order item ID.
    pub item_id: OrderItemId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Seller of the product.
    pub seller_id: SellerId,
    /// Product title.
    pub title: String,
    /// Current unit price.
    pub unit_price: Price,
    /// Reserved units.
    pub quantity: Quantity,
    /// Units still available to other carts.
    pub available_stock: i32,
}

impl CartLine {
    /// Price of the whole line at current prices.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.line_total(self.quantity)
    }
}

/// A buyer's open cart.
///
/// `order_id` is `None` when the buyer has no open cart; `lines` is then empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cart {
    /// The cart order, if one is open.
    pub order_id: Option<OrderId>,
    /// Lines ordered by item ID.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.lines
            .iter()
            .map(|line| i64::from(line.quantity.get()))
            .sum()
    }

    /// Reserved quantity of one product, or zero.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> i32 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity.get())
    }
}

/// The outcome of one cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartChange {
    /// Product whose line changed.
    pub product_id: ProductId,
    /// The line after the change, or `None` if it was removed.
    pub item: Option<OrderItem>,
    /// Product stock after the change.
    pub stock: i32,
    /// Whether the cart itself was deleted because it became empty.
    pub cart_deleted: bool,
}

/// An order line as shown in the buyer's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Order item ID.
    pub item_id: OrderItemId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Seller of the product.
    pub seller_id: SellerId,
    /// Product title.
    pub title: String,
    /// Current unit price.
    pub unit_price: Price,
    /// Ordered units.
    pub quantity: Quantity,
    /// Fulfillment progress.
    pub status: ItemStatus,
}

/// A placed order with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithItems {
    /// The order header.
    pub order: Order,
    /// Lines ordered by item ID.
    pub lines: Vec<OrderLine>,
}

impl OrderWithItems {
    /// Order total at current prices.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines
            .iter()
            .map(|line| line.unit_price.line_total(line.quantity))
            .sum()
    }
}

/// The result of closing a cart after payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// The order, now `paid`.
    pub order: Order,
    /// Items awaiting shipment.
    pub items: Vec<OrderItem>,
}

/// An item a seller still has to ship or that is on its way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentEntry {
    /// Order item ID.
    pub item_id: OrderItemId,
    /// Parent order.
    pub order_id: OrderId,
    /// Buyer to ship to.
    pub buyer_id: BuyerId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Product title.
    pub title: String,
    /// Units to ship.
    pub quantity: Quantity,
    /// `paid` (awaiting shipment) or `shipping`.
    pub status: ItemStatus,
}
