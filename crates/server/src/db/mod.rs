//! Storage for the marketplace.
//!
//! # Stores
//!
//! - [`PgStore`] - `PostgreSQL` (schema `bazaar`), used in production
//! - [`MemoryStore`] - in-process store with the same transactional
//!   guarantees, used by tests and local experiments
//!
//! Every mutation runs inside a [`UnitOfWork`] obtained from [`Store::begin`].
//! A unit of work owns its connection (or lock) until it is committed, rolled
//! back, or dropped; dropping it without committing discards every change.
//!
//! ## Tables
//!
//! - `sellers` - Seller identity and shop metadata
//! - `buyers` - Buyer identity and shipping profile (created lazily)
//! - `products` - Catalog entries; `stock` is the inventory ledger
//! - `orders` - Carts and placed orders (one open cart per buyer)
//! - `order_items` - Order lines with per-item fulfillment status
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::str::FromStr;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use thiserror::Error;

use bazaar_core::{BuyerId, ItemStatus, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, SellerId};

use crate::config::DatabaseConfig;
use crate::models::{
    BuyerProfile, CartLine, FulfillmentEntry, ItemRecord, NewProduct, NewSeller, Order, OrderItem,
    OrderWithItems, Product, ProfileUpdate, Seller,
};

pub use memory::{MemoryStore, MemoryUnitOfWork};
pub use postgres::{PgStore, PgUnitOfWork};

/// `PostgreSQL` error code raised when `statement_timeout` cancels a query.
const QUERY_CANCELED: &str = "57014";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A statement or pool acquisition exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(&'static str),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or a concurrent change that invalidated the operation.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::PoolTimedOut) {
            return Self::Timeout("waiting for a pooled connection");
        }
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.code().as_deref() == Some(QUERY_CANCELED)
        {
            return Self::Timeout("statement timeout exceeded");
        }
        Self::Database(err)
    }
}

/// An open transaction against a [`Store`].
///
/// All reads and writes of one cart or order mutation go through a single
/// unit of work. Cart rows returned by [`lock_cart`](Self::lock_cart) and
/// items returned by [`lock_item`](Self::lock_item) stay locked until the
/// unit of work ends.
pub trait UnitOfWork: Send {
    // -------------------------------------------------------------------------
    // Inventory ledger
    // -------------------------------------------------------------------------

    /// Read a product.
    fn product(
        &mut self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Atomically decrement stock by `qty` if at least `qty` units remain.
    ///
    /// Returns the remaining stock, or `None` when the product is missing or
    /// has fewer than `qty` units. The check and the decrement are a single
    /// conditional update, so concurrent debits cannot both pass the check.
    fn try_debit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> impl Future<Output = Result<Option<i32>, RepositoryError>> + Send;

    /// Increment stock by `qty`. Returns the new stock, or `None` when the
    /// product is missing.
    fn credit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> impl Future<Output = Result<Option<i32>, RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Catalog and accounts
    // -------------------------------------------------------------------------

    /// Create the buyer if this is their first interaction and return their profile.
    fn ensure_buyer(
        &mut self,
        buyer: &BuyerId,
    ) -> impl Future<Output = Result<BuyerProfile, RepositoryError>> + Send;

    /// Replace the buyer's shipping profile. The buyer must exist.
    fn save_profile(
        &mut self,
        buyer: &BuyerId,
        profile: &ProfileUpdate,
    ) -> impl Future<Output = Result<BuyerProfile, RepositoryError>> + Send;

    /// Read a seller.
    fn seller(
        &mut self,
        id: &SellerId,
    ) -> impl Future<Output = Result<Option<Seller>, RepositoryError>> + Send;

    /// Insert a seller, or update the shop metadata of an existing one.
    fn upsert_seller(
        &mut self,
        seller: &NewSeller,
    ) -> impl Future<Output = Result<Seller, RepositoryError>> + Send;

    /// Insert a product. The seller must exist.
    fn insert_product(
        &mut self,
        product: &NewProduct,
    ) -> impl Future<Output = Result<Product, RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Find and lock the buyer's open cart.
    fn lock_cart(
        &mut self,
        buyer: &BuyerId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Return the buyer's open cart, creating it if none exists, locked.
    fn open_cart(
        &mut self,
        buyer: &BuyerId,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Set an order's status and return the updated order.
    fn set_order_status(
        &mut self,
        order: OrderId,
        status: OrderStatus,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    /// Delete an order (and any remaining items).
    fn delete_order(
        &mut self,
        order: OrderId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Order items
    // -------------------------------------------------------------------------

    /// Find the line for `product` in `order`.
    fn order_item(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> impl Future<Output = Result<Option<OrderItem>, RepositoryError>> + Send;

    /// All lines of an order, ordered by item ID.
    fn order_items(
        &mut self,
        order: OrderId,
    ) -> impl Future<Output = Result<Vec<OrderItem>, RepositoryError>> + Send;

    /// Insert a new line in status `paid` (awaiting shipment once the order is paid).
    fn insert_item(
        &mut self,
        order: OrderId,
        product: ProductId,
        qty: Quantity,
    ) -> impl Future<Output = Result<OrderItem, RepositoryError>> + Send;

    /// Change a line's quantity.
    fn set_item_quantity(
        &mut self,
        item: OrderItemId,
        qty: Quantity,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a line.
    fn delete_item(
        &mut self,
        item: OrderItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Find and lock a line with its ownership facts.
    fn lock_item(
        &mut self,
        item: OrderItemId,
    ) -> impl Future<Output = Result<Option<ItemRecord>, RepositoryError>> + Send;

    /// Set a line's fulfillment status.
    fn set_item_status(
        &mut self,
        item: OrderItemId,
        status: ItemStatus,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    // -------------------------------------------------------------------------
    // Completion
    // -------------------------------------------------------------------------

    /// Make every change visible.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Discard every change.
    fn rollback(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// A marketplace store: the source of units of work and read-only projections.
pub trait Store: Clone + Send + Sync + 'static {
    /// The unit of work type handed out by [`begin`](Self::begin).
    type Tx: UnitOfWork + 'static;

    /// Start a transaction, holding one connection until it ends.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// Check that the store is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Read a product.
    fn product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Lines of the buyer's open cart joined with current product data.
    /// Empty when the buyer has no open cart.
    fn cart_lines(
        &self,
        buyer: &BuyerId,
    ) -> impl Future<Output = Result<(Option<OrderId>, Vec<CartLine>), RepositoryError>> + Send;

    /// The buyer's placed (non-cart) orders, newest first.
    fn buyer_orders(
        &self,
        buyer: &BuyerId,
    ) -> impl Future<Output = Result<Vec<OrderWithItems>, RepositoryError>> + Send;

    /// The seller's items in `paid` or `shipping` state from placed orders,
    /// oldest first.
    fn fulfillment_queue(
        &self,
        seller: &SellerId,
    ) -> impl Future<Output = Result<Vec<FulfillmentEntry>, RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool.
///
/// Every connection is configured with the statement timeout from `config`,
/// so no single statement can hold a transaction open indefinitely.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is invalid or the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(config.url.expose_secret())?.options([(
        "statement_timeout",
        config.statement_timeout.as_millis().to_string(),
    )]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_timeout() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Timeout(_)));
    }

    #[test]
    fn test_other_errors_map_to_database() {
        let err = RepositoryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
