//! `PostgreSQL` store.
//!
//! Queries are runtime-checked and decoded through internal `FromRow` row
//! types, which are converted into domain models (validating quantities on
//! the way out).

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use bazaar_core::{
    BuyerId, ItemStatus, OrderId, OrderItemId, OrderStatus, Price, ProductId, Quantity, SellerId,
};

use super::{RepositoryError, Store, UnitOfWork};
use crate::models::{
    BuyerProfile, CartLine, FulfillmentEntry, ItemRecord, NewProduct, NewSeller, Order, OrderItem,
    OrderLine, OrderWithItems, Product, ProfileUpdate, Seller,
};

// =============================================================================
// Internal Row Types
// =============================================================================

fn quantity(value: i32) -> Result<Quantity, RepositoryError> {
    Quantity::new(value).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid quantity in database: {e}"))
    })
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    seller_id: SellerId,
    title: String,
    price: Price,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            seller_id: row.seller_id,
            title: row.title,
            price: row.price,
            stock: row.stock,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SellerRow {
    id: SellerId,
    shop_name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SellerRow> for Seller {
    fn from(row: SellerRow) -> Self {
        Self {
            id: row.id,
            shop_name: row.shop_name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BuyerRow {
    id: BuyerId,
    name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BuyerRow> for BuyerProfile {
    fn from(row: BuyerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    buyer_id: BuyerId,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            buyer_id: row.buyer_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    status: ItemStatus,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: quantity(row.quantity)?,
            status: row.status,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRecordRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i32,
    status: ItemStatus,
    buyer_id: BuyerId,
    order_status: OrderStatus,
    seller_id: SellerId,
}

impl TryFrom<ItemRecordRow> for ItemRecord {
    type Error = RepositoryError;

    fn try_from(row: ItemRecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item: OrderItem {
                id: row.id,
                order_id: row.order_id,
                product_id: row.product_id,
                quantity: quantity(row.quantity)?,
                status: row.status,
            },
            buyer_id: row.buyer_id,
            order_status: row.order_status,
            seller_id: row.seller_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    item_id: OrderItemId,
    product_id: ProductId,
    seller_id: SellerId,
    title: String,
    price: Price,
    quantity: i32,
    stock: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    order_id: OrderId,
    item_id: OrderItemId,
    product_id: ProductId,
    seller_id: SellerId,
    title: String,
    price: Price,
    quantity: i32,
    status: ItemStatus,
}

#[derive(Debug, sqlx::FromRow)]
struct FulfillmentRow {
    item_id: OrderItemId,
    order_id: OrderId,
    buyer_id: BuyerId,
    product_id: ProductId,
    title: String,
    quantity: i32,
    status: ItemStatus,
}

impl TryFrom<FulfillmentRow> for FulfillmentEntry {
    type Error = RepositoryError;

    fn try_from(row: FulfillmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            item_id: row.item_id,
            order_id: row.order_id,
            buyer_id: row.buyer_id,
            product_id: row.product_id,
            title: row.title,
            quantity: quantity(row.quantity)?,
            status: row.status,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, seller_id, title, price, stock
            FROM bazaar.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    #[instrument(skip(self), fields(buyer = %buyer))]
    async fn cart_lines(
        &self,
        buyer: &BuyerId,
    ) -> Result<(Option<OrderId>, Vec<CartLine>), RepositoryError> {
        let cart_id: Option<OrderId> = sqlx::query_scalar(
            r"
            SELECT id FROM bazaar.orders
            WHERE buyer_id = $1 AND status = 'cart'
            ",
        )
        .bind(buyer)
        .fetch_optional(&self.pool)
        .await?;

        let Some(cart_id) = cart_id else {
            return Ok((None, Vec::new()));
        };

        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT i.id AS item_id, p.id AS product_id, p.seller_id,
                   p.title, p.price, i.quantity, p.stock
            FROM bazaar.order_items i
            JOIN bazaar.products p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(|r| {
                Ok(CartLine {
                    item_id: r.item_id,
                    product_id: r.product_id,
                    seller_id: r.seller_id,
                    title: r.title,
                    unit_price: r.price,
                    quantity: quantity(r.quantity)?,
                    available_stock: r.stock,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok((Some(cart_id), lines))
    }

    #[instrument(skip(self), fields(buyer = %buyer))]
    async fn buyer_orders(&self, buyer: &BuyerId) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let orders = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, buyer_id, status, created_at, updated_at
            FROM bazaar.orders
            WHERE buyer_id = $1 AND status <> 'cart'
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(buyer)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT i.order_id, i.id AS item_id, p.id AS product_id, p.seller_id,
                   p.title, p.price, i.quantity, i.status
            FROM bazaar.order_items i
            JOIN bazaar.products p ON p.id = i.product_id
            WHERE i.order_id = ANY($1)
            ORDER BY i.id
            ",
        )
        .bind(&order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut result: Vec<OrderWithItems> = orders
            .into_iter()
            .map(|o| OrderWithItems {
                order: o.into(),
                lines: Vec::new(),
            })
            .collect();

        for r in rows {
            let Some(entry) = result.iter_mut().find(|o| o.order.id == r.order_id) else {
                continue;
            };
            entry.lines.push(OrderLine {
                item_id: r.item_id,
                product_id: r.product_id,
                seller_id: r.seller_id,
                title: r.title,
                unit_price: r.price,
                quantity: quantity(r.quantity)?,
                status: r.status,
            });
        }

        Ok(result)
    }

    #[instrument(skip(self), fields(seller = %seller))]
    async fn fulfillment_queue(
        &self,
        seller: &SellerId,
    ) -> Result<Vec<FulfillmentEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, FulfillmentRow>(
            r"
            SELECT i.id AS item_id, o.id AS order_id, o.buyer_id, p.id AS product_id,
                   p.title, i.quantity, i.status
            FROM bazaar.order_items i
            JOIN bazaar.orders o ON o.id = i.order_id
            JOIN bazaar.products p ON p.id = i.product_id
            WHERE p.seller_id = $1
              AND o.status <> 'cart'
              AND i.status IN ('paid', 'shipping')
            ORDER BY o.updated_at ASC, i.id ASC
            ",
        )
        .bind(seller)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FulfillmentEntry::try_from).collect()
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// A `PostgreSQL` transaction.
///
/// Owns its pooled connection. Dropping it without calling
/// [`commit`](UnitOfWork::commit) rolls the transaction back and returns the
/// connection to the pool.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}

impl UnitOfWork for PgUnitOfWork {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, seller_id, title, price, stock
            FROM bazaar.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn try_debit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> Result<Option<i32>, RepositoryError> {
        // Concurrent debits of the same row queue on the row lock and
        // re-evaluate `stock >= $2` against the committed value.
        let remaining: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE bazaar.products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(qty.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(remaining)
    }

    async fn credit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> Result<Option<i32>, RepositoryError> {
        let stock: Option<i32> = sqlx::query_scalar(
            r"
            UPDATE bazaar.products
            SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING stock
            ",
        )
        .bind(id)
        .bind(qty.get())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(stock)
    }

    async fn ensure_buyer(&mut self, buyer: &BuyerId) -> Result<BuyerProfile, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO bazaar.buyers (id)
            VALUES ($1)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(buyer)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query_as::<_, BuyerRow>(
            r"
            SELECT id, name, address, phone, created_at, updated_at
            FROM bazaar.buyers
            WHERE id = $1
            ",
        )
        .bind(buyer)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn save_profile(
        &mut self,
        buyer: &BuyerId,
        profile: &ProfileUpdate,
    ) -> Result<BuyerProfile, RepositoryError> {
        let row = sqlx::query_as::<_, BuyerRow>(
            r"
            UPDATE bazaar.buyers
            SET name = $2, address = $3, phone = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, address, phone, created_at, updated_at
            ",
        )
        .bind(buyer)
        .bind(profile.name.as_deref())
        .bind(profile.address.as_deref())
        .bind(profile.phone.as_deref())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(BuyerProfile::from).ok_or(RepositoryError::NotFound)
    }

    async fn seller(&mut self, id: &SellerId) -> Result<Option<Seller>, RepositoryError> {
        let row = sqlx::query_as::<_, SellerRow>(
            r"
            SELECT id, shop_name, description, created_at
            FROM bazaar.sellers
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Seller::from))
    }

    async fn upsert_seller(&mut self, seller: &NewSeller) -> Result<Seller, RepositoryError> {
        let row = sqlx::query_as::<_, SellerRow>(
            r"
            INSERT INTO bazaar.sellers (id, shop_name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET shop_name = EXCLUDED.shop_name, description = EXCLUDED.description
            RETURNING id, shop_name, description, created_at
            ",
        )
        .bind(&seller.id)
        .bind(&seller.shop_name)
        .bind(seller.description.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO bazaar.products (seller_id, title, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, seller_id, title, price, stock
            ",
        )
        .bind(&product.seller_id)
        .bind(&product.title)
        .bind(product.price)
        .bind(product.stock)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict("seller does not exist".to_owned());
            }
            RepositoryError::from(e)
        })?;

        Ok(row.into())
    }

    async fn lock_cart(&mut self, buyer: &BuyerId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, buyer_id, status, created_at, updated_at
            FROM bazaar.orders
            WHERE buyer_id = $1 AND status = 'cart'
            FOR UPDATE
            ",
        )
        .bind(buyer)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Order::from))
    }

    async fn open_cart(&mut self, buyer: &BuyerId) -> Result<Order, RepositoryError> {
        // A concurrent first add for the same buyer waits on the partial
        // unique index here and then falls through to the lock below.
        sqlx::query(
            r"
            INSERT INTO bazaar.orders (buyer_id, status)
            VALUES ($1, 'cart')
            ON CONFLICT (buyer_id) WHERE status = 'cart' DO NOTHING
            ",
        )
        .bind(buyer)
        .execute(&mut *self.tx)
        .await?;

        self.lock_cart(buyer).await?.ok_or_else(|| {
            RepositoryError::Conflict("open cart was closed by a concurrent request".to_owned())
        })
    }

    async fn set_order_status(
        &mut self,
        order: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            UPDATE bazaar.orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, buyer_id, status, created_at, updated_at
            ",
        )
        .bind(order)
        .bind(status)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Order::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_order(&mut self, order: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.orders WHERE id = $1")
            .bind(order)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn order_item(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> Result<Option<OrderItem>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, quantity, status
            FROM bazaar.order_items
            WHERE order_id = $1 AND product_id = $2
            ",
        )
        .bind(order)
        .bind(product)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(OrderItem::try_from).transpose()
    }

    async fn order_items(&mut self, order: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT id, order_id, product_id, quantity, status
            FROM bazaar.order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn insert_item(
        &mut self,
        order: OrderId,
        product: ProductId,
        qty: Quantity,
    ) -> Result<OrderItem, RepositoryError> {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r"
            INSERT INTO bazaar.order_items (order_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, product_id, quantity, status
            ",
        )
        .bind(order)
        .bind(product)
        .bind(qty.get())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("product already in cart".to_owned());
            }
            RepositoryError::from(e)
        })?;

        row.try_into()
    }

    async fn set_item_quantity(
        &mut self,
        item: OrderItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.order_items SET quantity = $2 WHERE id = $1")
            .bind(item)
            .bind(qty.get())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_item(&mut self, item: OrderItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bazaar.order_items WHERE id = $1")
            .bind(item)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn lock_item(&mut self, item: OrderItemId) -> Result<Option<ItemRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRecordRow>(
            r"
            SELECT i.id, i.order_id, i.product_id, i.quantity, i.status,
                   o.buyer_id, o.status AS order_status, p.seller_id
            FROM bazaar.order_items i
            JOIN bazaar.orders o ON o.id = i.order_id
            JOIN bazaar.products p ON p.id = i.product_id
            WHERE i.id = $1
            FOR UPDATE OF i, o
            ",
        )
        .bind(item)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ItemRecord::try_from).transpose()
    }

    async fn set_item_status(
        &mut self,
        item: OrderItemId,
        status: ItemStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bazaar.order_items SET status = $2 WHERE id = $1")
            .bind(item)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
