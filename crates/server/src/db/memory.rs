//! In-process store.
//!
//! A unit of work takes the store's lock for its whole lifetime and mutates a
//! private copy of the state. Commit swaps the copy in; rollback or drop
//! discards it. Units of work are therefore fully serialized, which is a
//! stronger guarantee than the row locks `PgStore` relies on.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{
    BuyerId, ItemStatus, OrderId, OrderItemId, OrderStatus, ProductId, Quantity, SellerId,
};

use super::{RepositoryError, Store, UnitOfWork};
use crate::models::{
    BuyerProfile, CartLine, FulfillmentEntry, ItemRecord, NewProduct, NewSeller, Order, OrderItem,
    OrderLine, OrderWithItems, Product, ProfileUpdate, Seller,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    sellers: BTreeMap<SellerId, Seller>,
    buyers: BTreeMap<BuyerId, BuyerProfile>,
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    items: BTreeMap<OrderItemId, OrderItem>,
    last_product: i32,
    last_order: i32,
    last_item: i32,
}

impl MemoryState {
    fn open_cart(&self, buyer: &BuyerId) -> Option<&Order> {
        self.orders
            .values()
            .find(|o| &o.buyer_id == buyer && o.status.is_cart())
    }

    fn items_of(&self, order: OrderId) -> impl Iterator<Item = &OrderItem> {
        self.items.values().filter(move |i| i.order_id == order)
    }

    fn product_ref(&self, id: ProductId) -> Result<&Product, RepositoryError> {
        self.products.get(&id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order item references missing product {id}"))
        })
    }
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnitOfWork { guard, working })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn cart_lines(
        &self,
        buyer: &BuyerId,
    ) -> Result<(Option<OrderId>, Vec<CartLine>), RepositoryError> {
        let state = self.state.lock().await;
        let Some(cart) = state.open_cart(buyer) else {
            return Ok((None, Vec::new()));
        };

        let mut lines = Vec::new();
        for item in state.items_of(cart.id) {
            let product = state.product_ref(item.product_id)?;
            lines.push(CartLine {
                item_id: item.id,
                product_id: product.id,
                seller_id: product.seller_id.clone(),
                title: product.title.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                available_stock: product.stock,
            });
        }

        Ok((Some(cart.id), lines))
    }

    async fn buyer_orders(&self, buyer: &BuyerId) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let state = self.state.lock().await;
        let mut orders: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| &o.buyer_id == buyer && !o.status.is_cart())
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let mut lines = Vec::new();
            for item in state.items_of(order.id) {
                let product = state.product_ref(item.product_id)?;
                lines.push(OrderLine {
                    item_id: item.id,
                    product_id: product.id,
                    seller_id: product.seller_id.clone(),
                    title: product.title.clone(),
                    unit_price: product.price,
                    quantity: item.quantity,
                    status: item.status,
                });
            }
            result.push(OrderWithItems {
                order: order.clone(),
                lines,
            });
        }

        Ok(result)
    }

    async fn fulfillment_queue(
        &self,
        seller: &SellerId,
    ) -> Result<Vec<FulfillmentEntry>, RepositoryError> {
        let state = self.state.lock().await;
        let mut entries = Vec::new();
        for item in state.items.values() {
            if item.status == ItemStatus::Shipped {
                continue;
            }
            let product = state.product_ref(item.product_id)?;
            if &product.seller_id != seller {
                continue;
            }
            let Some(order) = state.orders.get(&item.order_id) else {
                continue;
            };
            if order.status.is_cart() {
                continue;
            }
            entries.push((
                order.updated_at,
                FulfillmentEntry {
                    item_id: item.id,
                    order_id: order.id,
                    buyer_id: order.buyer_id.clone(),
                    product_id: product.id,
                    title: product.title.clone(),
                    quantity: item.quantity,
                    status: item.status,
                },
            ));
        }
        entries.sort_by(|a, b| (a.0, a.1.item_id).cmp(&(b.0, b.1.item_id)));

        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }
}

/// A unit of work over a [`MemoryStore`].
///
/// Holds the store lock until committed, rolled back, or dropped.
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl UnitOfWork for MemoryUnitOfWork {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn try_debit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> Result<Option<i32>, RepositoryError> {
        let Some(product) = self.working.products.get_mut(&id) else {
            return Ok(None);
        };
        if product.stock < qty.get() {
            return Ok(None);
        }
        product.stock -= qty.get();
        Ok(Some(product.stock))
    }

    async fn credit_stock(
        &mut self,
        id: ProductId,
        qty: Quantity,
    ) -> Result<Option<i32>, RepositoryError> {
        let Some(product) = self.working.products.get_mut(&id) else {
            return Ok(None);
        };
        product.stock = product
            .stock
            .checked_add(qty.get())
            .ok_or_else(|| RepositoryError::Conflict("stock out of range".to_owned()))?;
        Ok(Some(product.stock))
    }

    async fn ensure_buyer(&mut self, buyer: &BuyerId) -> Result<BuyerProfile, RepositoryError> {
        let profile = self.working.buyers.entry(buyer.clone()).or_insert_with(|| {
            let now = Utc::now();
            BuyerProfile {
                id: buyer.clone(),
                name: None,
                address: None,
                phone: None,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(profile.clone())
    }

    async fn save_profile(
        &mut self,
        buyer: &BuyerId,
        profile: &ProfileUpdate,
    ) -> Result<BuyerProfile, RepositoryError> {
        let existing = self
            .working
            .buyers
            .get_mut(buyer)
            .ok_or(RepositoryError::NotFound)?;
        existing.name.clone_from(&profile.name);
        existing.address.clone_from(&profile.address);
        existing.phone.clone_from(&profile.phone);
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn seller(&mut self, id: &SellerId) -> Result<Option<Seller>, RepositoryError> {
        Ok(self.working.sellers.get(id).cloned())
    }

    async fn upsert_seller(&mut self, seller: &NewSeller) -> Result<Seller, RepositoryError> {
        let entry = self
            .working
            .sellers
            .entry(seller.id.clone())
            .or_insert_with(|| Seller {
                id: seller.id.clone(),
                shop_name: String::new(),
                description: None,
                created_at: Utc::now(),
            });
        entry.shop_name.clone_from(&seller.shop_name);
        entry.description.clone_from(&seller.description);
        Ok(entry.clone())
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        if !self.working.sellers.contains_key(&product.seller_id) {
            return Err(RepositoryError::Conflict("seller does not exist".to_owned()));
        }
        self.working.last_product += 1;
        let created = Product {
            id: ProductId::new(self.working.last_product),
            seller_id: product.seller_id.clone(),
            title: product.title.clone(),
            price: product.price,
            stock: product.stock,
        };
        self.working.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn lock_cart(&mut self, buyer: &BuyerId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.open_cart(buyer).cloned())
    }

    async fn open_cart(&mut self, buyer: &BuyerId) -> Result<Order, RepositoryError> {
        if let Some(cart) = self.working.open_cart(buyer) {
            return Ok(cart.clone());
        }
        if !self.working.buyers.contains_key(buyer) {
            return Err(RepositoryError::Conflict("buyer does not exist".to_owned()));
        }
        self.working.last_order += 1;
        let now = Utc::now();
        let cart = Order {
            id: OrderId::new(self.working.last_order),
            buyer_id: buyer.clone(),
            status: OrderStatus::Cart,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn set_order_status(
        &mut self,
        order: OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let existing = self
            .working
            .orders
            .get_mut(&order)
            .ok_or(RepositoryError::NotFound)?;
        existing.status = status;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete_order(&mut self, order: OrderId) -> Result<(), RepositoryError> {
        self.working
            .orders
            .remove(&order)
            .ok_or(RepositoryError::NotFound)?;
        self.working.items.retain(|_, item| item.order_id != order);
        Ok(())
    }

    async fn order_item(
        &mut self,
        order: OrderId,
        product: ProductId,
    ) -> Result<Option<OrderItem>, RepositoryError> {
        Ok(self
            .working
            .items_of(order)
            .find(|i| i.product_id == product)
            .cloned())
    }

    async fn order_items(&mut self, order: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self.working.items_of(order).cloned().collect())
    }

    async fn insert_item(
        &mut self,
        order: OrderId,
        product: ProductId,
        qty: Quantity,
    ) -> Result<OrderItem, RepositoryError> {
        if !self.working.orders.contains_key(&order) {
            return Err(RepositoryError::Conflict("order does not exist".to_owned()));
        }
        if !self.working.products.contains_key(&product) {
            return Err(RepositoryError::Conflict("product does not exist".to_owned()));
        }
        if self
            .working
            .items_of(order)
            .any(|i| i.product_id == product)
        {
            return Err(RepositoryError::Conflict("product already in cart".to_owned()));
        }
        self.working.last_item += 1;
        let item = OrderItem {
            id: OrderItemId::new(self.working.last_item),
            order_id: order,
            product_id: product,
            quantity: qty,
            status: ItemStatus::default(),
        };
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn set_item_quantity(
        &mut self,
        item: OrderItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        let existing = self
            .working
            .items
            .get_mut(&item)
            .ok_or(RepositoryError::NotFound)?;
        existing.quantity = qty;
        Ok(())
    }

    async fn delete_item(&mut self, item: OrderItemId) -> Result<(), RepositoryError> {
        self.working
            .items
            .remove(&item)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn lock_item(&mut self, item: OrderItemId) -> Result<Option<ItemRecord>, RepositoryError> {
        let Some(found) = self.working.items.get(&item) else {
            return Ok(None);
        };
        let order = self.working.orders.get(&found.order_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order item {item} has no parent order"))
        })?;
        let product = self.working.product_ref(found.product_id)?;

        Ok(Some(ItemRecord {
            item: found.clone(),
            buyer_id: order.buyer_id.clone(),
            order_status: order.status,
            seller_id: product.seller_id.clone(),
        }))
    }

    async fn set_item_status(
        &mut self,
        item: OrderItemId,
        status: ItemStatus,
    ) -> Result<(), RepositoryError> {
        let existing = self
            .working
            .items
            .get_mut(&item)
            .ok_or(RepositoryError::NotFound)?;
        existing.status = status;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        *self.guard = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::Price;

    async fn seeded() -> (MemoryStore, ProductId) {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let seller = tx
            .upsert_seller(&NewSeller {
                id: SellerId::parse("s1").unwrap(),
                shop_name: "Shop".to_owned(),
                description: None,
            })
            .await
            .unwrap();
        let product = tx
            .insert_product(&NewProduct {
                seller_id: seller.id,
                title: "Mug".to_owned(),
                price: Price::from_cents(1200).unwrap(),
                stock: 5,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, product.id)
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let (store, product) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(
            tx.try_debit_stock(product, Quantity::new(2).unwrap())
                .await
                .unwrap(),
            Some(3)
        );
        tx.commit().await.unwrap();

        assert_eq!(store.product(product).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_drop_discards_changes() {
        let (store, product) = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.try_debit_stock(product, Quantity::new(2).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(store.product(product).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_debit_refuses_overdraw() {
        let (store, product) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .try_debit_stock(product, Quantity::new(6).unwrap())
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(tx.product(product).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_open_cart_requires_buyer() {
        let store = MemoryStore::new();
        let buyer = BuyerId::parse("b1").unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.open_cart(&buyer).await,
            Err(RepositoryError::Conflict(_))
        ));

        tx.ensure_buyer(&buyer).await.unwrap();
        let first = tx.open_cart(&buyer).await.unwrap();
        let second = tx.open_cart(&buyer).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_delete_order_cascades_items() {
        let (store, product) = seeded().await;
        let buyer = BuyerId::parse("b1").unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.ensure_buyer(&buyer).await.unwrap();
        let cart = tx.open_cart(&buyer).await.unwrap();
        tx.insert_item(cart.id, product, Quantity::ONE).await.unwrap();
        tx.delete_order(cart.id).await.unwrap();
        assert!(tx.order_items(cart.id).await.unwrap().is_empty());
        assert!(tx.lock_cart(&buyer).await.unwrap().is_none());
    }
}
