//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p bazaar-integration-tests
//!
//! # PostgreSQL-backed tests (database must exist; migrations are applied)
//! BAZAAR_TEST_DATABASE_URL=postgres://localhost/bazaar_test \
//!     cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_ledger` - Reservation, conservation and concurrency
//! - `order_lifecycle` - Payment, shipping and receipt
//! - `postgres_store` - The same guarantees against `PostgreSQL`
//! - `http_api` - A running server, driven over HTTP

use std::time::Duration;

use secrecy::SecretString;

use bazaar_core::{BuyerId, Price, ProductId, Quantity, SellerId};
use bazaar_server::config::DatabaseConfig;
use bazaar_server::db::{self, PgStore, Store};
use bazaar_server::models::{NewProduct, NewSeller};
use bazaar_server::services::CatalogService;

/// Build a buyer identity.
///
/// # Panics
///
/// Panics if `id` is not a valid identity key.
#[must_use]
pub fn buyer(id: &str) -> BuyerId {
    BuyerId::parse(id).expect("valid buyer id")
}

/// Build a seller identity.
///
/// # Panics
///
/// Panics if `id` is not a valid identity key.
#[must_use]
pub fn seller(id: &str) -> SellerId {
    SellerId::parse(id).expect("valid seller id")
}

/// Build a positive quantity.
///
/// # Panics
///
/// Panics if `n` is not positive.
#[must_use]
pub fn qty(n: i32) -> Quantity {
    Quantity::new(n).expect("positive quantity")
}

/// Register `seller_id` (if needed) and list a product priced at `cents`.
///
/// # Panics
///
/// Panics if the catalog rejects the seller or product.
pub async fn list_product<S: Store>(
    store: &S,
    seller_id: &str,
    cents: i64,
    stock: i32,
) -> ProductId {
    let catalog = CatalogService::new(store);
    catalog
        .register_seller(NewSeller {
            id: seller(seller_id),
            shop_name: format!("{seller_id} shop"),
            description: None,
        })
        .await
        .expect("register seller");
    catalog
        .create_product(NewProduct {
            seller_id: seller(seller_id),
            title: format!("{seller_id} product"),
            price: Price::from_cents(cents).expect("valid price"),
            stock,
        })
        .await
        .expect("create product")
        .id
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product does not exist.
pub async fn stock_of<S: Store>(store: &S, product: ProductId) -> i32 {
    store
        .product(product)
        .await
        .expect("read product")
        .expect("product exists")
        .stock
}

/// A fresh identity key, so tests sharing a database do not collide.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Connect to the database named by `BAZAAR_TEST_DATABASE_URL` and apply
/// migrations.
///
/// # Panics
///
/// Panics if the variable is unset, the database is unreachable or a
/// migration fails.
pub async fn pg_store() -> PgStore {
    let url = std::env::var("BAZAAR_TEST_DATABASE_URL")
        .expect("BAZAAR_TEST_DATABASE_URL must be set for PostgreSQL tests");

    let config = DatabaseConfig {
        url: SecretString::from(url),
        max_connections: 8,
        min_connections: 1,
        acquire_timeout: Duration::from_secs(10),
        statement_timeout: Duration::from_secs(5),
    };
    let pool = db::create_pool(&config)
        .await
        .expect("connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("apply migrations");

    PgStore::new(pool)
}
