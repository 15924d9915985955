//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness check
//! GET  /health/ready                         - Readiness check (store reachable)
//!
//! # Cart (x-buyer-id)
//! GET    /cart                               - Cart view
//! POST   /cart/items                         - Add item (reserves stock)
//! PUT    /cart/items/{productId}             - Set quantity (<= 0 removes)
//! DELETE /cart/items/{productId}             - Remove item (releases stock)
//!
//! # Payments (called by the payment gateway integration)
//! POST /payments/complete                    - Close the buyer's cart as paid
//!
//! # Orders (x-buyer-id)
//! GET  /orders                               - Order history
//! POST /orders/items/{orderItemId}/received  - Confirm receipt
//!
//! # Fulfillment (x-seller-id)
//! GET  /fulfillment/queue                    - Items to ship / in transit
//! POST /fulfillment/items/{orderItemId}/ship - Mark item as shipping
//!
//! # Account (x-buyer-id)
//! GET  /account/profile                      - Shipping profile
//! PUT  /account/profile                      - Replace shipping profile
//!
//! # Catalog
//! GET  /products/{id}                        - Product detail with stock
//! ```

pub mod account;
pub mod cart;
pub mod fulfillment;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::db::Store;
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>))
        .route("/items", post(cart::add::<S>))
        .route(
            "/items/{product_id}",
            put(cart::update::<S>).delete(cart::remove::<S>),
        )
}

/// Create the order routes router.
pub fn order_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>))
        .route("/items/{item_id}/received", post(orders::received::<S>))
}

/// Create the fulfillment routes router.
pub fn fulfillment_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/queue", get(fulfillment::queue::<S>))
        .route("/items/{item_id}/ship", post(fulfillment::ship::<S>))
}

/// Create the account routes router.
pub fn account_routes<S: Store>() -> Router<AppState<S>> {
    Router::new().route(
        "/profile",
        get(account::show::<S>).put(account::update::<S>),
    )
}

/// Create all routes for the marketplace.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .nest("/cart", cart_routes())
        .route("/payments/complete", post(payments::complete::<S>))
        .nest("/orders", order_routes())
        .nest("/fulfillment", fulfillment_routes())
        .nest("/account", account_routes())
        .route("/products/{id}", get(products::show::<S>))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Helpers for driving the router against an in-memory store.

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use bazaar_core::{Price, ProductId, SellerId};

    use super::routes;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, NewSeller};
    use crate::services::CatalogService;
    use crate::state::AppState;

    pub fn app(store: &MemoryStore) -> Router {
        routes().with_state(AppState::new(store.clone()))
    }

    /// Register seller `seller` and list one product with `stock` units.
    pub async fn product(store: &MemoryStore, seller: &str, stock: i32) -> ProductId {
        let catalog = CatalogService::new(store);
        catalog
            .register_seller(NewSeller {
                id: SellerId::parse(seller).unwrap(),
                shop_name: format!("{seller}'s shop"),
                description: None,
            })
            .await
            .unwrap();
        catalog
            .create_product(NewProduct {
                seller_id: SellerId::parse(seller).unwrap(),
                title: "Tote bag".to_owned(),
                price: Price::from_cents(1250).unwrap(),
                stock,
            })
            .await
            .unwrap()
            .id
    }

    /// Send a request and decode the JSON response body.
    pub async fn send(
        app: Router,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
