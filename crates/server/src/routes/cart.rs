//! Cart route handlers.
//!
//! Every mutation responds with the full cart view after the change, priced
//! at current product prices.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{OrderId, ProductId, Quantity};

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::extract::{AppJson, AppPath};
use crate::middleware::RequireBuyer;
use crate::models::{Cart, CartLine};
use crate::services::{CartService, MarketError};
use crate::state::AppState;

/// Request body for adding an item.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Request body for setting an item's quantity.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// A cart line with its total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Decimal,
}

/// The buyer's cart as returned by every cart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub order_id: Option<OrderId>,
    pub lines: Vec<CartLineView>,
    pub item_count: i64,
    pub subtotal: Decimal,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let item_count = cart.item_count();
        let subtotal = cart.subtotal();
        Self {
            order_id: cart.order_id,
            lines: cart
                .lines
                .into_iter()
                .map(|line| CartLineView {
                    line_total: line.line_total(),
                    line,
                })
                .collect(),
            item_count,
            subtotal,
        }
    }
}

/// Show the buyer's cart.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<Json<CartView>> {
    let cart = CartService::new(state.store()).list_items(&buyer).await?;
    Ok(Json(cart.into()))
}

/// Add an item to the buyer's cart.
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
    AppJson(req): AppJson<AddItemRequest>,
) -> Result<Json<CartView>> {
    let qty = Quantity::try_from(req.quantity).map_err(MarketError::from)?;
    let carts = CartService::new(state.store());

    let change = carts.add_item(&buyer, req.product_id, qty).await?;
    add_breadcrumb(
        "cart",
        "Added item",
        &[
            ("product_id", req.product_id.to_string()),
            ("stock", change.stock.to_string()),
        ],
    );

    Ok(Json(carts.list_items(&buyer).await?.into()))
}

/// Set the quantity of an item; zero or less removes it.
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
    AppPath(product_id): AppPath<ProductId>,
    AppJson(req): AppJson<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let carts = CartService::new(state.store());

    carts.update_item(&buyer, product_id, req.quantity).await?;
    add_breadcrumb(
        "cart",
        "Updated item",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", req.quantity.to_string()),
        ],
    );

    Ok(Json(carts.list_items(&buyer).await?.into()))
}

/// Remove an item from the buyer's cart.
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
    AppPath(product_id): AppPath<ProductId>,
) -> Result<Json<CartView>> {
    let carts = CartService::new(state.store());

    carts.remove_item(&buyer, product_id).await?;
    add_breadcrumb(
        "cart",
        "Removed item",
        &[("product_id", product_id.to_string())],
    );

    Ok(Json(carts.list_items(&buyer).await?.into()))
}
