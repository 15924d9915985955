//! Buyer order history and receipt confirmation.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::OrderItemId;

use crate::db::Store;
use crate::error::Result;
use crate::extract::AppPath;
use crate::middleware::RequireBuyer;
use crate::models::{Order, OrderItem, OrderLine, OrderWithItems};
use crate::services::OrderLifecycle;
use crate::state::AppState;

/// A placed order with its lines and total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
}

impl From<OrderWithItems> for OrderView {
    fn from(order: OrderWithItems) -> Self {
        let total = order.total();
        Self {
            order: order.order,
            lines: order.lines,
            total,
        }
    }
}

/// List the buyer's placed orders, newest first.
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<Json<Vec<OrderView>>> {
    let orders = OrderLifecycle::new(state.store())
        .list_orders(&buyer)
        .await?;
    Ok(Json(orders.into_iter().map(OrderView::from).collect()))
}

/// Confirm receipt of one item.
pub async fn received<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
    AppPath(item_id): AppPath<OrderItemId>,
) -> Result<Json<OrderItem>> {
    let item = OrderLifecycle::new(state.store())
        .confirm_receipt(&buyer, item_id)
        .await?;
    Ok(Json(item))
}
