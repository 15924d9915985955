//! Seller fulfillment handlers.

use axum::{Json, extract::State};

use bazaar_core::OrderItemId;

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::extract::AppPath;
use crate::middleware::RequireSeller;
use crate::models::{FulfillmentEntry, OrderItem};
use crate::services::OrderLifecycle;
use crate::state::AppState;

/// Items the seller has to ship or that are in transit.
pub async fn queue<S: Store>(
    State(state): State<AppState<S>>,
    RequireSeller(seller): RequireSeller,
) -> Result<Json<Vec<FulfillmentEntry>>> {
    let entries = OrderLifecycle::new(state.store())
        .fulfillment_queue(&seller)
        .await?;
    Ok(Json(entries))
}

/// Mark one of the seller's items as shipping.
pub async fn ship<S: Store>(
    State(state): State<AppState<S>>,
    RequireSeller(seller): RequireSeller,
    AppPath(item_id): AppPath<OrderItemId>,
) -> Result<Json<OrderItem>> {
    let item = OrderLifecycle::new(state.store())
        .mark_shipping(&seller, item_id)
        .await?;
    add_breadcrumb(
        "fulfillment",
        "Item shipped",
        &[
            ("item_id", item_id.to_string()),
            ("order_id", item.order_id.to_string()),
        ],
    );
    Ok(Json(item))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::db::MemoryStore;
    use crate::middleware::{BUYER_ID_HEADER, SELLER_ID_HEADER};
    use crate::routes::test_support::{app, product, send};

    #[tokio::test]
    async fn test_queue_and_ship() {
        let store = MemoryStore::new();
        let p1 = product(&store, "s1", 5).await;
        product(&store, "s2", 5).await;

        send(
            app(&store),
            Method::POST,
            "/cart/items",
            &[(BUYER_ID_HEADER, "b1")],
            Some(json!({ "productId": p1, "quantity": 1 })),
        )
        .await;

        // Carts are not visible to sellers.
        let (_, queue) = send(
            app(&store),
            Method::GET,
            "/fulfillment/queue",
            &[(SELLER_ID_HEADER, "s1")],
            None,
        )
        .await;
        assert_eq!(queue.as_array().unwrap().len(), 0);

        send(
            app(&store),
            Method::POST,
            "/payments/complete",
            &[],
            Some(json!({ "buyerId": "b1" })),
        )
        .await;

        let (status, queue) = send(
            app(&store),
            Method::GET,
            "/fulfillment/queue",
            &[(SELLER_ID_HEADER, "s1")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(queue[0]["status"], "paid");
        let item_id = queue[0]["itemId"].as_i64().unwrap();

        let (status, _) = send(
            app(&store),
            Method::POST,
            &format!("/fulfillment/items/{item_id}/ship"),
            &[(SELLER_ID_HEADER, "s2")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, item) = send(
            app(&store),
            Method::POST,
            &format!("/fulfillment/items/{item_id}/ship"),
            &[(SELLER_ID_HEADER, "s1")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["status"], "shipping");

        let (status, _) = send(
            app(&store),
            Method::POST,
            "/fulfillment/items/999/ship",
            &[(SELLER_ID_HEADER, "s1")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
