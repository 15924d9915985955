//! Payment completion handler.
//!
//! The payment gateway integration verifies the payment itself and then
//! calls this endpoint with nothing but the buyer identity.

use axum::{Json, extract::State};
use serde::Deserialize;

use bazaar_core::BuyerId;

use crate::db::Store;
use crate::error::Result;
use crate::extract::AppJson;
use crate::models::OrderReceipt;
use crate::services::{MarketError, OrderLifecycle};
use crate::state::AppState;

/// Request body for a completed payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompleted {
    pub buyer_id: String,
}

/// Close the buyer's open cart as paid.
///
/// A repeated notification finds no open cart and gets a 404, which callers
/// can treat as "already processed".
pub async fn complete<S: Store>(
    State(state): State<AppState<S>>,
    AppJson(req): AppJson<PaymentCompleted>,
) -> Result<Json<OrderReceipt>> {
    let buyer = BuyerId::parse(&req.buyer_id).map_err(MarketError::from)?;
    let receipt = OrderLifecycle::new(state.store()).mark_paid(&buyer).await?;
    Ok(Json(receipt))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::db::MemoryStore;
    use crate::middleware::BUYER_ID_HEADER;
    use crate::routes::test_support::{app, product, send};

    #[tokio::test]
    async fn test_complete_payment() {
        let store = MemoryStore::new();
        let p1 = product(&store, "s1", 5).await;
        send(
            app(&store),
            Method::POST,
            "/cart/items",
            &[(BUYER_ID_HEADER, "b1")],
            Some(json!({ "productId": p1, "quantity": 2 })),
        )
        .await;

        let (status, body) = send(
            app(&store),
            Method::POST,
            "/payments/complete",
            &[],
            Some(json!({ "buyerId": "b1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["order"]["status"], "paid");
        assert_eq!(body["items"][0]["status"], "paid");

        let (status, _) = send(
            app(&store),
            Method::POST,
            "/payments/complete",
            &[],
            Some(json!({ "buyerId": "b1" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_blank_buyer_rejected() {
        let store = MemoryStore::new();
        let (status, _) = send(
            app(&store),
            Method::POST,
            "/payments/complete",
            &[],
            Some(json!({ "buyerId": " " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_buyer_rejected() {
        let store = MemoryStore::new();
        let (status, body) = send(
            app(&store),
            Method::POST,
            "/payments/complete",
            &[],
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("buyerId"));
    }
}
