//! Buyer profile handlers.

use axum::{Json, extract::State};

use crate::db::Store;
use crate::error::Result;
use crate::extract::AppJson;
use crate::middleware::RequireBuyer;
use crate::models::{BuyerProfile, ProfileUpdate};
use crate::services::AccountService;
use crate::state::AppState;

/// Show the buyer's shipping profile.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
) -> Result<Json<BuyerProfile>> {
    let profile = AccountService::new(state.store()).profile(&buyer).await?;
    Ok(Json(profile))
}

/// Replace the buyer's shipping profile.
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireBuyer(buyer): RequireBuyer,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<BuyerProfile>> {
    let profile = AccountService::new(state.store())
        .update_profile(&buyer, update)
        .await?;
    Ok(Json(profile))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::db::MemoryStore;
    use crate::middleware::BUYER_ID_HEADER;
    use crate::routes::test_support::{app, send};

    #[tokio::test]
    async fn test_profile_round_trip() {
        let store = MemoryStore::new();
        let buyer = [(BUYER_ID_HEADER, "b1")];

        let (status, profile) =
            send(app(&store), Method::GET, "/account/profile", &buyer, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["id"], "b1");
        assert!(profile["address"].is_null());

        let (status, profile) = send(
            app(&store),
            Method::PUT,
            "/account/profile",
            &buyer,
            Some(json!({ "name": "Grace", "address": "2 Harbour St" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["name"], "Grace");
        assert!(profile["phone"].is_null());
    }
}
