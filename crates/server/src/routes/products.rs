//! Product detail handler.

use axum::{Json, extract::State};

use bazaar_core::ProductId;

use crate::db::Store;
use crate::error::Result;
use crate::extract::AppPath;
use crate::models::Product;
use crate::services::CatalogService;
use crate::state::AppState;

/// Show a product with its current stock.
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    AppPath(id): AppPath<ProductId>,
) -> Result<Json<Product>> {
    let product = CatalogService::new(state.store()).product(id).await?;
    Ok(Json(product))
}
