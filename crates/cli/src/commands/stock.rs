//! Inspect a product's remaining stock.

use tracing::info;

use bazaar_core::ProductId;
use bazaar_server::db::PgStore;
use bazaar_server::services::CatalogService;

use super::{CommandError, connect};

/// Print a product and the units still available to carts.
///
/// # Errors
///
/// Returns `MarketError::NotFound` if the product does not exist.
pub async fn show(product_id: ProductId) -> Result<(), CommandError> {
    let store = PgStore::new(connect().await?);
    let product = CatalogService::new(&store)
        .product(product_id)
        .await?;

    info!("Product {}: {}", product.id, product.title);
    info!("  Seller: {}", product.seller_id);
    info!("  Price: {}", product.price);
    info!("  Available stock: {}", product.stock);

    if product.stock == 0 {
        info!("  Sold out (all units reserved or sold)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use bazaar_server::services::MarketError;

    use super::*;

    #[test]
    fn test_missing_product_message() {
        let err = CommandError::from(MarketError::NotFound("product 7".to_string()));
        assert_eq!(err.to_string(), "product 7 not found");
    }
}
