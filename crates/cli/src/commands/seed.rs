//! Seed the catalog with sellers and products from a YAML file.
//!
//! # File format
//!
//! ```yaml
//! sellers:
//!   - id: loom-and-thread
//!     shopName: Loom & Thread
//!     description: Hand-woven bags
//!     products:
//!       - title: Canvas tote
//!         price: "24.00"
//!         stock: 40
//! ```
//!
//! Sellers are upserted, products are always inserted. The whole file is
//! applied in one transaction: any invalid entry leaves the database untouched.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use bazaar_core::Price;
use bazaar_server::db::{PgStore, Store};
use bazaar_server::models::{NewProduct, NewSeller};
use bazaar_server::services::{CatalogService, MarketError, TransactionCoordinator};

use super::{CommandError, connect};

/// A catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub sellers: Vec<SellerEntry>,
}

/// One seller and the products they list.
#[derive(Debug, Deserialize)]
pub struct SellerEntry {
    #[serde(flatten)]
    pub seller: NewSeller,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

/// One product listing.
#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub title: String,
    pub price: Price,
    pub stock: i32,
}

/// What a seed run created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sellers: usize,
    pub products: usize,
}

/// Load the catalog at `path` into the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if any entry
/// is rejected.
pub async fn catalog(path: &Path) -> Result<(), CommandError> {
    info!(path = %path.display(), "Loading catalog from file");

    // Parse before connecting so a bad file never touches the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(sellers = catalog.sellers.len(), "Parsed catalog");

    let store = PgStore::new(connect().await?);
    let summary = apply(&store, catalog).await?;

    info!("Seeding complete!");
    info!("  Sellers registered: {}", summary.sellers);
    info!("  Products created: {}", summary.products);
    Ok(())
}

/// Apply a parsed catalog in a single transaction.
async fn apply<S: Store>(store: &S, catalog: CatalogFile) -> Result<SeedSummary, MarketError> {
    let coordinator = TransactionCoordinator::new(store);
    let mut tx = coordinator.begin().await?;
    let outcome = apply_in::<S>(&mut tx, catalog).await;
    coordinator.settle(tx, outcome).await
}

async fn apply_in<S: Store>(
    tx: &mut S::Tx,
    catalog: CatalogFile,
) -> Result<SeedSummary, MarketError> {
    let mut summary = SeedSummary::default();

    for entry in catalog.sellers {
        let seller = CatalogService::<S>::register_seller_in(tx, entry.seller).await?;
        summary.sellers += 1;

        for product in entry.products {
            let created = CatalogService::<S>::create_product_in(
                tx,
                NewProduct {
                    seller_id: seller.id.clone(),
                    title: product.title,
                    price: product.price,
                    stock: product.stock,
                },
            )
            .await?;
            info!(
                product_id = %created.id,
                seller_id = %seller.id,
                title = %created.title,
                "Created product"
            );
            summary.products += 1;
        }
    }

    Ok(summary)
}
