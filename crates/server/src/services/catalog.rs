//! Sellers and products.

use tracing::{info, instrument};

use bazaar_core::ProductId;

use crate::db::{RepositoryError, Store, UnitOfWork};
use crate::models::{NewProduct, NewSeller, Product, Seller};

use super::{MarketError, TransactionCoordinator};

/// Maximum length of shop names and product titles.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Catalog service.
pub struct CatalogService<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> CatalogService<'a, S> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Register a seller, or update the shop metadata of an existing one.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` if the shop name is blank or too long.
    #[instrument(skip(self, seller), fields(seller = %seller.id))]
    pub async fn register_seller(&self, seller: NewSeller) -> Result<Seller, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::register_seller_in(&mut tx, seller).await;
        coordinator.settle(tx, outcome).await
    }

    /// List a new product for an existing seller.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` for a blank title or negative stock
    /// and `MarketError::NotFound` if the seller is not registered.
    #[instrument(skip(self, product), fields(seller = %product.seller_id))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::create_product_in(&mut tx, product).await;
        let created = coordinator.settle(tx, outcome).await?;

        info!(product = %created.id, stock = created.stock, "Product listed");
        Ok(created)
    }

    /// Look up a product.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::NotFound` if the product does not exist.
    pub async fn product(&self, id: ProductId) -> Result<Product, MarketError> {
        self.store
            .product(id)
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("product {id}")))
    }

    /// Register a seller inside an existing unit of work.
    ///
    /// # Errors
    ///
    /// See [`register_seller`](Self::register_seller).
    pub async fn register_seller_in(
        tx: &mut S::Tx,
        mut seller: NewSeller,
    ) -> Result<Seller, MarketError> {
        seller.shop_name = validate_title("shop name", &seller.shop_name)?;
        seller.description = seller
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(tx.upsert_seller(&seller).await?)
    }

    /// List a product inside an existing unit of work.
    ///
    /// # Errors
    ///
    /// See [`create_product`](Self::create_product).
    pub async fn create_product_in(
        tx: &mut S::Tx,
        mut product: NewProduct,
    ) -> Result<Product, MarketError> {
        product.title = validate_title("title", &product.title)?;
        if product.stock < 0 {
            return Err(MarketError::Validation(format!(
                "stock cannot be negative (got {})",
                product.stock
            )));
        }

        let seller_missing = || MarketError::NotFound(format!("seller {}", product.seller_id));
        if tx.seller(&product.seller_id).await?.is_none() {
            return Err(seller_missing());
        }

        tx.insert_product(&product).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => seller_missing(),
            other => other.into(),
        })
    }
}

fn validate_title(field: &str, value: &str) -> Result<String, MarketError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MarketError::Validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(MarketError::Validation(format!(
            "{field} must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Price, SellerId};

    use super::*;
    use crate::db::MemoryStore;

    fn new_seller(id: &str, shop: &str) -> NewSeller {
        NewSeller {
            id: SellerId::parse(id).unwrap(),
            shop_name: shop.to_owned(),
            description: Some("  ".to_owned()),
        }
    }

    fn new_product(seller: &str, title: &str, stock: i32) -> NewProduct {
        NewProduct {
            seller_id: SellerId::parse(seller).unwrap(),
            title: title.to_owned(),
            price: Price::from_cents(350).unwrap(),
            stock,
        }
    }

    #[tokio::test]
    async fn test_register_seller_upserts() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let first = catalog
            .register_seller(new_seller("s1", " Old Name "))
            .await
            .unwrap();
        assert_eq!(first.shop_name, "Old Name");
        assert!(first.description.is_none());

        let second = catalog
            .register_seller(new_seller("s1", "New Name"))
            .await
            .unwrap();
        assert_eq!(second.shop_name, "New Name");
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_blank_shop_name_rejected() {
        let store = MemoryStore::new();
        let err = CatalogService::new(&store)
            .register_seller(new_seller("s1", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_and_get_product() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog
            .register_seller(new_seller("s1", "Shop"))
            .await
            .unwrap();

        let created = catalog
            .create_product(new_product("s1", "Teapot", 4))
            .await
            .unwrap();
        let fetched = catalog.product(created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.stock, 4);
    }

    #[tokio::test]
    async fn test_product_requires_known_seller() {
        let store = MemoryStore::new();
        let err = CatalogService::new(&store)
            .create_product(new_product("ghost", "Teapot", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_negative_stock_rejected() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        catalog
            .register_seller(new_seller("s1", "Shop"))
            .await
            .unwrap();

        let err = catalog
            .create_product(new_product("s1", "Teapot", -1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = MemoryStore::new();
        let err = CatalogService::new(&store)
            .product(ProductId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
    }

    #[test]
    fn test_validate_title_length() {
        assert!(validate_title("title", &"x".repeat(MAX_TITLE_LENGTH)).is_ok());
        assert!(validate_title("title", &"x".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }
}
