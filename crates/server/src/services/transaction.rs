//! Atomicity boundary for marketplace mutations.

use tracing::warn;

use crate::db::{Store, UnitOfWork};

use super::MarketError;

/// Opens units of work and closes them according to the outcome.
///
/// Services run every mutation as
///
/// ```rust,ignore
/// let mut tx = coordinator.begin().await?;
/// let outcome = Self::do_work(&mut tx, ...).await;
/// coordinator.settle(tx, outcome).await
/// ```
///
/// `settle` commits on success and rolls back on failure, then hands the
/// original error back untouched. Nothing is retried. The unit of work is
/// consumed on every path, so its connection always returns to the pool.
pub struct TransactionCoordinator<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> TransactionCoordinator<'a, S> {
    /// Create a coordinator over `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Acquire a connection and begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Persistence` if no connection could be acquired.
    pub async fn begin(&self) -> Result<S::Tx, MarketError> {
        Ok(self.store.begin().await?)
    }

    /// Commit `tx` if `outcome` succeeded, otherwise roll it back.
    ///
    /// # Errors
    ///
    /// Returns the error carried by `outcome`, or `MarketError::Persistence`
    /// if the commit itself fails.
    pub async fn settle<T: Send>(
        &self,
        tx: S::Tx,
        outcome: Result<T, MarketError>,
    ) -> Result<T, MarketError> {
        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, cause = %err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{BuyerId, Quantity, SellerId};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, NewSeller};

    async fn product(store: &MemoryStore) -> bazaar_core::ProductId {
        let mut tx = store.begin().await.unwrap();
        tx.upsert_seller(&NewSeller {
            id: SellerId::parse("s1").unwrap(),
            shop_name: "Shop".to_owned(),
            description: None,
        })
        .await
        .unwrap();
        let product = tx
            .insert_product(&NewProduct {
                seller_id: SellerId::parse("s1").unwrap(),
                title: "Lamp".to_owned(),
                price: bazaar_core::Price::from_cents(500).unwrap(),
                stock: 4,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn test_settle_commits_success() {
        let store = MemoryStore::new();
        let id = product(&store).await;
        let coordinator = TransactionCoordinator::new(&store);

        let mut tx = coordinator.begin().await.unwrap();
        let outcome = tx
            .try_debit_stock(id, Quantity::new(3).unwrap())
            .await
            .map_err(MarketError::from);
        coordinator.settle(tx, outcome).await.unwrap();

        assert_eq!(store.product(id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_settle_rolls_back_and_returns_original_error() {
        let store = MemoryStore::new();
        let id = product(&store).await;
        let coordinator = TransactionCoordinator::new(&store);

        let mut tx = coordinator.begin().await.unwrap();
        tx.try_debit_stock(id, Quantity::new(3).unwrap())
            .await
            .unwrap();
        tx.ensure_buyer(&BuyerId::parse("b1").unwrap())
            .await
            .unwrap();
        let outcome: Result<(), MarketError> = Err(MarketError::Validation("boom".to_owned()));
        let err = coordinator.settle(tx, outcome).await.unwrap_err();

        assert!(matches!(err, MarketError::Validation(msg) if msg == "boom"));
        assert_eq!(store.product(id).await.unwrap().unwrap().stock, 4);
    }
}
