//! Buyer shipping profiles.
//!
//! Buyers are never registered explicitly; the profile row is created the
//! first time a buyer identity is seen.

use tracing::instrument;

use bazaar_core::BuyerId;

use crate::db::{Store, UnitOfWork};
use crate::models::{BuyerProfile, ProfileUpdate};

use super::{MarketError, TransactionCoordinator};

/// Maximum length of any profile field.
pub const MAX_PROFILE_FIELD_LENGTH: usize = 500;

/// Account service.
pub struct AccountService<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> AccountService<'a, S> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The buyer's profile, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Persistence` on store failure.
    #[instrument(skip(self), fields(buyer = %buyer))]
    pub async fn profile(&self, buyer: &BuyerId) -> Result<BuyerProfile, MarketError> {
        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = tx.ensure_buyer(buyer).await.map_err(MarketError::from);
        coordinator.settle(tx, outcome).await
    }

    /// Replace the buyer's shipping profile.
    ///
    /// Fields are trimmed; blank fields are cleared.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Validation` if a field is too long.
    #[instrument(skip(self, update), fields(buyer = %buyer))]
    pub async fn update_profile(
        &self,
        buyer: &BuyerId,
        update: ProfileUpdate,
    ) -> Result<BuyerProfile, MarketError> {
        let update = ProfileUpdate {
            name: normalize("name", update.name)?,
            address: normalize("address", update.address)?,
            phone: normalize("phone", update.phone)?,
        };

        let coordinator = TransactionCoordinator::new(self.store);
        let mut tx = coordinator.begin().await?;
        let outcome = Self::update_profile_in(&mut tx, buyer, &update).await;
        coordinator.settle(tx, outcome).await
    }

    async fn update_profile_in(
        tx: &mut S::Tx,
        buyer: &BuyerId,
        update: &ProfileUpdate,
    ) -> Result<BuyerProfile, MarketError> {
        tx.ensure_buyer(buyer).await?;
        Ok(tx.save_profile(buyer, update).await?)
    }
}

fn normalize(field: &str, value: Option<String>) -> Result<Option<String>, MarketError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_PROFILE_FIELD_LENGTH {
        return Err(MarketError::Validation(format!(
            "{field} must be at most {MAX_PROFILE_FIELD_LENGTH} characters"
        )));
    }
    Ok(Some(trimmed.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_profile_created_lazily() {
        let store = MemoryStore::new();
        let accounts = AccountService::new(&store);
        let buyer = BuyerId::parse("b1").unwrap();

        let first = accounts.profile(&buyer).await.unwrap();
        assert!(first.name.is_none());
        let second = accounts.profile(&buyer).await.unwrap();
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let store = MemoryStore::new();
        let accounts = AccountService::new(&store);
        let buyer = BuyerId::parse("b1").unwrap();

        let updated = accounts
            .update_profile(
                &buyer,
                ProfileUpdate {
                    name: Some(" Ada ".to_owned()),
                    address: Some("1 Loop Road".to_owned()),
                    phone: Some("   ".to_owned()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert_eq!(updated.address.as_deref(), Some("1 Loop Road"));
        assert!(updated.phone.is_none());
        assert_eq!(accounts.profile(&buyer).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_overlong_field_rejected() {
        let store = MemoryStore::new();
        let err = AccountService::new(&store)
            .update_profile(
                &BuyerId::parse("b1").unwrap(),
                ProfileUpdate {
                    name: Some("x".repeat(MAX_PROFILE_FIELD_LENGTH + 1)),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }
}
