//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Store;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. It is generic over the store
/// so the same routes run against `PostgreSQL` in production and the
/// in-memory store in tests.
pub struct AppState<S: Store> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Marketplace store (`PgStore` in production)
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }
}
