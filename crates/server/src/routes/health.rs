//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::db::Store;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
pub async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::db::MemoryStore;
    use crate::routes::test_support::{app, send};

    #[tokio::test]
    async fn test_health_endpoints() {
        let store = MemoryStore::new();
        let (status, _) = send(app(&store), Method::GET, "/health", &[], None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app(&store), Method::GET, "/health/ready", &[], None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
