//! Request extractors that reject with `AppError`.
//!
//! axum's own `Json` and `Path` extractors answer malformed input with a
//! plain-text 4xx. These wrappers route the rejection through [`AppError`]
//! so clients always get a 400 with a JSON `{"error": ...}` body.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection},
};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Count {
        count: i64,
    }

    async fn echo(AppPath(id): AppPath<i32>, AppJson(body): AppJson<Count>) -> String {
        format!("{id}:{}", body.count)
    }

    async fn call(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/things/{id}", post(echo));
        let response = app
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_valid_request_passes_through() {
        let (status, _) = call("/things/4", r#"{"count": 2}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_json_is_json_400() {
        let (status, body) = call("/things/4", r#"{"count": 2.5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Bad request:"));

        let (status, body) = call("/things/4", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("count"));
    }

    #[tokio::test]
    async fn test_bad_path_is_json_400() {
        let (status, body) = call("/things/abc", r#"{"count": 2}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
