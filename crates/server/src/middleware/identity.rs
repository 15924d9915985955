//! Caller identity extractors.
//!
//! Buyer and seller identities are established by an upstream authentication
//! proxy and forwarded as plain headers. They are trusted as-is; the
//! extractors only check that a usable key is present.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::Span;

use bazaar_core::{BuyerId, SellerId};

use crate::error::AppError;

/// The HTTP header carrying the buyer identity.
pub const BUYER_ID_HEADER: &str = "x-buyer-id";

/// The HTTP header carrying the seller identity.
pub const SELLER_ID_HEADER: &str = "x-seller-id";

/// Extractor that requires a buyer identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireBuyer(buyer): RequireBuyer) -> impl IntoResponse {
///     format!("Hello, {buyer}!")
/// }
/// ```
pub struct RequireBuyer(pub BuyerId);

/// Extractor that requires a seller identity.
pub struct RequireSeller(pub SellerId);

fn header<'p>(parts: &'p Parts, name: &str) -> Result<&'p str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{name} header is not valid text")))
}

/// Tag the Sentry scope and current span with the caller.
fn set_caller(role: &str, id: &str) {
    Span::current().record("caller", id);
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(id.to_string()),
            ..Default::default()
        }));
        scope.set_tag("caller_role", role);
    });
}

impl<S> FromRequestParts<S> for RequireBuyer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = header(parts, BUYER_ID_HEADER)?;
        let buyer = BuyerId::parse(raw)
            .map_err(|e| AppError::Unauthorized(format!("invalid {BUYER_ID_HEADER}: {e}")))?;
        set_caller("buyer", buyer.as_str());
        Ok(Self(buyer))
    }
}

impl<S> FromRequestParts<S> for RequireSeller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = header(parts, SELLER_ID_HEADER)?;
        let seller = SellerId::parse(raw)
            .map_err(|e| AppError::Unauthorized(format!("invalid {SELLER_ID_HEADER}: {e}")))?;
        set_caller("seller", seller.as_str());
        Ok(Self(seller))
    }
}
