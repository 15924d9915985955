//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` and `caller` fields)
//! 3. Request ID (add unique ID to each request)
//!
//! Caller identity is not middleware: handlers take [`RequireBuyer`] or
//! [`RequireSeller`] extractors.

pub mod identity;
pub mod request_id;

pub use identity::{BUYER_ID_HEADER, RequireBuyer, RequireSeller, SELLER_ID_HEADER};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
