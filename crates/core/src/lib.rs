//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `server` - Marketplace HTTP service (cart, checkout, fulfillment)
//! - `cli` - Command-line tools for migrations, seeding and inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature so the types can be bound directly in `sqlx` queries.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, identity keys, quantities, prices and the
//!   order/item status machines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
