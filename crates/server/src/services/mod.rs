//! Business logic services for the marketplace.
//!
//! # Services
//!
//! - `cart` - Buyer cart mutations on top of the inventory ledger
//! - `lifecycle` - Payment, shipping and receipt transitions
//! - `catalog` - Seller registration and product listing
//! - `account` - Buyer shipping profiles
//!
//! Each service borrows a [`Store`](crate::db::Store). Mutations run inside a
//! single unit of work opened and settled by [`TransactionCoordinator`]; stock
//! changes go through [`InventoryLedger`].

pub mod account;
pub mod cart;
pub mod catalog;
mod error;
pub mod ledger;
pub mod lifecycle;
pub mod transaction;

pub use account::AccountService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use error::MarketError;
pub use ledger::InventoryLedger;
pub use lifecycle::OrderLifecycle;
pub use transaction::TransactionCoordinator;
