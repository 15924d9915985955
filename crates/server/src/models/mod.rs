//! Domain models for the marketplace.
//!
//! These types represent validated domain objects, separate from the
//! database row types used inside the `db` module.

pub mod catalog;
pub mod order;

pub use catalog::{BuyerProfile, NewProduct, NewSeller, Product, ProfileUpdate, Seller};
pub use order::{
    Cart, CartChange, CartLine, FulfillmentEntry, ItemRecord, Order, OrderItem, OrderLine,
    OrderReceipt, OrderWithItems,
};
