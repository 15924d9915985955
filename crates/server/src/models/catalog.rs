//! Catalog and account domain types: sellers, products and buyer profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{BuyerId, Price, ProductId, SellerId};

/// A seller and their shop metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    /// Seller identity key.
    pub id: SellerId,
    /// Public shop name.
    pub shop_name: String,
    /// Optional shop description.
    pub description: Option<String>,
    /// When the seller was registered.
    pub created_at: DateTime<Utc>,
}

/// Input for registering (or re-registering) a seller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeller {
    /// Seller identity key.
    pub id: SellerId,
    /// Public shop name.
    pub shop_name: String,
    /// Optional shop description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A sellable product.
///
/// `stock` is the number of units still available to carts. It is only ever
/// changed through the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Owning seller.
    pub seller_id: SellerId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Units available for reservation.
    pub stock: i32,
}

/// Input for listing a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    /// Owning seller (must already be registered).
    pub seller_id: SellerId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Initial stock.
    pub stock: i32,
}

/// A buyer and their shipping profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerProfile {
    /// Buyer identity key.
    pub id: BuyerId,
    /// Recipient name.
    pub name: Option<String>,
    /// Shipping address.
    pub address: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// First time this buyer interacted with the marketplace.
    pub created_at: DateTime<Utc>,
    /// Last profile change.
    pub updated_at: DateTime<Utc>,
}

/// Replacement shipping profile for a buyer.
///
/// Every field is replaced; `None` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Recipient name.
    #[serde(default)]
    pub name: Option<String>,
    /// Shipping address.
    #[serde(default)]
    pub address: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
}
