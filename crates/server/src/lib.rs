//! Bazaar marketplace server library.
//!
//! Inventory reservation, carts, checkout and fulfillment for a
//! multi-seller marketplace. The binary in `main.rs` wires this library to
//! `PostgreSQL`; tests drive the same services over the in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
