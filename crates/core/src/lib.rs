//! Vitrine Core - Shared types and cart state.
//!
//! This crate provides the pieces of the storefront client that need no
//! network access:
//! - `vitrine-client` - HTTP API client, order sync and checkout
//! - `vitrine-cli` - Command-line storefront
//!
//! # Architecture
//!
//! The core crate contains types, the cart state container and its
//! persistence port - no HTTP clients, no files. Storage backends live in
//! `vitrine-client` and plug in through [`cart::CartStorage`].
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, order status, products, orders, pages
//! - [`cart`] - The cart store and its persistence port

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{CartLine, CartStorage, CartStore, MemoryCartStorage, StorageError};
pub use types::*;
