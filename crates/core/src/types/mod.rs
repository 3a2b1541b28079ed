//! Core types for Vitrine.
//!
//! This module provides type-safe wrappers for the storefront's domain
//! concepts and the backend's wire shapes.

pub mod id;
pub mod order;
pub mod page;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use order::{CreateOrderRequest, Order, OrderItem, ValidationError, format_date};
pub use page::Page;
pub use price::{Cents, format_price};
pub use product::{Product, ProductDto};
pub use status::OrderStatus;
