//! Vitrine Client - Talks to the storefront backend.
//!
//! This crate provides everything that needs the network or the filesystem:
//!
//! - [`api`] - REST client with retries and response caching
//! - [`sync`] - Polling loops that keep orders and backend health current
//! - [`checkout`] - Turning the cart into an order
//! - [`storage`] - File-backed cart persistence
//! - [`config`] - Environment-based configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod checkout;
pub mod config;
pub mod storage;
pub mod sync;

pub use api::{ApiClient, ApiError, HealthStatus, OrderListQuery, ProductQuery};
pub use checkout::checkout;
pub use config::{ClientConfig, ConfigError, PollingConfig};
pub use storage::JsonFileStorage;
pub use sync::{ConnectionState, HealthMonitor, OrderSync, Subscription, SyncEvent};
