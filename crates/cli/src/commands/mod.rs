//! Command implementations.

pub mod cart;
pub mod health;
pub mod orders;
pub mod products;

use std::io::{self, Write};

use thiserror::Error;
use vitrine_client::{ApiClient, ApiError, ClientConfig, ConfigError, JsonFileStorage};
use vitrine_core::{CartStore, OrderId, OrderStatus};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid order ID: {0}")]
    InvalidOrderId(String),

    #[error("Invalid customer ID: {0}")]
    InvalidCustomerId(String),

    #[error("No product with SKU {0}")]
    UnknownSku(String),

    #[error("Product {0} is out of stock")]
    OutOfStock(String),

    #[error("SKU {0} is not in the cart")]
    NotInCart(String),

    #[error("Order {reference} cannot be {action} while {status}")]
    ActionNotAllowed {
        reference: String,
        action: &'static str,
        status: OrderStatus,
    },
}

impl CliError {
    /// Message for the shopper, when there is a friendlier one than the log line.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Api(e) => Some(e.user_message()),
            _ => None,
        }
    }

    /// Write the shopper-facing message, if any, to `out` (stderr in `main`).
    pub fn report(&self, out: &mut impl Write) -> io::Result<()> {
        match self.user_message() {
            Some(message) => writeln!(out, "{message}"),
            None => Ok(()),
        }
    }
}

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: ClientConfig,
    pub client: ApiClient,
}

impl Context {
    pub fn new(config: ClientConfig) -> Result<Self, CliError> {
        let client = ApiClient::new(&config)?;
        Ok(Self { config, client })
    }

    /// The persisted cart.
    pub fn cart(&self) -> CartStore<JsonFileStorage> {
        CartStore::new(JsonFileStorage::new(&self.config.data_dir))
    }
}

/// Order status filter where `ALL` means no filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter(pub Option<OrderStatus>);

pub fn parse_status_filter(s: &str) -> Result<StatusFilter, String> {
    if s.trim().eq_ignore_ascii_case("ALL") {
        return Ok(StatusFilter(None));
    }
    s.trim().parse().map(|status| StatusFilter(Some(status)))
}

pub fn parse_order_id(s: &str) -> Result<OrderId, CliError> {
    s.parse().map_err(|_| CliError::InvalidOrderId(s.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(parse_status_filter("ALL").unwrap(), StatusFilter(None));
        assert_eq!(parse_status_filter("all").unwrap(), StatusFilter(None));
        assert_eq!(
            parse_status_filter("PAY_PENDING").unwrap(),
            StatusFilter(Some(OrderStatus::PayPending))
        );
        assert!(parse_status_filter("REFUNDED").is_err());
    }

    #[test]
    fn test_report_writes_only_user_messages() {
        let mut out = Vec::new();
        CliError::from(ApiError::Timeout).report(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Timeout na requisição\n");

        let mut out = Vec::new();
        CliError::UnknownSku("XYZ".into()).report(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_order_id() {
        assert!(parse_order_id("1a2b3c4d-0000-4000-8000-000000000001").is_ok());
        assert!(matches!(
            parse_order_id("42"),
            Err(CliError::InvalidOrderId(_))
        ));
    }
}
