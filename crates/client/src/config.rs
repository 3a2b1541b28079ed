//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `VITRINE_API_BASE_URL` - Backend base URL (default: `http://localhost:8080`)
//! - `VITRINE_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `VITRINE_MAX_RETRIES` - Retries per read request (default: 3)
//! - `VITRINE_ORDER_POLL_SECS` - Order detail polling interval (default: 3)
//! - `VITRINE_ORDER_LIST_POLL_SECS` - Customer order list polling interval (default: 10)
//! - `VITRINE_HEALTH_POLL_SECS` - Backend health polling interval (default: 30)
//! - `VITRINE_PRODUCT_STALE_SECS` - How long a product listing stays fresh (default: 30)
//! - `VITRINE_DATA_DIR` - Directory for the persisted cart (default: `.vitrine`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_DATA_DIR: &str = ".vitrine";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL
    pub api_base_url: Url,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Immediate retries for a failed read (not-found is never retried)
    pub max_retries: u32,
    /// How long a cached product listing is served without refetching
    pub product_stale_time: Duration,
    /// Polling intervals
    pub polling: PollingConfig,
    /// Directory holding the persisted cart
    pub data_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Intervals for the background polling loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    /// A single order being watched
    pub order: Duration,
    /// A customer's order list
    pub order_list: Duration,
    /// Backend health
    pub health: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            order: Duration::from_secs(3),
            order_list: Duration::from_secs(10),
            health: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            http_timeout: Duration::from_secs(10),
            max_retries: 3,
            product_stale_time: Duration::from_secs(30),
            polling: PollingConfig::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is present but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("VITRINE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("VITRINE_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "VITRINE_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", api_base_url.scheme()),
            ));
        }

        let mut config = Self::new(api_base_url);
        config.http_timeout = secs_or(&lookup, "VITRINE_HTTP_TIMEOUT_SECS", config.http_timeout)?;
        config.max_retries = parse_or(&lookup, "VITRINE_MAX_RETRIES", config.max_retries)?;
        config.product_stale_time = secs_or(
            &lookup,
            "VITRINE_PRODUCT_STALE_SECS",
            config.product_stale_time,
        )?;
        config.polling = PollingConfig {
            order: secs_or(&lookup, "VITRINE_ORDER_POLL_SECS", config.polling.order)?,
            order_list: secs_or(
                &lookup,
                "VITRINE_ORDER_LIST_POLL_SECS",
                config.polling.order_list,
            )?,
            health: secs_or(&lookup, "VITRINE_HEALTH_POLL_SECS", config.polling.health)?,
        };
        if let Some(dir) = lookup("VITRINE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty());

        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable if present, otherwise fall back to `default`.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a whole number of seconds; zero is rejected.
fn secs_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = parse_or(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1 second".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}
