//! Bounded retry for backend reads.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::ApiError;

/// How many times a failed request is repeated before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Pause between attempts; zero retries immediately.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}

impl RetryPolicy {
    /// Retry up to `max_retries` times without waiting.
    #[must_use]
    pub const fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay: Duration::ZERO,
        }
    }

    /// Whether another attempt should follow failure number `attempt` (1-based).
    #[must_use]
    pub const fn should_retry(&self, err: &ApiError, attempt: u32) -> bool {
        attempt <= self.max_retries && err.is_retryable()
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, attempt) => {
                    debug!(what, attempt, error = %err, "Retrying request");
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
