//! Backend connectivity monitor.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::poll::{CancelToken, cancelled};
use crate::api::{ApiClient, ApiError, HealthStatus};

/// Whether the backend answered its last health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No check has completed yet.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl ConnectionState {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "Verificando...",
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where health reports come from.
pub trait HealthSource: Send + Sync + 'static {
    fn check_health(&self) -> impl Future<Output = Result<HealthStatus, ApiError>> + Send;
}

impl HealthSource for ApiClient {
    async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        self.health().await
    }
}

/// Periodically checks backend health and publishes the result.
///
/// Dropping the monitor stops the checks.
#[derive(Debug)]
pub struct HealthMonitor {
    state: watch::Receiver<ConnectionState>,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start checking immediately and then every `interval`.
    pub fn spawn<S: HealthSource>(source: S, interval: Duration) -> Self {
        let source = Arc::new(source);
        let (state_tx, state) = watch::channel(ConnectionState::Unknown);
        let (cancel, mut cancel_rx) = CancelToken::new();

        let task = tokio::spawn(async move {
            loop {
                let result = tokio::select! {
                    biased;
                    () = cancelled(&mut cancel_rx) => break,
                    result = source.check_health() => result,
                };

                let next = match result {
                    Ok(health) if health.is_up() => ConnectionState::Online,
                    Ok(health) => {
                        warn!(status = %health.status, "Backend reports unhealthy");
                        ConnectionState::Offline
                    }
                    Err(e) => {
                        warn!(error = %e, "Health check failed");
                        ConnectionState::Offline
                    }
                };

                let previous = state_tx.send_replace(next);
                if previous == next {
                    debug!(state = %next, "Health unchanged");
                } else {
                    info!(from = %previous, to = %next, "Backend connectivity changed");
                }

                tokio::select! {
                    biased;
                    () = cancelled(&mut cancel_rx) => break,
                    () = tokio::time::sleep(interval) => {}
                }
            }
        });

        Self {
            state,
            cancel,
            task,
        }
    }

    /// The most recent state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the state differs from the last one seen through this call.
    ///
    /// # Errors
    ///
    /// Returns an error once the monitor task has stopped.
    pub async fn changed(&mut self) -> Result<ConnectionState, watch::error::RecvError> {
        self.state.changed().await?;
        Ok(*self.state.borrow_and_update())
    }

    /// A receiver that follows the state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stop checking.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
