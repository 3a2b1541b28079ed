//! Cancellable repeating fetch task.
//!
//! Each tick runs the fetch to completion (retries included) before the
//! next sleep starts, so a subscription never has two requests in flight.
//! The cancellation flag is checked after every fetch, and every
//! subscription owns its own channel: once cancelled or dropped, nothing
//! further is delivered to its consumer.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::StatusChange;
use crate::api::ApiError;

const EVENT_BUFFER: usize = 16;

/// Something the polling loop observed.
#[derive(Debug)]
pub enum SyncEvent<T> {
    /// A fresh snapshot arrived.
    Updated(T),
    /// An order's status differs from its previous observation.
    StatusChanged(StatusChange),
    /// A tick failed after exhausting its retries. `stale` is true when an
    /// earlier snapshot exists and should keep being shown.
    FetchFailed { error: ApiError, stale: bool },
}

/// Cancellation flag shared between a handle and its task.
#[derive(Debug)]
pub(crate) struct CancelToken {
    tx: watch::Sender<bool>,
}

impl CancelToken {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once the token is cancelled or its handle is gone.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|cancelled| *cancelled).await;
}

/// Handle to a running polling loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct Subscription<T> {
    events: mpsc::Receiver<SyncEvent<T>>,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    /// Wait for the next event. Returns `None` once the loop has stopped.
    pub async fn recv(&mut self) -> Option<SyncEvent<T>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.events.recv().await
    }

    /// Stop polling. Pending and late results are discarded.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.events.close();
        self.task.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Spawn a loop that calls `fetch` immediately and then every `interval`.
///
/// `detect` turns each successful result into status changes; it is only
/// called while the subscription is live.
pub(crate) fn spawn_polling<T, F, Fut, D>(
    what: String,
    interval: Duration,
    mut fetch: F,
    mut detect: D,
) -> Subscription<T>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send,
    D: FnMut(&T) -> Vec<StatusChange> + Send + 'static,
{
    let (cancel, mut cancel_rx) = CancelToken::new();
    let (tx, events) = mpsc::channel(EVENT_BUFFER);

    let task = tokio::spawn(async move {
        debug!(what = %what, ?interval, "Polling started");
        let mut has_snapshot = false;

        loop {
            let result = tokio::select! {
                biased;
                () = cancelled(&mut cancel_rx) => break,
                result = fetch() => result,
            };

            // A response that lands after cancellation is never applied.
            if *cancel_rx.borrow() {
                break;
            }

            let batch = match result {
                Ok(snapshot) => {
                    has_snapshot = true;
                    let changes = detect(&snapshot);
                    std::iter::once(SyncEvent::Updated(snapshot))
                        .chain(changes.into_iter().map(SyncEvent::StatusChanged))
                        .collect::<Vec<_>>()
                }
                Err(error) => {
                    warn!(what = %what, error = %error, stale = has_snapshot, "Poll failed");
                    vec![SyncEvent::FetchFailed {
                        error,
                        stale: has_snapshot,
                    }]
                }
            };

            for event in batch {
                if tx.send(event).await.is_err() {
                    debug!(what = %what, "Subscriber gone, polling stopped");
                    return;
                }
            }

            tokio::select! {
                biased;
                () = cancelled(&mut cancel_rx) => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        debug!(what = %what, "Polling cancelled");
    });

    Subscription {
        events,
        cancel,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_on_interval() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let start = tokio::time::Instant::now();

        let mut sub = spawn_polling(
            "test".to_string(),
            Duration::from_secs(3),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ApiError>(n) }
            },
            |_| Vec::new(),
        );

        for expected in 0..3 {
            match sub.recv().await {
                Some(SyncEvent::Updated(n)) => assert_eq!(n, expected),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_loop() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut sub = spawn_polling(
            "test".to_string(),
            Duration::from_secs(3),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 1 {
                        Err(ApiError::Timeout)
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| Vec::new(),
        );

        assert!(matches!(sub.recv().await, Some(SyncEvent::Updated(0))));
        assert!(matches!(
            sub.recv().await,
            Some(SyncEvent::FetchFailed {
                error: ApiError::Timeout,
                stale: true
            })
        ));
        assert!(matches!(sub.recv().await, Some(SyncEvent::Updated(2))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_is_not_stale() {
        let mut sub = spawn_polling(
            "test".to_string(),
            Duration::from_secs(3),
            || async { Err::<u32, _>(ApiError::NotFound("/orders/x".into())) },
            |_| Vec::new(),
        );

        assert!(matches!(
            sub.recv().await,
            Some(SyncEvent::FetchFailed { stale: false, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_delivery() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut sub = spawn_polling(
            "test".to_string(),
            Duration::from_secs(3),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ApiError>(n) }
            },
            |_| Vec::new(),
        );

        assert!(matches!(sub.recv().await, Some(SyncEvent::Updated(0))));
        sub.cancel();
        assert!(sub.is_cancelled());
        assert!(sub.recv().await.is_none());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_cancel_is_discarded() {
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let mut release_rx = Some(release_rx);

        let mut sub = spawn_polling(
            "test".to_string(),
            Duration::from_secs(3),
            move || {
                let gate = release_rx.take();
                async move {
                    if let Some(gate) = gate {
                        let _ = gate.await;
                    }
                    Ok::<_, ApiError>(7)
                }
            },
            |_| Vec::new(),
        );

        // Let the first fetch start and block on the gate.
        tokio::task::yield_now().await;
        sub.cancel();
        let _ = release_tx.send(());

        assert!(sub.recv().await.is_none());
    }
}
