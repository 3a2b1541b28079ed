//! Order status synchronization by polling.
//!
//! The backend has no push channel, so an order's state is kept current by
//! refetching it on a fixed interval. Each result is compared with the
//! last-known status and a [`SyncEvent::StatusChanged`] is emitted exactly
//! once per observed transition.
//!
//! # Example
//!
//! ```rust,ignore
//! let sync = OrderSync::new(client.clone(), config.polling);
//! let mut sub = sync.watch_order(order_id);
//!
//! while let Some(event) = sub.recv().await {
//!     if let SyncEvent::StatusChanged(change) = event {
//!         println!("{change}");
//!     }
//! }
//! ```

mod health;
mod poll;
mod tracker;

pub use health::{ConnectionState, HealthMonitor, HealthSource};
pub use poll::{Subscription, SyncEvent};
pub use tracker::{StatusChange, StatusTracker};

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use vitrine_core::{CustomerId, Order, OrderId, OrderStatus, Page};

use crate::api::{ApiClient, ApiError, OrderListQuery};
use crate::config::PollingConfig;

/// Where order snapshots come from.
pub trait OrderSource: Send + Sync + 'static {
    /// Fetch one order.
    fn fetch_order(&self, id: OrderId) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// Fetch one page of a customer's orders.
    fn fetch_customer_orders(
        &self,
        customer_id: CustomerId,
        query: &OrderListQuery,
    ) -> impl Future<Output = Result<Page<Order>, ApiError>> + Send;
}

impl OrderSource for ApiClient {
    async fn fetch_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.get_order(id).await
    }

    async fn fetch_customer_orders(
        &self,
        customer_id: CustomerId,
        query: &OrderListQuery,
    ) -> Result<Page<Order>, ApiError> {
        self.orders_by_customer(customer_id, query).await
    }
}

/// Starts polling subscriptions that share one status history.
///
/// Sharing the history means a transition is reported once even when the
/// same order is watched through its detail and a customer listing, and a
/// re-opened watch still reports a change that happened while closed.
pub struct OrderSync<S> {
    source: Arc<S>,
    polling: PollingConfig,
    tracker: Arc<Mutex<StatusTracker>>,
}

impl<S: OrderSource> OrderSync<S> {
    pub fn new(source: S, polling: PollingConfig) -> Self {
        Self {
            source: Arc::new(source),
            polling,
            tracker: Arc::new(Mutex::new(StatusTracker::new())),
        }
    }

    /// Poll a single order every `polling.order`.
    #[must_use]
    pub fn watch_order(&self, id: OrderId) -> Subscription<Order> {
        let source = Arc::clone(&self.source);
        let tracker = Arc::clone(&self.tracker);

        poll::spawn_polling(
            format!("order {id}"),
            self.polling.order,
            move || {
                let source = Arc::clone(&source);
                async move { source.fetch_order(id).await }
            },
            move |order: &Order| {
                tracker
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .observe(order)
                    .into_iter()
                    .collect()
            },
        )
    }

    /// Poll one page of a customer's orders every `polling.order_list`.
    #[must_use]
    pub fn watch_customer_orders(
        &self,
        customer_id: CustomerId,
        query: OrderListQuery,
    ) -> Subscription<Page<Order>> {
        let source = Arc::clone(&self.source);
        let tracker = Arc::clone(&self.tracker);

        poll::spawn_polling(
            format!("orders of customer {customer_id}"),
            self.polling.order_list,
            move || {
                let source = Arc::clone(&source);
                let query = query.clone();
                async move { source.fetch_customer_orders(customer_id, &query).await }
            },
            move |page: &Page<Order>| {
                tracker
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .observe_all(&page.content)
            },
        )
    }

    /// Last status seen for an order by any subscription.
    #[must_use]
    pub fn last_status(&self, id: &OrderId) -> Option<OrderStatus> {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_status(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;
    use vitrine_core::Cents;

    /// Replays scripted results, then repeats the last one.
    struct ScriptedSource {
        customer_id: CustomerId,
        script: Mutex<VecDeque<Result<Order, ApiError>>>,
        last: Mutex<Option<Order>>,
    }

    impl ScriptedSource {
        fn new(customer_id: CustomerId, script: Vec<Result<Order, ApiError>>) -> Self {
            Self {
                customer_id,
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
            }
        }

        fn next(&self) -> Result<Order, ApiError> {
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(order)) => {
                    *self.last.lock().unwrap() = Some(order.clone());
                    Ok(order)
                }
                Some(Err(e)) => Err(e),
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| ApiError::NotFound("script exhausted".into())),
            }
        }
    }

    impl OrderSource for ScriptedSource {
        async fn fetch_order(&self, _id: OrderId) -> Result<Order, ApiError> {
            self.next()
        }

        async fn fetch_customer_orders(
            &self,
            customer_id: CustomerId,
            _query: &OrderListQuery,
        ) -> Result<Page<Order>, ApiError> {
            assert_eq!(customer_id, self.customer_id);
            let order = self.next()?;
            Ok(Page {
                content: vec![order],
                total_elements: 1,
                total_pages: 1,
                number: 0,
                size: 10,
            })
        }
    }

    fn order(id: OrderId, customer_id: CustomerId, status: OrderStatus) -> Order {
        Order {
            id,
            customer_id,
            status,
            total_cents: Cents::new(3998),
            created_at: "2024-01-15T14:30:00Z".parse().unwrap(),
            items: vec![],
        }
    }

    fn polling() -> PollingConfig {
        PollingConfig {
            order: Duration::from_secs(3),
            order_list: Duration::from_secs(10),
            health: Duration::from_secs(30),
        }
    }

    /// Collect events until `n` snapshots have been seen.
    async fn collect<T>(sub: &mut Subscription<T>, snapshots: usize) -> Vec<SyncEvent<T>> {
        let mut events = Vec::new();
        let mut seen = 0;
        while seen < snapshots {
            let event = sub.recv().await.unwrap();
            if matches!(event, SyncEvent::Updated(_) | SyncEvent::FetchFailed { .. }) {
                seen += 1;
            }
            events.push(event);
        }
        events
    }

    fn changes<T>(events: &[SyncEvent<T>]) -> Vec<(OrderStatus, OrderStatus)> {
        events
            .iter()
            .filter_map(|e| match e {
                SyncEvent::StatusChanged(c) => Some((c.from, c.to)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_polls_two_notifications() {
        use OrderStatus::{New, Paid, Shipped};

        let id = OrderId::generate();
        let customer = CustomerId::generate();
        let script = [New, New, Paid, Paid, Shipped]
            .into_iter()
            .map(|s| Ok(order(id, customer, s)))
            .collect();
        let sync = OrderSync::new(ScriptedSource::new(customer, script), polling());

        let mut sub = sync.watch_order(id);
        let events = collect(&mut sub, 5).await;

        assert_eq!(changes(&events), vec![(New, Paid), (Paid, Shipped)]);
        assert_eq!(sync.last_status(&id), Some(Shipped));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_poll_keeps_history() {
        use OrderStatus::{New, Paid};

        let id = OrderId::generate();
        let customer = CustomerId::generate();
        let script = vec![
            Ok(order(id, customer, New)),
            Err(ApiError::Timeout),
            Ok(order(id, customer, Paid)),
        ];
        let sync = OrderSync::new(ScriptedSource::new(customer, script), polling());

        let mut sub = sync.watch_order(id);
        let events = collect(&mut sub, 3).await;

        assert!(events.iter().any(|e| matches!(
            e,
            SyncEvent::FetchFailed { stale: true, .. }
        )));
        assert_eq!(changes(&events), vec![(New, Paid)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopened_watch_reports_change_made_while_closed() {
        use OrderStatus::{PayPending, Paid};

        let id = OrderId::generate();
        let customer = CustomerId::generate();
        let script = vec![Ok(order(id, customer, PayPending)), Ok(order(id, customer, Paid))];
        let sync = OrderSync::new(ScriptedSource::new(customer, script), polling());

        let mut first = sync.watch_order(id);
        let events = collect(&mut first, 1).await;
        assert!(changes(&events).is_empty());
        drop(first);

        let mut second = sync.watch_order(id);
        let events = collect(&mut second, 1).await;
        assert_eq!(changes(&events), vec![(PayPending, Paid)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_customer_list_reports_changes() {
        use OrderStatus::{Cancelled, New};

        let id = OrderId::generate();
        let customer = CustomerId::generate();
        let script = vec![Ok(order(id, customer, New)), Ok(order(id, customer, Cancelled))];
        let sync = OrderSync::new(ScriptedSource::new(customer, script), polling());

        let start = tokio::time::Instant::now();
        let mut sub = sync.watch_customer_orders(customer, OrderListQuery::default());
        let events = collect(&mut sub, 2).await;

        assert_eq!(changes(&events), vec![(New, Cancelled)]);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_orders_drops_old_results() {
        let a = OrderId::generate();
        let b = OrderId::generate();
        let customer = CustomerId::generate();
        let script = vec![
            Ok(order(a, customer, OrderStatus::New)),
            Ok(order(b, customer, OrderStatus::Paid)),
        ];
        let sync = OrderSync::new(ScriptedSource::new(customer, script), polling());

        let mut watching = sync.watch_order(a);
        let _ = collect(&mut watching, 1).await;
        watching.cancel();

        watching = sync.watch_order(b);
        match watching.recv().await {
            Some(SyncEvent::Updated(order)) => assert_eq!(order.id, b),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
