//! Integration tests for order polling and health monitoring.

use std::time::Duration;

use tokio::time::timeout;
use vitrine_client::{
    ApiClient, ConnectionState, HealthMonitor, OrderListQuery, OrderSync, Subscription, SyncEvent,
};
use vitrine_core::{Cents, CreateOrderRequest, CustomerId, Order, OrderItem, OrderStatus};
use vitrine_integration_tests::FakeBackend;

const WAIT: Duration = Duration::from_secs(5);

async fn setup() -> (FakeBackend, ApiClient) {
    let backend = FakeBackend::start().await.expect("Failed to start backend");
    let client = ApiClient::new(&backend.client_config()).expect("Failed to build client");
    (backend, client)
}

async fn create(client: &ApiClient, customer_id: CustomerId) -> Order {
    let request = CreateOrderRequest {
        customer_id,
        items: vec![OrderItem {
            sku: "CAF-001".into(),
            qty: 1,
            price_cents: Cents::new(1999),
        }],
    };
    client
        .create_order(&request)
        .await
        .expect("Failed to create order")
}

/// Next status change, skipping snapshots.
async fn next_change<T>(sub: &mut Subscription<T>) -> (OrderStatus, OrderStatus, String) {
    timeout(WAIT, async {
        loop {
            match sub.recv().await.expect("subscription ended") {
                SyncEvent::StatusChanged(change) => {
                    return (change.from, change.to, change.to_string());
                }
                SyncEvent::Updated(_) | SyncEvent::FetchFailed { .. } => {}
            }
        }
    })
    .await
    .expect("no status change in time")
}

#[tokio::test]
async fn test_watch_order_reports_backend_transitions() {
    let (backend, client) = setup().await;
    let order = create(&client, CustomerId::generate()).await;
    let sync = OrderSync::new(client.clone(), backend.client_config().polling);

    let mut sub = sync.watch_order(order.id);
    match timeout(WAIT, sub.recv()).await.expect("no first snapshot") {
        Some(SyncEvent::Updated(snapshot)) => assert_eq!(snapshot.status, OrderStatus::New),
        other => panic!("unexpected event: {other:?}"),
    }

    backend.set_order_status(order.id.as_uuid(), "PAID");
    let (from, to, message) = next_change(&mut sub).await;
    assert_eq!((from, to), (OrderStatus::New, OrderStatus::Paid));
    assert_eq!(message, format!("Pedido {} mudou para: Pago", order.reference()));

    backend.set_order_status(order.id.as_uuid(), "SHIPPED");
    let (from, to, _) = next_change(&mut sub).await;
    assert_eq!((from, to), (OrderStatus::Paid, OrderStatus::Shipped));
}

#[tokio::test]
async fn test_watch_customer_orders_reports_changes() {
    let (backend, client) = setup().await;
    let customer = CustomerId::generate();
    let first = create(&client, customer).await;
    let _second = create(&client, customer).await;
    let sync = OrderSync::new(client.clone(), backend.client_config().polling);

    let mut sub = sync.watch_customer_orders(customer, OrderListQuery::default());
    match timeout(WAIT, sub.recv()).await.expect("no first snapshot") {
        Some(SyncEvent::Updated(page)) => assert_eq!(page.content.len(), 2),
        other => panic!("unexpected event: {other:?}"),
    }

    backend.set_order_status(first.id.as_uuid(), "CANCELLED");
    let (from, to, _) = next_change(&mut sub).await;
    assert_eq!((from, to), (OrderStatus::New, OrderStatus::Cancelled));
    assert_eq!(sync.last_status(&first.id), Some(OrderStatus::Cancelled));
}

#[tokio::test]
async fn test_cancelled_watch_stops_polling() {
    let (backend, client) = setup().await;
    let order = create(&client, CustomerId::generate()).await;
    let sync = OrderSync::new(client.clone(), backend.client_config().polling);
    let path = format!("GET /orders/{}", order.id);

    let mut sub = sync.watch_order(order.id);
    timeout(WAIT, sub.recv()).await.expect("no first snapshot");
    sub.cancel();

    // Let any request that was already on the wire land
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls = backend.hits(&path);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.hits(&path), polls);
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn test_health_monitor_follows_backend() {
    let (backend, client) = setup().await;
    let mut monitor = HealthMonitor::spawn(client, backend.client_config().polling.health);

    let state = timeout(WAIT, monitor.changed()).await.expect("no health state");
    assert_eq!(state.expect("monitor stopped"), ConnectionState::Online);

    backend.set_health("DOWN");
    let state = timeout(WAIT, async {
        loop {
            let state = monitor.changed().await.expect("monitor stopped");
            if state == ConnectionState::Offline {
                return state;
            }
        }
    })
    .await
    .expect("never went offline");
    assert_eq!(state, ConnectionState::Offline);
    assert_eq!(monitor.state(), ConnectionState::Offline);
}
