//! Integration tests for Vitrine.
//!
//! Tests run the real client against [`FakeBackend`], an in-process `axum`
//! server speaking the storefront REST contract. It keeps orders in memory,
//! records every request, and can be told to fail upcoming requests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vitrine-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vitrine_client::{ClientConfig, PollingConfig};

/// An order as the fake backend stores it.
#[derive(Debug, Clone)]
pub struct StoredOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub total_cents: i64,
    pub created_at: String,
    pub items: Vec<Value>,
}

impl StoredOrder {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "customerId": self.customer_id,
            "status": self.status,
            "totalCents": self.total_cents,
            "createdAt": self.created_at,
            "items": self.items,
        })
    }
}

#[derive(Default)]
struct BackendState {
    products: Vec<Value>,
    orders: HashMap<Uuid, StoredOrder>,
    order_sequence: Vec<Uuid>,
    health: String,
    failures: VecDeque<StatusCode>,
    delay: Option<Duration>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process storefront backend.
///
/// The server stops when this value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            products: default_products(),
            health: "UP".to_string(),
            ..BackendState::default()
        }));

        let app = Router::new()
            .route("/products", get(list_products))
            .route("/orders", post(create_order))
            .route("/orders/{id}", get(get_order))
            .route("/orders/{id}/pay", post(pay_order))
            .route("/orders/{id}/cancel", post(cancel_order))
            .route("/orders/customer/{customer_id}", get(orders_by_customer))
            .route("/actuator/health", get(health))
            .layer(middleware::from_fn_with_state(state.clone(), record_and_inject))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL of the running server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server, with fast polling.
    ///
    /// # Panics
    ///
    /// Never in practice; the base URL is always well-formed.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url().parse().expect("valid base URL"));
        config.http_timeout = Duration::from_secs(2);
        config.polling = PollingConfig {
            order: Duration::from_millis(50),
            order_list: Duration::from_millis(50),
            health: Duration::from_millis(50),
        };
        config
    }

    /// Fail the next requests with the given statuses, in order.
    pub fn fail_next(&self, statuses: impl IntoIterator<Item = StatusCode>) {
        lock(&self.state).failures.extend(statuses);
    }

    /// Delay every response.
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    /// What `/actuator/health` reports.
    pub fn set_health(&self, status: &str) {
        lock(&self.state).health = status.to_string();
    }

    /// Move an order to another status, as backend processing would.
    pub fn set_order_status(&self, id: Uuid, status: &str) {
        if let Some(order) = lock(&self.state).orders.get_mut(&id) {
            order.status = status.to_string();
        }
    }

    /// Insert an order directly.
    pub fn insert_order(&self, order: StoredOrder) {
        let mut state = lock(&self.state);
        state.order_sequence.push(order.id);
        state.orders.insert(order.id, order);
    }

    #[must_use]
    pub fn order(&self, id: Uuid) -> Option<StoredOrder> {
        lock(&self.state).orders.get(&id).cloned()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        lock(&self.state).orders.len()
    }

    /// Every request seen so far, as `"METHOD /path?query"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }

    /// How many requests matched `"METHOD /path?query"` exactly.
    #[must_use]
    pub fn hits(&self, request: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.as_str() == request)
            .count()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn default_products() -> Vec<Value> {
    vec![
        json!({
            "id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a01",
            "sku": "CAF-001",
            "name": "Café Especial 250g",
            "description": "Torra média",
            "priceCents": 1999,
            "imageUrl": "https://img.example.com/caf-001.jpg",
            "stockQty": 12,
            "active": true,
            "createdAt": "2024-01-10T09:00:00Z",
            "updatedAt": "2024-01-10T09:00:00Z"
        }),
        json!({
            "id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a02",
            "sku": "CHA-002",
            "name": "Chá Verde",
            "description": "",
            "priceCents": 850,
            "imageUrl": "",
            "stockQty": 0,
            "active": true
        }),
        json!({
            "id": "9b2e6f1a-3c4d-4e5f-8a9b-0c1d2e3f4a03",
            "sku": "XIC-003",
            "name": "Xícara",
            "priceCents": 4500,
            "stockQty": 3,
            "active": false
        }),
    ]
}

// =============================================================================
// Middleware
// =============================================================================

async fn record_and_inject(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let (failure, delay) = {
        let mut state = lock(&state);
        let target = request
            .uri()
            .path_and_query()
            .map_or_else(|| request.uri().path(), |pq| pq.as_str());
        state.requests.push(format!("{} {target}", request.method()));
        (state.failures.pop_front(), state.delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = failure {
        return (status, Json(json!({"error": "injected failure"}))).into_response();
    }
    next.run(request).await
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Deserialize)]
struct ProductParams {
    q: Option<String>,
    active: Option<bool>,
    page: Option<usize>,
    size: Option<usize>,
}

/// Spring Data style page: nested `page` metadata.
async fn list_products(
    State(state): State<Shared>,
    Query(params): Query<ProductParams>,
) -> Json<Value> {
    let state = lock(&state);
    let q = params.q.unwrap_or_default().to_lowercase();
    let matching: Vec<&Value> = state
        .products
        .iter()
        .filter(|p| !params.active.unwrap_or(false) || p["active"] == json!(true))
        .filter(|p| {
            q.is_empty()
                || p["sku"].as_str().is_some_and(|s| s.to_lowercase().contains(&q))
                || p["name"].as_str().is_some_and(|s| s.to_lowercase().contains(&q))
        })
        .collect();

    let size = params.size.unwrap_or(12).max(1);
    let number = params.page.unwrap_or(0);
    let content: Vec<&Value> = matching.iter().skip(number * size).take(size).copied().collect();

    Json(json!({
        "content": content,
        "page": {
            "size": size,
            "number": number,
            "totalElements": matching.len(),
            "totalPages": matching.len().div_ceil(size),
        }
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderBody {
    customer_id: Uuid,
    items: Vec<CreateItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItem {
    sku: String,
    qty: i64,
    price_cents: i64,
}

async fn create_order(State(state): State<Shared>, Json(body): Json<CreateOrderBody>) -> Response {
    if body.items.is_empty() || body.items.iter().any(|i| i.qty < 1 || i.price_cents < 1) {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid order"}))).into_response();
    }

    let order = StoredOrder {
        id: Uuid::new_v4(),
        customer_id: body.customer_id,
        status: "NEW".to_string(),
        total_cents: body.items.iter().map(|i| i.qty * i.price_cents).sum(),
        created_at: "2024-01-15T14:30:00Z".to_string(),
        items: body
            .items
            .iter()
            .map(|i| json!({"sku": i.sku, "qty": i.qty, "priceCents": i.price_cents}))
            .collect(),
    };

    let json = order.to_json();
    let mut state = lock(&state);
    state.order_sequence.push(order.id);
    state.orders.insert(order.id, order);
    (StatusCode::CREATED, Json(json)).into_response()
}

async fn get_order(State(state): State<Shared>, Path(id): Path<Uuid>) -> Response {
    match lock(&state).orders.get(&id) {
        Some(order) => Json(order.to_json()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn transition(state: &Shared, id: Uuid, to: &str) -> Response {
    let mut state = lock(state);
    let Some(order) = state.orders.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !matches!(order.status.as_str(), "NEW" | "PAY_PENDING") {
        return (
            StatusCode::CONFLICT,
            Json(json!({"error": format!("order is {}", order.status)})),
        )
            .into_response();
    }
    order.status = to.to_string();
    Json(order.to_json()).into_response()
}

async fn pay_order(State(state): State<Shared>, Path(id): Path<Uuid>) -> Response {
    transition(&state, id, "PAID")
}

async fn cancel_order(State(state): State<Shared>, Path(id): Path<Uuid>) -> Response {
    transition(&state, id, "CANCELLED")
}

#[derive(Deserialize)]
struct OrderListParams {
    status: Option<String>,
    page: Option<usize>,
    size: Option<usize>,
}

/// Flat page shape.
async fn orders_by_customer(
    State(state): State<Shared>,
    Path(customer_id): Path<Uuid>,
    Query(params): Query<OrderListParams>,
) -> Json<Value> {
    let state = lock(&state);
    let matching: Vec<Value> = state
        .order_sequence
        .iter()
        .filter_map(|id| state.orders.get(id))
        .filter(|o| o.customer_id == customer_id)
        .filter(|o| params.status.as_deref().is_none_or(|s| o.status == s))
        .map(StoredOrder::to_json)
        .collect();

    let size = params.size.unwrap_or(10).max(1);
    let number = params.page.unwrap_or(0);
    let content: Vec<&Value> = matching.iter().skip(number * size).take(size).collect();

    Json(json!({
        "content": content,
        "totalElements": matching.len(),
        "totalPages": matching.len().div_ceil(size),
        "number": number,
        "size": size,
    }))
}

async fn health(State(state): State<Shared>) -> Json<Value> {
    Json(json!({"status": lock(&state).health}))
}
