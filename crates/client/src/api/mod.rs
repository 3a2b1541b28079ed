//! Storefront backend REST client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`, base URL from [`ClientConfig`]
//! - Reads go through a bounded [`RetryPolicy`]; mutations are sent once
//! - Responses are cached via `moka` (see [`cache`])
//! - State is only updated after the backend confirms a mutation
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_client::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(&ClientConfig::from_env()?)?;
//!
//! let page = client.list_products(&ProductQuery::default()).await?;
//! let order = client.get_order(order_id).await?;
//! client.pay_order(order.id).await?;
//! ```

pub mod cache;
mod error;
mod retry;

pub use cache::{OrderListKey, OrderListQuery, ProductQuery, QueryCache};
pub use error::ApiError;
pub use retry::RetryPolicy;

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;
use vitrine_core::{CreateOrderRequest, CustomerId, Order, OrderId, Page, ProductDto};

use crate::config::ClientConfig;

/// Body of `GET /actuator/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    /// The backend reports itself as up.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront backend.
///
/// Cheap to clone; clones share the HTTP connection pool and caches.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    health_retry: RetryPolicy,
    cache: QueryCache,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        // Url::join replaces the last segment unless the base ends with '/'
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                retry: RetryPolicy::immediate(config.max_retries),
                health_retry: RetryPolicy::immediate(1),
                cache: QueryCache::new(config.product_stale_time),
            }),
        })
    }

    /// The backend base URL (always ends with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The shared response cache.
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(ApiError::from_status(status, path, &body));
        }

        Ok(body)
    }

    /// GET a JSON document.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let body = self
            .send(self.inner.client.get(url).query(query), path)
            .await?;
        decode(&body)
    }

    /// POST without caring about the response body.
    async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path)?;
        self.send(self.inner.client.post(url), path).await?;
        Ok(())
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List catalog products.
    ///
    /// Served from cache while the listing is fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<ProductDto>, ApiError> {
        if let Some(page) = self.inner.cache.products(query).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut params = vec![
            ("active", query.active.to_string()),
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
        ];
        if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("q", q.to_string()));
        }

        let page: Page<ProductDto> = self
            .inner
            .retry
            .run("list_products", || self.get_json("products", &params))
            .await?;

        self.inner
            .cache
            .put_products(query.clone(), page.clone())
            .await;
        Ok(page)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Fetch the current state of an order and remember it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` immediately for unknown orders, or the
    /// last error once the retry budget is spent.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        let path = format!("orders/{id}");
        let order: Order = self
            .inner
            .retry
            .run("get_order", || self.get_json(&path, &[]))
            .await?;

        self.inner.cache.put_order(order.clone()).await;
        Ok(order)
    }

    /// Last-known snapshot of an order, without a request.
    pub async fn cached_order(&self, id: OrderId) -> Option<Order> {
        self.inner.cache.order(&id).await
    }

    /// List a customer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn orders_by_customer(
        &self,
        customer_id: CustomerId,
        query: &OrderListQuery,
    ) -> Result<Page<Order>, ApiError> {
        let path = format!("orders/customer/{customer_id}");
        let params = order_list_params(query);

        let page: Page<Order> = self
            .inner
            .retry
            .run("orders_by_customer", || self.get_json(&path, &params))
            .await?;

        let key = OrderListKey {
            customer_id,
            query: query.clone(),
        };
        self.inner.cache.put_order_list(key, page.clone()).await;
        Ok(page)
    }

    /// Last-known listing of a customer's orders, without a request.
    pub async fn cached_orders_by_customer(
        &self,
        customer_id: CustomerId,
        query: &OrderListQuery,
    ) -> Option<Page<Order>> {
        let key = OrderListKey {
            customer_id,
            query: query.clone(),
        };
        self.inner.cache.order_list(&key).await
    }

    /// Create an order.
    ///
    /// The request is validated locally first and never sent if invalid.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for invalid input, or the backend error.
    #[instrument(skip_all, fields(customer_id = %request.customer_id, items = request.items.len()))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        request.validate()?;

        let url = self.url("orders")?;
        let body = self
            .send(self.inner.client.post(url).json(request), "orders")
            .await?;
        let order: Order = decode(&body)?;

        info!(order_id = %order.id, total = %order.total_cents, "Order created");
        self.inner.cache.invalidate_order_lists();
        self.inner.cache.put_order(order.clone()).await;
        Ok(order)
    }

    /// Pay an order.
    ///
    /// # Errors
    ///
    /// Returns the backend error; cached state is left untouched on failure.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn pay_order(&self, id: OrderId) -> Result<(), ApiError> {
        self.post_empty(&format!("orders/{id}/pay")).await?;
        info!("Payment processed");
        self.inner.cache.invalidate_order(&id).await;
        Ok(())
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns the backend error; cached state is left untouched on failure.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn cancel_order(&self, id: OrderId) -> Result<(), ApiError> {
        self.post_empty(&format!("orders/{id}/cancel")).await?;
        info!("Order cancelled");
        self.inner.cache.invalidate_order(&id).await;
        Ok(())
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Query the backend health endpoint (one retry).
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reached or decoded.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.inner
            .health_retry
            .run("health", || self.get_json("actuator/health", &[]))
            .await
    }
}

/// Build the query string for a customer order listing.
fn order_list_params(query: &OrderListQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(page) = query.page {
        params.push(("page", page.to_string()));
    }
    if let Some(size) = query.size {
        params.push(("size", size.to_string()));
    }
    if let Some(status) = query.status {
        params.push(("status", status.as_str().to_string()));
    }
    if let Some(from) = query.from {
        params.push(("from", from.to_string()));
    }
    if let Some(to) = query.to {
        params.push(("to", to.to_string()));
    }
    params
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        ApiError::Decode(e)
    })
}
