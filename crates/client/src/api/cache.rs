//! Query cache for backend responses.
//!
//! Product listings are served from cache while fresh. Orders keep their
//! last-known snapshot until a mutation invalidates them, so a failed poll
//! can still show the previous state.

use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;
use vitrine_core::{CustomerId, Order, OrderId, OrderStatus, Page, ProductDto};

/// Parameters of `GET /products`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ProductQuery {
    /// Free-text search.
    pub q: Option<String>,
    pub active: bool,
    pub page: u32,
    pub size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            q: None,
            active: true,
            page: 0,
            size: 12,
        }
    }
}

/// Filters for `GET /orders/customer/{customerId}`.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// `None` means every status.
    pub status: Option<OrderStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Cache key for a customer's order listing.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct OrderListKey {
    pub customer_id: CustomerId,
    pub query: OrderListQuery,
}

/// Response caches shared by every clone of the client.
#[derive(Clone)]
pub struct QueryCache {
    products: Cache<ProductQuery, Page<ProductDto>>,
    orders: Cache<OrderId, Order>,
    order_lists: Cache<OrderListKey, Page<Order>>,
}

impl QueryCache {
    /// Create caches; product listings expire after `product_stale_time`.
    #[must_use]
    pub fn new(product_stale_time: Duration) -> Self {
        Self {
            products: Cache::builder()
                .max_capacity(200)
                .time_to_live(product_stale_time)
                .build(),
            orders: Cache::builder().max_capacity(1000).build(),
            order_lists: Cache::builder().max_capacity(200).build(),
        }
    }

    pub async fn products(&self, query: &ProductQuery) -> Option<Page<ProductDto>> {
        self.products.get(query).await
    }

    pub async fn put_products(&self, query: ProductQuery, page: Page<ProductDto>) {
        self.products.insert(query, page).await;
    }

    /// Last-known snapshot of an order.
    pub async fn order(&self, id: &OrderId) -> Option<Order> {
        self.orders.get(id).await
    }

    pub async fn put_order(&self, order: Order) {
        self.orders.insert(order.id, order).await;
    }

    pub async fn order_list(&self, key: &OrderListKey) -> Option<Page<Order>> {
        self.order_lists.get(key).await
    }

    pub async fn put_order_list(&self, key: OrderListKey, page: Page<Order>) {
        self.order_lists.insert(key, page).await;
    }

    /// Drop one order's snapshot and every cached listing.
    pub async fn invalidate_order(&self, id: &OrderId) {
        self.orders.invalidate(id).await;
        self.invalidate_order_lists();
    }

    /// Drop every cached order listing.
    pub fn invalidate_order_lists(&self) {
        self.order_lists.invalidate_all();
    }
}
