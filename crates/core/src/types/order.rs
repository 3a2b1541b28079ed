//! Orders and the create-order request.
//!
//! Orders are owned by the backend; this side only reads them. The request
//! type carries its own validation so malformed input is rejected before a
//! request is ever sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, CustomerId, OrderId, OrderStatus};
use crate::cart::CartLine;

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub sku: String,
    pub qty: u32,
    pub price_cents: Cents,
}

impl OrderItem {
    /// `qty × priceCents`.
    #[must_use]
    pub fn line_total(&self) -> Cents {
        self.price_cents.times(self.qty)
    }
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            sku: line.product.sku.clone(),
            qty: line.quantity,
            price_cents: line.product.price_cents,
        }
    }
}

/// An order as returned by `GET /orders/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub total_cents: Cents,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Human-facing reference, e.g. `#1a2b3c4d`.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("#{}", self.id.short())
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.qty)).sum()
    }
}

/// Validation errors for a create-order request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("ID do cliente deve ser um UUID válido")]
    InvalidCustomerId,
    #[error("Pelo menos um item é obrigatório")]
    NoItems,
    #[error("SKU é obrigatório (item {0})")]
    MissingSku(usize),
    #[error("Quantidade deve ser maior que 0 (item {0})")]
    InvalidQuantity(usize),
    #[error("Preço deve ser maior que 0 (item {0})")]
    InvalidPrice(usize),
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
}

impl CreateOrderRequest {
    /// Build a request from a raw customer id and cart lines, validating both.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the customer id is not a UUID or the
    /// items violate [`Self::validate`].
    pub fn from_cart(customer_id: &str, lines: &[CartLine]) -> Result<Self, ValidationError> {
        let customer_id = customer_id
            .parse::<CustomerId>()
            .map_err(|_| ValidationError::InvalidCustomerId)?;
        let request = Self {
            customer_id,
            items: lines.iter().map(OrderItem::from).collect(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the items: non-empty, each with a SKU, `qty ≥ 1` and
    /// `priceCents ≥ 1`. Item indices in errors are 1-based.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        for (i, item) in self.items.iter().enumerate() {
            let position = i + 1;
            if item.sku.trim().is_empty() {
                return Err(ValidationError::MissingSku(position));
            }
            if item.qty == 0 {
                return Err(ValidationError::InvalidQuantity(position));
            }
            if item.price_cents < Cents::new(1) {
                return Err(ValidationError::InvalidPrice(position));
            }
        }
        Ok(())
    }

    /// Sum of the line totals.
    #[must_use]
    pub fn total(&self) -> Cents {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

/// Format a timestamp as `dd/mm/yyyy hh:mm` (UTC).
#[must_use]
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d/%m/%Y %H:%M").to_string()
}
