//! Status-transition detection.

use std::collections::HashMap;

use vitrine_core::{Order, OrderId, OrderStatus};

/// An order moved from one status to another between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl std::fmt::Display for StatusChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pedido #{} mudou para: {}",
            self.order_id.short(),
            self.to.label()
        )
    }
}

/// Remembers the last observed status per order.
///
/// Only the transition into the newly observed status is reported; any
/// statuses the order passed through between two observations are invisible.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last: HashMap<OrderId, OrderStatus>,
}

impl StatusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation; returns the change if the status differs from
    /// the previous observation. The first observation never reports.
    pub fn observe(&mut self, order: &Order) -> Option<StatusChange> {
        let previous = self.last.insert(order.id, order.status)?;
        (previous != order.status).then_some(StatusChange {
            order_id: order.id,
            from: previous,
            to: order.status,
        })
    }

    /// Record every order of a listing, returning all changes in page order.
    pub fn observe_all<'a>(
        &mut self,
        orders: impl IntoIterator<Item = &'a Order>,
    ) -> Vec<StatusChange> {
        orders
            .into_iter()
            .filter_map(|order| self.observe(order))
            .collect()
    }

    /// Last observed status of an order.
    #[must_use]
    pub fn last_status(&self, id: &OrderId) -> Option<OrderStatus> {
        self.last.get(id).copied()
    }
}
