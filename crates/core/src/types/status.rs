//! Order status as reported by the backend.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Wire format is `SCREAMING_SNAKE_CASE` (`"PAY_PENDING"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    New,
    PayPending,
    Paid,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::PayPending,
        Self::Paid,
        Self::Shipped,
        Self::Cancelled,
    ];

    /// The happy-path progression shown as a timeline.
    pub const TIMELINE: [Self; 4] = [Self::New, Self::PayPending, Self::Paid, Self::Shipped];

    /// Wire code (`"PAY_PENDING"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::PayPending => "PAY_PENDING",
            Self::Paid => "PAID",
            Self::Shipped => "SHIPPED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Customer-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "Novo",
            Self::PayPending => "Pagamento Pendente",
            Self::Paid => "Pago",
            Self::Shipped => "Enviado",
            Self::Cancelled => "Cancelado",
        }
    }

    /// One-line description of what the status means for the customer.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::New => "Pedido criado e aguardando processamento...",
            Self::PayPending => "Aguardando confirmação do pagamento...",
            Self::Paid => "Pagamento confirmado! Preparando para envio...",
            Self::Shipped => "Pedido enviado e a caminho do destino!",
            Self::Cancelled => "Pedido cancelado.",
        }
    }

    /// Position along [`Self::TIMELINE`] as a percentage; cancelled is 0.
    #[must_use]
    pub const fn progress_percent(&self) -> u8 {
        match self {
            Self::New => 25,
            Self::PayPending => 50,
            Self::Paid => 75,
            Self::Shipped => 100,
            Self::Cancelled => 0,
        }
    }

    /// Whether the order still accepts a payment.
    #[must_use]
    pub const fn can_pay(&self) -> bool {
        matches!(self, Self::New | Self::PayPending)
    }

    /// Whether the order can still be cancelled.
    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        matches!(self, Self::New | Self::PayPending)
    }

    /// No further transitions are expected from this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Shipped | Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}
