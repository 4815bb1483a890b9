use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an order. Each status permits exactly one successor;
/// `Delivered` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Confirmed,
    Assigned,
    PickedUp,
    Delivered,
}

impl OrderStatus {
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::PendingPayment => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Assigned),
            OrderStatus::Assigned => Some(OrderStatus::PickedUp),
            OrderStatus::PickedUp => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Assigned => "ASSIGNED",
            OrderStatus::PickedUp => "PICKED_UP",
            OrderStatus::Delivered => "DELIVERED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: u64,
    pub name: String,
    /// Unit price in integer minor units.
    pub unit_price: i64,
    pub quantity: u32,
    pub merchant_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub vehicle: Option<String>,
}

/// Evidence that an order was physically handed over. A PIN proof is
/// validated against the order's delivery code and persisted redacted;
/// photo references are stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProofOfDelivery {
    Photo { reference: String },
    Pin { code: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub items: Vec<OrderItem>,
    /// Order total in integer minor units.
    pub total: i64,
    pub merchant_id: Option<u64>,
    pub client: Option<String>,
    pub status: OrderStatus,
    /// Append-only, one entry per transition. The last entry's status
    /// always equals `status`.
    pub timeline: Vec<TimelineEntry>,
    pub driver: Option<Driver>,
    pub eta_min: Option<i64>,
    pub pin_delivery: String,
    pub pod: Option<ProofOfDelivery>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Timestamp of the first timeline entry with the given status.
    pub fn status_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        self.timeline
            .iter()
            .find(|entry| entry.status == status)
            .map(|entry| entry.at)
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.status_at(OrderStatus::Confirmed)
    }
}
