use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::alert::Alert;
use crate::models::location::{EtaData, LocationEntry};
use crate::models::order::OrderStatus;

/// Address of an event. Order-scoped events go to `Order(id)`,
/// operator-facing alerts to `Admin`, fleet-wide position traffic to
/// `Locations`. Dual delivery ("order channel plus global channel") is
/// two envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Order(u64),
    Admin,
    Locations,
}

/// Subscriber-side topic selector, parsed from the `channel` query
/// parameter of the event stream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFilter {
    All,
    Admin,
    Locations,
    Order(u64),
}

impl TopicFilter {
    pub fn parse(raw: &str) -> Option<TopicFilter> {
        match raw {
            "all" => Some(TopicFilter::All),
            "admin" => Some(TopicFilter::Admin),
            "locations" => Some(TopicFilter::Locations),
            _ => raw
                .strip_prefix("order:")
                .and_then(|id| id.parse().ok())
                .map(TopicFilter::Order),
        }
    }

    pub fn accepts(&self, topic: &Topic) -> bool {
        match (self, topic) {
            (TopicFilter::All, _) => true,
            (TopicFilter::Admin, Topic::Admin) => true,
            (TopicFilter::Locations, Topic::Locations) => true,
            (TopicFilter::Order(want), Topic::Order(got)) => want == got,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StatusChanged {
        order_id: u64,
        from: OrderStatus,
        to: OrderStatus,
    },
    LocationUpdated {
        order_id: u64,
        entry: LocationEntry,
    },
    EtaUpdated {
        order_id: u64,
        eta: EtaData,
    },
    AlertRaised {
        alert: Alert,
    },
    /// Order-facing notice mirroring an operator alert (`SLA_BREACH`,
    /// `DRIVER_STOPPED`).
    OrderNotice {
        order_id: u64,
        code: &'static str,
        minutes: i64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub topic: Topic,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

/// In-process publish/subscribe over a single broadcast channel.
/// Publishing never blocks and ignores the no-subscriber case.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _unused_rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, topic: Topic, event: Event) {
        let _ = self.tx.send(Envelope {
            topic,
            at: Utc::now(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}
