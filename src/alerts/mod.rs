use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::bus::{Event, EventBus, Topic};
use crate::geo::haversine_m;
use crate::models::alert::{Alert, AlertKind, AlertState};
use crate::models::location::LocationEntry;
use crate::observability::metrics::Metrics;

#[derive(Debug, Clone, Copy)]
pub struct AlertThresholds {
    /// Minutes since confirmation (or creation) before an SLA breach.
    pub sla_minutes: i64,
    /// Minimum minutes between samples for a stop to count.
    pub stopped_minutes: i64,
    /// Movement under this many meters counts as stationary.
    pub stopped_radius_m: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            sla_minutes: 45,
            stopped_minutes: 8,
            stopped_radius_m: 50.0,
        }
    }
}

/// Order metadata the detector needs; supplied by the caller alongside
/// each sample.
#[derive(Debug, Clone, Copy)]
pub struct OrderMeta {
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Detects SLA breaches and stopped drivers over the position stream.
/// Each condition fires once per order and stays latched until an
/// operator clears it.
pub struct AlertEngine {
    states: DashMap<u64, AlertState>,
    thresholds: AlertThresholds,
    bus: EventBus,
    metrics: Metrics,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds, bus: EventBus, metrics: Metrics) -> Self {
        Self {
            states: DashMap::new(),
            thresholds,
            bus,
            metrics,
        }
    }

    pub fn observe(&self, sample: &LocationEntry, meta: &OrderMeta) {
        let order_id = sample.order_id;
        let mut state = self.states.entry(order_id).or_default();

        let since = meta.confirmed_at.unwrap_or(meta.created_at);
        let elapsed = (sample.recorded_at - since).num_minutes();
        if state.sla_at.is_none() && elapsed > self.thresholds.sla_minutes {
            state.sla_at = Some(sample.recorded_at);
            self.raise(order_id, AlertKind::SlaBreach, elapsed);
        }

        if let Some(prev) = state.prev.as_ref() {
            let stationary_min = (sample.recorded_at - prev.recorded_at).num_minutes();
            let moved_m = haversine_m(&prev.point(), &sample.point());
            if state.stopped_at.is_none()
                && stationary_min >= self.thresholds.stopped_minutes
                && moved_m < self.thresholds.stopped_radius_m
            {
                state.stopped_at = Some(sample.recorded_at);
                self.raise(order_id, AlertKind::DriverStopped, stationary_min);
            }
        }

        state.prev = Some(sample.clone());
    }

    fn raise(&self, order_id: u64, kind: AlertKind, minutes: i64) {
        let alert = Alert {
            id: Uuid::new_v4(),
            order_id,
            kind,
            minutes,
            raised_at: Utc::now(),
        };

        self.metrics
            .alerts_fired_total
            .with_label_values(&[kind.as_str()])
            .inc();
        info!(order_id, kind = %kind, minutes, "alert raised");

        self.bus.publish(Topic::Admin, Event::AlertRaised { alert });
        self.bus.publish(
            Topic::Order(order_id),
            Event::OrderNotice {
                order_id,
                code: kind.notice_code(),
                minutes,
            },
        );
    }

    /// Operator reset: drops the latch and the previous-sample memo.
    pub fn clear(&self, order_id: u64) {
        self.states.remove(&order_id);
        info!(order_id, "alert state cleared");
    }
}
