use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::{AlertEngine, OrderMeta};
use crate::bus::{Event, EventBus, Topic};
use crate::error::AppError;
use crate::models::location::{EtaData, GeoPoint, LocationEntry};
use crate::observability::metrics::Metrics;
use crate::routing::RoutingService;
use crate::store::OrderStore;

#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Per-order history ring size; oldest samples are evicted first.
    pub history_cap: usize,
    /// Minutes after delivery before tracking state is dropped.
    pub retention_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_cap: 200,
            retention_minutes: 120,
            sweep_interval_secs: 60,
        }
    }
}

/// One position report from a courier device.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationReport {
    pub order_id: u64,
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub driver_id: Option<Uuid>,
    /// Destination for the routed ETA; no routing happens without it.
    pub dropoff: Option<GeoPoint>,
}

struct EtaSlot {
    data: EtaData,
    /// Routing request sequence that produced `data`. Responses with a
    /// lower sequence arrive late and are discarded.
    seq: u64,
}

/// Ingests courier positions, keeps bounded per-order history and the
/// last known position per order and per driver, and refreshes the
/// routed ETA. Routing failures degrade silently; the ETA keeps its
/// last value.
pub struct LocationTracker {
    history: DashMap<u64, VecDeque<LocationEntry>>,
    latest_by_order: DashMap<u64, LocationEntry>,
    latest_by_driver: DashMap<Uuid, LocationEntry>,
    etas: DashMap<u64, EtaSlot>,
    route_seq: DashMap<u64, u64>,
    routing: Arc<dyn RoutingService>,
    store: Arc<OrderStore>,
    alerts: Arc<AlertEngine>,
    bus: EventBus,
    metrics: Metrics,
    config: TrackerConfig,
}

impl LocationTracker {
    pub fn new(
        config: TrackerConfig,
        routing: Arc<dyn RoutingService>,
        store: Arc<OrderStore>,
        alerts: Arc<AlertEngine>,
        bus: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            history: DashMap::new(),
            latest_by_order: DashMap::new(),
            latest_by_driver: DashMap::new(),
            etas: DashMap::new(),
            route_seq: DashMap::new(),
            routing,
            store,
            alerts,
            bus,
            metrics,
            config,
        }
    }

    pub async fn record(&self, report: LocationReport) -> Result<LocationEntry, AppError> {
        if !report.lat.is_finite()
            || !report.lng.is_finite()
            || report.lat.abs() > 90.0
            || report.lng.abs() > 180.0
        {
            return Err(AppError::BadRequest(
                "latitude/longitude out of range".to_string(),
            ));
        }

        let order_id = report.order_id;
        let entry = LocationEntry {
            order_id,
            lat: report.lat,
            lng: report.lng,
            speed: report.speed,
            heading: report.heading,
            recorded_at: report.recorded_at.unwrap_or_else(Utc::now),
            driver_id: report.driver_id,
        };

        {
            let mut samples = self.history.entry(order_id).or_default();
            if samples.len() >= self.config.history_cap {
                samples.pop_front();
            }
            samples.push_back(entry.clone());
        }
        self.latest_by_order.insert(order_id, entry.clone());
        if let Some(driver_id) = entry.driver_id {
            self.latest_by_driver.insert(driver_id, entry.clone());
        }

        self.metrics.locations_recorded_total.inc();
        self.metrics.tracked_orders.set(self.history.len() as i64);
        self.bus.publish(
            Topic::Order(order_id),
            Event::LocationUpdated {
                order_id,
                entry: entry.clone(),
            },
        );
        self.bus.publish(
            Topic::Locations,
            Event::LocationUpdated {
                order_id,
                entry: entry.clone(),
            },
        );

        // Samples for ids the store does not know are still tracked;
        // anomaly detection needs order timestamps, so it only sees
        // samples for known orders.
        if let Ok(order) = self.store.get(order_id) {
            let meta = OrderMeta {
                created_at: order.created_at,
                confirmed_at: order.confirmed_at(),
            };
            self.alerts.observe(&entry, &meta);
        }

        if let Some(dropoff) = report.dropoff {
            self.refresh_eta(order_id, entry.point(), dropoff).await;
        }

        Ok(entry)
    }

    async fn refresh_eta(&self, order_id: u64, from: GeoPoint, dropoff: GeoPoint) {
        // The sequence is taken before the request goes out; a response
        // is applied only if no later request has been applied since.
        let seq = {
            let mut slot = self.route_seq.entry(order_id).or_insert(0);
            *slot += 1;
            *slot
        };

        match self.routing.route(from, dropoff).await {
            Ok(estimate) => {
                self.metrics
                    .routing_requests_total
                    .with_label_values(&["success"])
                    .inc();

                let eta = EtaData {
                    eta_min: (estimate.duration_sec / 60.0).round().max(0.0) as i64,
                    distance_m: estimate.distance_m,
                    updated_at: Utc::now(),
                    geometry: estimate.geometry,
                };

                let applied = match self.etas.entry(order_id) {
                    Entry::Occupied(mut occupied) => {
                        if seq > occupied.get().seq {
                            occupied.insert(EtaSlot {
                                data: eta.clone(),
                                seq,
                            });
                            true
                        } else {
                            false
                        }
                    }
                    Entry::Vacant(vacant) => {
                        vacant.insert(EtaSlot {
                            data: eta.clone(),
                            seq,
                        });
                        true
                    }
                };

                if applied {
                    // Unknown orders have no slot to update; ignore.
                    let _ = self.store.note_eta(order_id, eta.eta_min);
                    self.bus.publish(
                        Topic::Order(order_id),
                        Event::EtaUpdated {
                            order_id,
                            eta: eta.clone(),
                        },
                    );
                    self.bus
                        .publish(Topic::Locations, Event::EtaUpdated { order_id, eta });
                } else {
                    self.metrics.eta_stale_discards_total.inc();
                    debug!(order_id, seq, "stale routing response discarded");
                }
            }
            Err(err) => {
                self.metrics
                    .routing_requests_total
                    .with_label_values(&["error"])
                    .inc();
                warn!(order_id, error = %err, "routing failed, keeping last eta");
            }
        }
    }

    pub fn eta(&self, order_id: u64) -> Option<EtaData> {
        self.etas.get(&order_id).map(|slot| slot.data.clone())
    }

    pub fn latest(&self, order_id: u64) -> Option<LocationEntry> {
        self.latest_by_order
            .get(&order_id)
            .map(|entry| entry.value().clone())
    }

    pub fn history(&self, order_id: u64) -> Vec<LocationEntry> {
        self.history
            .get(&order_id)
            .map(|samples| samples.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Last known position of every driver.
    pub fn latest_all(&self) -> Vec<LocationEntry> {
        self.latest_by_driver
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn tracked_count(&self) -> usize {
        self.history.len()
    }

    /// Drop all tracking and alert state for one order.
    pub fn purge(&self, order_id: u64) {
        self.history.remove(&order_id);
        self.latest_by_order.remove(&order_id);
        self.latest_by_driver
            .retain(|_, entry| entry.order_id != order_id);
        self.etas.remove(&order_id);
        self.route_seq.remove(&order_id);
        self.alerts.clear(order_id);
        self.metrics.tracked_orders.set(self.history.len() as i64);
    }

    /// Drop state for orders delivered more than the retention window
    /// ago. Returns how many orders were purged.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = chrono::Duration::minutes(self.config.retention_minutes);
        let stale: Vec<u64> = self
            .history
            .iter()
            .map(|entry| *entry.key())
            .filter(|order_id| match self.store.get(*order_id) {
                Ok(order) if order.status.is_terminal() => order
                    .status_at(order.status)
                    .is_some_and(|delivered_at| delivered_at + cutoff <= now),
                _ => false,
            })
            .collect();

        for order_id in &stale {
            self.purge(*order_id);
            debug!(order_id, "tracking state dropped after retention window");
        }
        stale.len()
    }
}

pub async fn run_retention_sweeper(tracker: Arc<LocationTracker>) {
    info!("retention sweeper started");
    let interval = Duration::from_secs(tracker.config.sweep_interval_secs);

    loop {
        sleep(interval).await;
        let dropped = tracker.sweep(Utc::now());
        if dropped > 0 {
            info!(dropped, "retention sweep purged delivered orders");
        }
    }
}
