pub mod journal;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use tracing::{error, info};

use crate::bus::{Event, EventBus, Topic};
use crate::error::AppError;
use crate::models::order::{Driver, Order, OrderItem, OrderStatus, ProofOfDelivery, TimelineEntry};
use crate::observability::metrics::Metrics;
use crate::store::journal::{JournalState, OrderJournal};

/// Placeholder persisted in place of a matched delivery PIN; the raw
/// code is never stored twice.
pub const REDACTED_PIN: &str = "####";

/// Preparation minutes per store plus the travel-estimate range used as
/// an ETA prior at assignment, before any live routing data exists.
#[derive(Debug, Clone)]
pub struct PrepTimes {
    minutes: HashMap<u64, i64>,
    default_minutes: i64,
    travel_ranges: HashMap<u64, (i64, i64)>,
    default_travel: (i64, i64),
}

impl Default for PrepTimes {
    fn default() -> Self {
        Self {
            minutes: HashMap::from([(1, 10), (2, 20), (3, 15)]),
            default_minutes: 15,
            travel_ranges: HashMap::from([(1, (8, 18)), (2, (12, 30))]),
            default_travel: (10, 25),
        }
    }
}

impl PrepTimes {
    pub fn prep_minutes(&self, merchant_id: Option<u64>) -> i64 {
        merchant_id
            .and_then(|id| self.minutes.get(&id).copied())
            .unwrap_or(self.default_minutes)
    }

    pub fn travel_range(&self, merchant_id: Option<u64>) -> (i64, i64) {
        merchant_id
            .and_then(|id| self.travel_ranges.get(&id).copied())
            .unwrap_or(self.default_travel)
    }
}

/// Authoritative order state. Single writer of status, timeline, driver
/// and proof-of-delivery; every mutation is validated under the entry
/// guard and snapshotted to the journal before it is acknowledged.
pub struct OrderStore {
    orders: DashMap<u64, Order>,
    sequence: AtomicU64,
    journal: Arc<dyn OrderJournal>,
    prep: PrepTimes,
    bus: EventBus,
    metrics: Metrics,
}

impl OrderStore {
    pub fn open(
        journal: Arc<dyn OrderJournal>,
        prep: PrepTimes,
        bus: EventBus,
        metrics: Metrics,
    ) -> Result<Self, AppError> {
        let orders = DashMap::new();
        let mut sequence = 0;

        if let Some(state) = journal.load()? {
            sequence = state.sequence;
            for order in state.orders {
                orders.insert(order.id, order);
            }
            info!(orders = orders.len(), sequence, "order journal loaded");
        }

        Ok(Self {
            orders,
            sequence: AtomicU64::new(sequence),
            journal,
            prep,
            bus,
            metrics,
        })
    }

    pub fn create(
        &self,
        items: Vec<OrderItem>,
        total: i64,
        merchant_id: Option<u64>,
        client: Option<String>,
    ) -> Result<Order, AppError> {
        // Payment is pre-verified upstream, so orders enter at PAID.
        let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let order = Order {
            id,
            items,
            total,
            merchant_id,
            client,
            status: OrderStatus::Paid,
            timeline: vec![TimelineEntry {
                at: now,
                status: OrderStatus::Paid,
            }],
            driver: None,
            eta_min: None,
            pin_delivery: generate_pin(),
            pod: None,
            created_at: now,
        };

        self.orders.insert(id, order.clone());
        self.persist()?;
        self.metrics.orders_created_total.inc();
        info!(order_id = id, total, "order created");

        Ok(order)
    }

    pub fn get(&self, id: u64) -> Result<Order, AppError> {
        self.orders
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
    }

    /// All orders, newest first.
    pub fn list(&self) -> Vec<Order> {
        let mut all: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Advance to the single permitted successor status. Any other
    /// request is rejected without touching the order; a failed proof
    /// check on the DELIVERED transition also leaves the status as-is.
    pub fn update_status(
        &self,
        id: u64,
        next: OrderStatus,
        pod: Option<ProofOfDelivery>,
    ) -> Result<Order, AppError> {
        let (updated, from) = {
            let mut entry = self
                .orders
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

            let current = entry.status;
            if current.successor() != Some(next) {
                self.metrics.transition_rejections_total.inc();
                return Err(AppError::Conflict(format!(
                    "order {id} cannot move from {current} to {next}"
                )));
            }

            let stored_pod = match (next, pod) {
                (OrderStatus::Delivered, Some(ProofOfDelivery::Pin { code })) => {
                    if code != entry.pin_delivery {
                        self.metrics.transition_rejections_total.inc();
                        return Err(AppError::Conflict(format!(
                            "order {id} delivery pin mismatch"
                        )));
                    }
                    Some(ProofOfDelivery::Pin {
                        code: REDACTED_PIN.to_string(),
                    })
                }
                (OrderStatus::Delivered, photo @ Some(ProofOfDelivery::Photo { .. })) => photo,
                _ => None,
            };

            entry.status = next;
            entry.timeline.push(TimelineEntry {
                at: Utc::now(),
                status: next,
            });
            if stored_pod.is_some() {
                entry.pod = stored_pod;
            }

            (entry.clone(), current)
        };

        self.persist()?;
        self.metrics
            .status_transitions_total
            .with_label_values(&[next.as_str()])
            .inc();
        self.bus.publish(
            Topic::Order(id),
            Event::StatusChanged {
                order_id: id,
                from,
                to: next,
            },
        );
        info!(order_id = id, from = %from, to = %next, "order status changed");

        Ok(updated)
    }

    pub fn confirm(&self, id: u64) -> Result<Order, AppError> {
        self.update_status(id, OrderStatus::Confirmed, None)
    }

    /// Hand the order to a driver. Legal only from CONFIRMED; the driver
    /// slot is set exactly once, so a repeated call is rejected rather
    /// than silently overwriting the assignment. The initial ETA is the
    /// store's preparation time plus a randomized travel prior, kept
    /// only until live routing data replaces it.
    pub fn assign_driver(&self, id: u64, driver: Driver) -> Result<Order, AppError> {
        let updated = {
            let mut entry = self
                .orders
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

            if entry.status != OrderStatus::Confirmed {
                self.metrics.transition_rejections_total.inc();
                return Err(AppError::Conflict(format!(
                    "order {id} must be CONFIRMED to assign a driver, is {}",
                    entry.status
                )));
            }

            let prep = self.prep.prep_minutes(entry.merchant_id);
            let (low, high) = self.prep.travel_range(entry.merchant_id);
            let travel = rand::thread_rng().gen_range(low..=high);

            entry.driver = Some(driver);
            entry.eta_min = Some(prep + travel);
            entry.status = OrderStatus::Assigned;
            entry.timeline.push(TimelineEntry {
                at: Utc::now(),
                status: OrderStatus::Assigned,
            });

            entry.clone()
        };

        self.persist()?;
        self.metrics
            .status_transitions_total
            .with_label_values(&[OrderStatus::Assigned.as_str()])
            .inc();
        self.bus.publish(
            Topic::Order(id),
            Event::StatusChanged {
                order_id: id,
                from: OrderStatus::Confirmed,
                to: OrderStatus::Assigned,
            },
        );
        info!(
            order_id = id,
            eta_min = updated.eta_min,
            "driver assigned"
        );

        Ok(updated)
    }

    /// Record a live routing estimate on the order. Called by the
    /// tracker whenever an accepted routing response replaces the ETA.
    pub fn note_eta(&self, id: u64, minutes: i64) -> Result<(), AppError> {
        {
            let mut entry = self
                .orders
                .get_mut(&id)
                .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
            entry.eta_min = Some(minutes);
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), AppError> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by_key(|order| order.id);

        let state = JournalState {
            sequence: self.sequence.load(Ordering::SeqCst),
            orders,
        };

        self.journal.save(&state).inspect_err(|err| {
            error!(error = %err, "order journal save failed");
        })
    }
}

fn generate_pin() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}
