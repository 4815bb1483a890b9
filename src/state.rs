use std::sync::Arc;

use crate::alerts::{AlertEngine, AlertThresholds};
use crate::bus::EventBus;
use crate::config::Config;
use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::routing::RoutingService;
use crate::store::journal::OrderJournal;
use crate::store::{OrderStore, PrepTimes};
use crate::tracker::{LocationTracker, TrackerConfig};

pub struct AppState {
    pub bus: EventBus,
    pub metrics: Metrics,
    pub store: Arc<OrderStore>,
    pub alerts: Arc<AlertEngine>,
    pub tracker: Arc<LocationTracker>,
}

impl AppState {
    pub fn new(
        config: &Config,
        journal: Arc<dyn OrderJournal>,
        routing: Arc<dyn RoutingService>,
    ) -> Result<Self, AppError> {
        let bus = EventBus::new(config.event_buffer_size);
        let metrics = Metrics::new();

        let store = Arc::new(OrderStore::open(
            journal,
            PrepTimes::default(),
            bus.clone(),
            metrics.clone(),
        )?);

        let alerts = Arc::new(AlertEngine::new(
            AlertThresholds {
                sla_minutes: config.sla_breach_minutes,
                stopped_minutes: config.driver_stopped_minutes,
                stopped_radius_m: config.driver_stopped_radius_m,
            },
            bus.clone(),
            metrics.clone(),
        ));

        let tracker = Arc::new(LocationTracker::new(
            TrackerConfig {
                history_cap: config.location_history_cap,
                retention_minutes: config.retention_minutes,
                sweep_interval_secs: config.retention_sweep_secs,
            },
            routing,
            store.clone(),
            alerts.clone(),
            bus.clone(),
            metrics.clone(),
        ));

        Ok(Self {
            bus,
            metrics,
            store,
            alerts,
            tracker,
        })
    }
}
