use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub status_transitions_total: IntCounterVec,
    pub transition_rejections_total: IntCounter,
    pub locations_recorded_total: IntCounter,
    pub routing_requests_total: IntCounterVec,
    pub eta_stale_discards_total: IntCounter,
    pub alerts_fired_total: IntCounterVec,
    pub tracked_orders: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Successful status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let transition_rejections_total = IntCounter::new(
            "transition_rejections_total",
            "Rejected status transitions and proof checks",
        )
        .expect("valid transition_rejections_total metric");

        let locations_recorded_total = IntCounter::new(
            "locations_recorded_total",
            "Total courier position samples recorded",
        )
        .expect("valid locations_recorded_total metric");

        let routing_requests_total = IntCounterVec::new(
            Opts::new("routing_requests_total", "Routing requests by outcome"),
            &["outcome"],
        )
        .expect("valid routing_requests_total metric");

        let eta_stale_discards_total = IntCounter::new(
            "eta_stale_discards_total",
            "Routing responses discarded as stale",
        )
        .expect("valid eta_stale_discards_total metric");

        let alerts_fired_total = IntCounterVec::new(
            Opts::new("alerts_fired_total", "Alerts fired by kind"),
            &["kind"],
        )
        .expect("valid alerts_fired_total metric");

        let tracked_orders =
            IntGauge::new("tracked_orders", "Orders with live tracking state")
                .expect("valid tracked_orders metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(transition_rejections_total.clone()))
            .expect("register transition_rejections_total");
        registry
            .register(Box::new(locations_recorded_total.clone()))
            .expect("register locations_recorded_total");
        registry
            .register(Box::new(routing_requests_total.clone()))
            .expect("register routing_requests_total");
        registry
            .register(Box::new(eta_stale_discards_total.clone()))
            .expect("register eta_stale_discards_total");
        registry
            .register(Box::new(alerts_fired_total.clone()))
            .expect("register alerts_fired_total");
        registry
            .register(Box::new(tracked_orders.clone()))
            .expect("register tracked_orders");

        Self {
            registry,
            orders_created_total,
            status_transitions_total,
            transition_rejections_total,
            locations_recorded_total,
            routing_requests_total,
            eta_stale_discards_total,
            alerts_fired_total,
            tracked_orders,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
