//! Read-side projection over the order store. Everything here is
//! recomputed per call from the orders it is handed; nothing is cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MetricsQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub merchant_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Kpi {
    pub total: usize,
    pub delivered: usize,
    /// Percentage, rounded to the nearest integer; 0 for an empty set.
    pub completion_rate: i64,
}

/// Average stage durations in whole minutes. A stage with no completed
/// observations is `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageMinutes {
    pub paid_to_confirmed: Option<i64>,
    pub confirmed_to_assigned: Option<i64>,
    pub assigned_to_picked: Option<i64>,
    pub picked_to_delivered: Option<i64>,
    pub total_paid_to_delivered: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreRow {
    pub merchant_id: u64,
    pub count: usize,
    pub delivered: usize,
    pub stages: StageMinutes,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverRow {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub count: usize,
    pub delivered: usize,
    pub stages: StageMinutes,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResult {
    pub kpi: Kpi,
    pub stores: Vec<StoreRow>,
    pub drivers: Vec<DriverRow>,
}

/// Per-order stage spans in milliseconds, `None` when either endpoint
/// is missing from the timeline.
#[derive(Debug, Clone, Copy, Default)]
struct StageSpansMs {
    paid_to_confirmed: Option<i64>,
    confirmed_to_assigned: Option<i64>,
    assigned_to_picked: Option<i64>,
    picked_to_delivered: Option<i64>,
    total_paid_to_delivered: Option<i64>,
}

fn stage_spans(order: &Order) -> StageSpansMs {
    let at = |status: OrderStatus| order.status_at(status);
    let span = |from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>| match (from, to) {
        (Some(from), Some(to)) => Some((to - from).num_milliseconds()),
        _ => None,
    };

    let paid = at(OrderStatus::Paid);
    let confirmed = at(OrderStatus::Confirmed);
    let assigned = at(OrderStatus::Assigned);
    let picked = at(OrderStatus::PickedUp);
    let delivered = at(OrderStatus::Delivered);

    StageSpansMs {
        paid_to_confirmed: span(paid, confirmed),
        confirmed_to_assigned: span(confirmed, assigned),
        assigned_to_picked: span(assigned, picked),
        picked_to_delivered: span(picked, delivered),
        total_paid_to_delivered: span(paid, delivered),
    }
}

/// Running average that only counts present values.
#[derive(Debug, Clone, Copy, Default)]
struct StageAvg {
    sum_ms: i64,
    samples: usize,
}

impl StageAvg {
    fn add(&mut self, span_ms: Option<i64>) {
        if let Some(span_ms) = span_ms {
            self.sum_ms += span_ms;
            self.samples += 1;
        }
    }

    fn minutes(&self) -> Option<i64> {
        if self.samples == 0 {
            return None;
        }
        let avg_ms = self.sum_ms as f64 / self.samples as f64;
        Some(((avg_ms / 60_000.0).round() as i64).max(0))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RowAcc {
    count: usize,
    delivered: usize,
    paid_to_confirmed: StageAvg,
    confirmed_to_assigned: StageAvg,
    assigned_to_picked: StageAvg,
    picked_to_delivered: StageAvg,
    total_paid_to_delivered: StageAvg,
}

impl RowAcc {
    fn add(&mut self, order: &Order) {
        self.count += 1;
        if order.status == OrderStatus::Delivered {
            self.delivered += 1;
        }
        let spans = stage_spans(order);
        self.paid_to_confirmed.add(spans.paid_to_confirmed);
        self.confirmed_to_assigned.add(spans.confirmed_to_assigned);
        self.assigned_to_picked.add(spans.assigned_to_picked);
        self.picked_to_delivered.add(spans.picked_to_delivered);
        self.total_paid_to_delivered
            .add(spans.total_paid_to_delivered);
    }

    fn stages(&self) -> StageMinutes {
        StageMinutes {
            paid_to_confirmed: self.paid_to_confirmed.minutes(),
            confirmed_to_assigned: self.confirmed_to_assigned.minutes(),
            assigned_to_picked: self.assigned_to_picked.minutes(),
            picked_to_delivered: self.picked_to_delivered.minutes(),
            total_paid_to_delivered: self.total_paid_to_delivered.minutes(),
        }
    }
}

pub fn compute(orders: &[Order], query: &MetricsQuery) -> MetricsResult {
    let selected: Vec<&Order> = orders
        .iter()
        .filter(|order| {
            query.start.is_none_or(|start| order.created_at >= start)
                && query.end.is_none_or(|end| order.created_at <= end)
                && query
                    .merchant_id
                    .is_none_or(|merchant| order.merchant_id == Some(merchant))
        })
        .collect();

    let total = selected.len();
    let delivered = selected
        .iter()
        .filter(|order| order.status == OrderStatus::Delivered)
        .count();
    let completion_rate = if total == 0 {
        0
    } else {
        (delivered as f64 / total as f64 * 100.0).round() as i64
    };

    let mut stores: BTreeMap<u64, RowAcc> = BTreeMap::new();
    let mut drivers: BTreeMap<Uuid, (String, RowAcc)> = BTreeMap::new();

    for order in &selected {
        if let Some(merchant_id) = order.merchant_id {
            stores.entry(merchant_id).or_default().add(order);
        }
        if let Some(driver) = &order.driver {
            drivers
                .entry(driver.id)
                .or_insert_with(|| (driver.name.clone(), RowAcc::default()))
                .1
                .add(order);
        }
    }

    MetricsResult {
        kpi: Kpi {
            total,
            delivered,
            completion_rate,
        },
        stores: stores
            .into_iter()
            .map(|(merchant_id, acc)| StoreRow {
                merchant_id,
                count: acc.count,
                delivered: acc.delivered,
                stages: acc.stages(),
            })
            .collect(),
        drivers: drivers
            .into_iter()
            .map(|(driver_id, (driver_name, acc))| DriverRow {
                driver_id,
                driver_name,
                count: acc.count,
                delivered: acc.delivered,
                stages: acc.stages(),
            })
            .collect(),
    }
}

/// Ascending by end-to-end average; rows without one sort last; ties
/// broken by more deliveries first.
fn ranking_key(total_avg: Option<i64>, delivered: usize) -> (i64, i64) {
    (total_avg.unwrap_or(i64::MAX), -(delivered as i64))
}

pub fn store_ranking(mut rows: Vec<StoreRow>) -> Vec<StoreRow> {
    rows.sort_by_key(|row| ranking_key(row.stages.total_paid_to_delivered, row.delivered));
    rows
}

pub fn driver_ranking(mut rows: Vec<DriverRow>) -> Vec<DriverRow> {
    rows.sort_by_key(|row| ranking_key(row.stages.total_paid_to_delivered, row.delivered));
    rows
}
