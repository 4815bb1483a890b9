pub mod export;

use serde::Serialize;

use crate::models::location::{GeoPoint, LocationEntry};

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_km(a, b) * 1_000.0
}

/// Aggregate view of one order's track: path length over consecutive
/// samples, wall-clock span, and the resulting average speed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackSummary {
    pub points: usize,
    pub distance_m: f64,
    pub duration_sec: i64,
    pub avg_speed_kmh: Option<f64>,
}

pub fn summarize_track(points: &[LocationEntry]) -> TrackSummary {
    let distance_m: f64 = points
        .windows(2)
        .map(|pair| haversine_m(&pair[0].point(), &pair[1].point()))
        .sum();

    // Samples arrive in recording order but timestamps may not be
    // strictly increasing; a negative span is clamped to zero.
    let duration_sec = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (last.recorded_at - first.recorded_at)
            .num_seconds()
            .max(0),
        _ => 0,
    };

    let avg_speed_kmh = if duration_sec > 0 {
        Some(distance_m / 1_000.0 / (duration_sec as f64 / 3_600.0))
    } else {
        None
    };

    TrackSummary {
        points: points.len(),
        distance_m,
        duration_sec,
        avg_speed_kmh,
    }
}
