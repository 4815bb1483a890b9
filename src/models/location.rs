use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One courier position sample. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEntry {
    pub order_id: u64,
    pub lat: f64,
    pub lng: f64,
    /// Reported speed in km/h, when the device supplies one.
    pub speed: Option<f64>,
    /// Compass heading in degrees.
    pub heading: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub driver_id: Option<Uuid>,
}

impl LocationEntry {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Latest arrival estimate for one order. Replaced wholesale on each
/// accepted routing response, never merged field-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaData {
    pub eta_min: i64,
    pub distance_m: f64,
    pub updated_at: DateTime<Utc>,
    pub geometry: Option<String>,
}
