use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    /// Path of the durable order journal snapshot.
    pub data_path: String,
    /// Base URL of the OSRM-compatible routing service.
    pub routing_url: String,
    pub sla_breach_minutes: i64,
    pub driver_stopped_minutes: i64,
    pub driver_stopped_radius_m: f64,
    pub location_history_cap: usize,
    /// Minutes after delivery before tracking state is dropped.
    pub retention_minutes: i64,
    pub retention_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            data_path: env::var("DATA_PATH").unwrap_or_else(|_| "data/orders.json".to_string()),
            routing_url: env::var("ROUTING_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000".to_string()),
            sla_breach_minutes: parse_or_default("SLA_BREACH_MINUTES", 45)?,
            driver_stopped_minutes: parse_or_default("DRIVER_STOPPED_MINUTES", 8)?,
            driver_stopped_radius_m: parse_or_default("DRIVER_STOPPED_RADIUS_M", 50.0)?,
            location_history_cap: parse_or_default("LOCATION_HISTORY_CAP", 200)?,
            retention_minutes: parse_or_default("RETENTION_MINUTES", 120)?,
            retention_sweep_secs: parse_or_default("RETENTION_SWEEP_SECS", 60)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
