use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::LocationEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "sla:breach")]
    SlaBreach,
    #[serde(rename = "driver:stopped")]
    DriverStopped,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::SlaBreach => "sla:breach",
            AlertKind::DriverStopped => "driver:stopped",
        }
    }

    /// Order-facing notice code for this condition.
    pub fn notice_code(self) -> &'static str {
        match self {
            AlertKind::SlaBreach => "SLA_BREACH",
            AlertKind::DriverStopped => "DRIVER_STOPPED",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-facing alert published on the admin topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub order_id: u64,
    pub kind: AlertKind,
    /// Elapsed minutes that triggered the condition.
    pub minutes: i64,
    pub raised_at: DateTime<Utc>,
}

/// Per-order de-duplication memo. A condition that has fired stays
/// latched until an operator clears it.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    pub prev: Option<LocationEntry>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub sla_at: Option<DateTime<Utc>>,
}
