pub mod actors;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod buffer;
pub mod config;
pub mod pipeline;
pub mod storage;
pub mod util;
pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound sample as submitted by a collector.
///
/// The timestamp is optional; samples without one are stamped with their
/// arrival time when they are turned into a [`ResourceSample`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePayload {
    pub computer_id: Uuid,
    pub cpu: f64,
    pub memory: f64,
    pub network_in: f64,
    pub network_out: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SamplePayload {
    /// Stamp the payload, using `arrival` when no timestamp was given
    pub fn into_sample(self, arrival: DateTime<Utc>) -> ResourceSample {
        ResourceSample {
            computer_id: self.computer_id,
            cpu: self.cpu,
            memory: self.memory,
            network_in: self.network_in,
            network_out: self.network_out,
            timestamp: self.timestamp.unwrap_or(arrival),
        }
    }
}

/// One timestamped resource-usage reading from a monitored host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Host the reading belongs to
    pub computer_id: Uuid,

    /// CPU usage in percent (0-100)
    pub cpu: f64,

    /// Memory usage in percent (0-100)
    pub memory: f64,

    /// Inbound network rate
    pub network_in: f64,

    /// Outbound network rate
    pub network_out: f64,

    pub timestamp: DateTime<Utc>,
}

/// Kind of threshold crossing an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertCategory {
    HighCpu,
    HighMemory,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::HighCpu => "high-cpu",
            AlertCategory::HighMemory => "high-memory",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high-cpu" => Ok(AlertCategory::HighCpu),
            "high-memory" => Ok(AlertCategory::HighMemory),
            other => Err(format!("unknown alert category: {other}")),
        }
    }
}

/// Alert raised for a sample that crossed a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub computer_id: Uuid,
    pub category: AlertCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,

    /// Flipped only by an explicit resolution action
    #[serde(default)]
    pub resolved: bool,
}
