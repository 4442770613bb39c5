use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single measurement taken from a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub stream: String,
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(stream: impl Into<String>, index: u64, value: f64) -> Self {
        Self {
            stream: stream.into(),
            index,
            timestamp: Utc::now(),
            value,
        }
    }
}

/// The classification of one observation, as handed to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictEvent {
    pub id: Uuid,
    pub stream: String,
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub anomalous: bool,
    /// Threshold the value was compared against; absent during warm-up.
    pub threshold: Option<f64>,
}
