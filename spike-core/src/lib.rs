pub mod event;
pub mod model;
pub mod stream;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub use model::{Observation, VerdictEvent};

#[derive(Debug, Error)]
pub enum SpikeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: {0} is not a finite value")]
    InvalidInput(f64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

pub type Result<T> = std::result::Result<T, SpikeError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub detector: DetectorConfig,
    pub source: SourceConfig,
    pub sink: SinkConfig,
}

/// Window and threshold settings shared by every detector in a run.
///
/// A negative `sensitivity_factor` is accepted but lets the threshold drop
/// below the window mean, so below-average points can be flagged too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub window_capacity: usize,
    pub sensitivity_factor: f64,
    pub min_warm_up: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_capacity: 20,
            sensitivity_factor: 2.5,
            min_warm_up: 5,
        }
    }
}

impl DetectorConfig {
    pub fn new(window_capacity: usize, sensitivity_factor: f64) -> Self {
        Self {
            window_capacity,
            sensitivity_factor,
            ..Self::default()
        }
    }

    pub fn with_min_warm_up(mut self, min_warm_up: usize) -> Self {
        self.min_warm_up = min_warm_up;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Number of independent streams to generate.
    pub streams: usize,
    /// Observations per stream; `None` runs until shutdown.
    pub length: Option<u64>,
    /// Delay between observations, 0 disables pacing.
    pub interval_ms: u64,
    pub baseline: f64,
    pub noise_amplitude: f64,
    pub anomaly_probability: f64,
    pub anomaly_min: f64,
    pub anomaly_max: f64,
    pub seed: Option<u64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            streams: 1,
            length: Some(500),
            interval_ms: 20,
            baseline: 10.0,
            noise_amplitude: 5.0,
            anomaly_probability: 0.02,
            anomaly_min: 10.0,
            anomaly_max: 20.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub console_enabled: bool,
    /// Print every observation, not only anomalies.
    pub verbose: bool,
    pub json_lines_path: Option<PathBuf>,
    pub broadcast_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            verbose: false,
            json_lines_path: None,
            broadcast_capacity: 1024,
        }
    }
}
