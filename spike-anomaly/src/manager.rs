use crate::{
    detector::{validate_config, warn_unusual_config},
    Detector, WindowStats,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use spike_core::{DetectorConfig, Result};
use std::sync::Arc;
use tracing::debug;

/// Outcome of one evaluation: the verdict plus the threshold it was judged
/// against, when detection was active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub anomalous: bool,
    pub threshold: Option<f64>,
}

/// A detector that several producers may feed.
///
/// Every call holds the lock across the whole classify-then-admit step, so
/// concurrent callers never judge against the same pre-admission window.
#[derive(Debug, Clone)]
pub struct SharedDetector {
    inner: Arc<Mutex<Detector>>,
}

impl SharedDetector {
    pub fn new(detector: Detector) -> Self {
        Self {
            inner: Arc::new(Mutex::new(detector)),
        }
    }

    pub fn evaluate_and_admit(&self, value: f64) -> Result<bool> {
        self.inner.lock().evaluate_and_admit(value)
    }

    pub fn stats(&self) -> Option<WindowStats> {
        self.inner.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// One detector per named stream, created on first use.
pub struct DetectorManager {
    detectors: DashMap<String, Detector>,
    config: DetectorConfig,
}

impl DetectorManager {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        validate_config(&config)?;
        warn_unusual_config(&config);

        Ok(Self {
            detectors: DashMap::new(),
            config,
        })
    }

    pub fn process(&self, stream: &str, value: f64) -> Result<Assessment> {
        if let Some(mut detector) = self.detectors.get_mut(stream) {
            return assess(&mut detector, value);
        }

        let mut detector = self.detectors.entry(stream.to_string()).or_insert_with(|| {
            debug!(stream, "Creating detector");
            Detector::build(self.config.clone())
        });

        assess(&mut detector, value)
    }

    pub fn stats(&self, stream: &str) -> Option<WindowStats> {
        self.detectors.get(stream).and_then(|detector| detector.stats())
    }

    pub fn window(&self, stream: &str) -> Option<Vec<f64>> {
        self.detectors
            .get(stream)
            .map(|detector| detector.window().collect())
    }

    pub fn streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self
            .detectors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        streams.sort();
        streams
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

fn assess(detector: &mut Detector, value: f64) -> Result<Assessment> {
    let threshold = if detector.is_warmed_up() {
        detector.stats().map(|stats| stats.threshold)
    } else {
        None
    };

    let anomalous = detector.evaluate_and_admit(value)?;

    Ok(Assessment {
        anomalous,
        threshold,
    })
}
