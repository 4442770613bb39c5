pub mod detector;
pub mod manager;

pub use detector::Detector;
pub use manager::{Assessment, DetectorManager, SharedDetector};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Mean, spread and derived threshold of a window at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub len: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
}

/// Most recent `capacity` values in insertion order.
///
/// Mean and spread stay finite for any finite contents. The threshold itself
/// can still overflow to infinity when the mean is near `f64::MAX` and the
/// sensitivity is large, in which case nothing is flagged.
#[derive(Debug, Clone)]
pub struct Window {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted oldest value when full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.values.len() >= self.capacity {
            self.values.pop_front()
        } else {
            None
        };

        self.values.push_back(value);
        evicted
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }

        let scale = self.scale();
        Some(self.scaled(scale).mean() * scale)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }

        let scale = self.scale();
        Some(self.scaled(scale).population_std_dev() * scale)
    }

    /// Power of two that brings every value into `[-2, 2]`.
    ///
    /// Statistics are computed on the scaled values so squared deviations of
    /// large inputs (around 1e300) do not overflow. Dividing by a power of
    /// two is exact, so ordinary windows get bit-identical results.
    fn scale(&self) -> f64 {
        let max_abs = self.values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_abs > 1.0 {
            max_abs.log2().floor().exp2()
        } else {
            1.0
        }
    }

    fn scaled(&self, scale: f64) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(move |v| v / scale)
    }

    /// `mean + sensitivity * std_dev`, or `None` for an empty window.
    pub fn stats(&self, sensitivity: f64) -> Option<WindowStats> {
        let mean = self.mean()?;
        let std_dev = self.std_dev()?;

        Some(WindowStats {
            len: self.values.len(),
            mean,
            std_dev,
            threshold: mean + sensitivity * std_dev,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
