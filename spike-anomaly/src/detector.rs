use crate::{Window, WindowStats};
use spike_core::{DetectorConfig, Result, SpikeError};
use tracing::warn;

/// Upper-tail anomaly detector over a sliding window.
///
/// Each value is judged against the window as it stood before the value
/// arrived, then admitted whatever the verdict. Detection stays suppressed
/// until the window holds `min_warm_up` values.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
    window: Window,
}

impl Detector {
    /// Fails with [`SpikeError::InvalidConfiguration`] for a zero capacity,
    /// a zero warm-up count or a non-finite sensitivity.
    ///
    /// A negative sensitivity is accepted: the threshold may then sit below
    /// the mean, so below-average values can be flagged.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        validate_config(&config)?;
        warn_unusual_config(&config);
        Ok(Self::build(config))
    }

    pub fn with_params(window_capacity: usize, sensitivity_factor: f64) -> Result<Self> {
        Self::new(DetectorConfig::new(window_capacity, sensitivity_factor))
    }

    pub(crate) fn build(config: DetectorConfig) -> Self {
        Self {
            window: Window::new(config.window_capacity),
            config,
        }
    }

    /// Classifies `value` against the current window, then admits it.
    ///
    /// Non-finite values are rejected with [`SpikeError::InvalidInput`] and
    /// leave the window untouched.
    pub fn evaluate_and_admit(&mut self, value: f64) -> Result<bool> {
        let verdict = self.would_flag(value)?;
        self.window.push(value);
        Ok(verdict)
    }

    /// Same classification as [`Detector::evaluate_and_admit`] without
    /// admitting the value.
    pub fn would_flag(&self, value: f64) -> Result<bool> {
        if !value.is_finite() {
            return Err(SpikeError::InvalidInput(value));
        }

        if !self.is_warmed_up() {
            return Ok(false);
        }

        Ok(self.stats().is_some_and(|stats| value > stats.threshold))
    }

    pub fn stats(&self) -> Option<WindowStats> {
        self.window.stats(self.config.sensitivity_factor)
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.len() >= self.config.min_warm_up
    }

    pub fn window(&self) -> impl Iterator<Item = f64> + '_ {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.window_capacity
    }

    pub fn sensitivity(&self) -> f64 {
        self.config.sensitivity_factor
    }

    pub fn min_warm_up(&self) -> usize {
        self.config.min_warm_up
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

pub fn validate_config(config: &DetectorConfig) -> Result<()> {
    if config.window_capacity == 0 {
        return Err(SpikeError::InvalidConfiguration(
            "window capacity must be positive".to_string(),
        ));
    }

    if config.min_warm_up == 0 {
        return Err(SpikeError::InvalidConfiguration(
            "minimum warm-up count must be positive".to_string(),
        ));
    }

    if !config.sensitivity_factor.is_finite() {
        return Err(SpikeError::InvalidConfiguration(format!(
            "sensitivity factor must be finite, got {}",
            config.sensitivity_factor
        )));
    }

    Ok(())
}

pub(crate) fn warn_unusual_config(config: &DetectorConfig) {
    if config.sensitivity_factor < 0.0 {
        warn!(
            sensitivity = config.sensitivity_factor,
            "Negative sensitivity factor, below-average values may be flagged"
        );
    }

    if config.min_warm_up > config.window_capacity {
        warn!(
            min_warm_up = config.min_warm_up,
            window_capacity = config.window_capacity,
            "Warm-up count exceeds window capacity, detection will never activate"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(capacity: usize, sensitivity: f64) -> Detector {
        Detector::with_params(capacity, sensitivity).unwrap()
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = Detector::with_params(0, 2.5);
        assert!(matches!(result, Err(SpikeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_zero_warm_up() {
        let result = Detector::new(DetectorConfig::default().with_min_warm_up(0));
        assert!(matches!(result, Err(SpikeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_non_finite_sensitivity() {
        for sensitivity in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = Detector::with_params(10, sensitivity);
            assert!(matches!(result, Err(SpikeError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn test_accepts_zero_and_negative_sensitivity() {
        assert!(Detector::with_params(10, 0.0).is_ok());
        assert!(Detector::with_params(10, -1.0).is_ok());
    }

    #[test]
    fn test_warm_up_never_flags() {
        let mut d = detector(20, 2.5);
        for value in [1.0, 1e9, -1e9, 1e12, 0.0] {
            assert!(!d.evaluate_and_admit(value).unwrap());
        }
        assert_eq!(d.len(), 5);
        assert!(d.is_warmed_up());
    }

    #[test]
    fn test_warm_up_independent_of_capacity() {
        let mut d = Detector::new(DetectorConfig::new(3, 0.0).with_min_warm_up(5)).unwrap();
        for _ in 0..10 {
            assert!(!d.evaluate_and_admit(1.0).unwrap());
        }
        // window never reaches five values, so detection stays off
        assert!(!d.evaluate_and_admit(1e9).unwrap());
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_custom_warm_up_moves_activation() {
        let mut d = Detector::new(DetectorConfig::new(10, 0.0).with_min_warm_up(3)).unwrap();
        let verdicts: Vec<bool> = [1.0, 1.0, 1.0, 5.0]
            .into_iter()
            .map(|value| d.evaluate_and_admit(value).unwrap())
            .collect();
        assert_eq!(verdicts, vec![false, false, false, true]);
    }

    #[test]
    fn test_warm_up_equal_to_capacity() {
        let mut d = Detector::new(DetectorConfig::new(4, 0.0).with_min_warm_up(4)).unwrap();
        for value in [1.0, 1.0, 1.0, 100.0] {
            assert!(!d.evaluate_and_admit(value).unwrap());
        }
        assert!(d.is_warmed_up());

        // window is now [1, 1, 1, 100] with mean 25.75
        assert!(d.evaluate_and_admit(50.0).unwrap());
        assert_eq!(d.len(), 4);
        assert!(!d.evaluate_and_admit(1.0).unwrap());
    }

    #[test]
    fn test_huge_values_still_classified() {
        let mut d = Detector::new(DetectorConfig::new(5, 0.0)).unwrap();
        for value in [1e300, 1.5e300, 1e300, 1.5e300, 1e300] {
            d.evaluate_and_admit(value).unwrap();
        }

        let stats = d.stats().unwrap();
        assert!(stats.threshold.is_finite());
        assert!(d.would_flag(1.4e300).unwrap());
        assert!(!d.would_flag(1.1e300).unwrap());
    }

    #[test]
    fn test_window_bound() {
        let mut d = detector(7, 2.5);
        for i in 0..100 {
            d.evaluate_and_admit(i as f64).unwrap();
            assert!(d.len() <= 7);
        }
        assert_eq!(d.len(), 7);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut d = detector(3, 2.5);
        for value in [1.0, 2.0, 3.0, 4.0] {
            d.evaluate_and_admit(value).unwrap();
        }
        assert_eq!(d.window().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            assert!(!d.evaluate_and_admit(10.0).unwrap());
        }

        let stats = d.stats().unwrap();
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std_dev, 0.0);

        assert!(d.evaluate_and_admit(10.0001).unwrap());
        assert!(!d.evaluate_and_admit(10.0).unwrap());
    }

    #[test]
    fn test_value_at_threshold_is_normal() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            d.evaluate_and_admit(10.0).unwrap();
        }
        assert!(!d.evaluate_and_admit(10.0).unwrap());
    }

    #[test]
    fn test_lower_tail_not_flagged() {
        let mut d = detector(10, 2.5);
        for value in [10.0, 11.0, 10.0, 11.0, 10.0, 11.0] {
            d.evaluate_and_admit(value).unwrap();
        }
        assert!(!d.evaluate_and_admit(-1e6).unwrap());
    }

    #[test]
    fn test_zero_sensitivity_flags_above_mean() {
        let mut d = detector(10, 0.0);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            d.evaluate_and_admit(value).unwrap();
        }
        assert!(d.evaluate_and_admit(3.5).unwrap());
        assert!(!d.evaluate_and_admit(1.0).unwrap());
    }

    #[test]
    fn test_negative_sensitivity_flags_below_mean() {
        let mut d = detector(10, -1.0);
        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            d.evaluate_and_admit(value).unwrap();
        }
        // threshold = 3 - sqrt(2)
        assert!(d.would_flag(2.0).unwrap());
    }

    #[test]
    fn test_monotonic_sensitivity() {
        let history = [9.0, 12.0, 10.5, 11.0, 8.5, 13.0, 10.0, 9.5];
        let candidates = [10.0, 11.5, 12.5, 13.5, 15.0, 20.0];
        let sensitivities = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 5.0];

        for candidate in candidates {
            let mut previous = true;
            for sensitivity in sensitivities {
                let mut d = detector(20, sensitivity);
                for value in history {
                    d.evaluate_and_admit(value).unwrap();
                }
                let verdict = d.would_flag(candidate).unwrap();
                assert!(previous || !verdict, "k={sensitivity} flipped {candidate} to anomalous");
                previous = verdict;
            }
        }
    }

    #[test]
    fn test_constant_input_never_flags() {
        for constant in [0.0, -3.5, 42.0, 1e6] {
            let mut d = detector(20, 2.5);
            for _ in 0..200 {
                assert!(!d.evaluate_and_admit(constant).unwrap());
            }
        }
    }

    #[test]
    fn test_self_normalization() {
        let capacity = 20;
        let mut d = detector(capacity, 2.5);
        for i in 0..capacity {
            d.evaluate_and_admit(if i % 2 == 0 { 10.0 } else { 11.0 }).unwrap();
        }

        assert!(d.evaluate_and_admit(50.0).unwrap());
        for _ in 1..capacity {
            d.evaluate_and_admit(50.0).unwrap();
        }

        assert!(d.window().all(|value| value == 50.0));
        assert!(!d.evaluate_and_admit(50.0).unwrap());
    }

    #[test]
    fn test_anomalies_are_admitted() {
        let mut d = detector(10, 2.5);
        for _ in 0..5 {
            d.evaluate_and_admit(1.0).unwrap();
        }
        assert!(d.evaluate_and_admit(100.0).unwrap());
        assert_eq!(d.window().last(), Some(100.0));
    }

    #[test]
    fn test_non_finite_input_rejected_without_mutation() {
        let mut d = detector(5, 2.5);
        for value in [1.0, 2.0, 3.0] {
            d.evaluate_and_admit(value).unwrap();
        }

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = d.evaluate_and_admit(value);
            assert!(matches!(result, Err(SpikeError::InvalidInput(_))));
        }

        assert_eq!(d.window().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_would_flag_does_not_admit() {
        let mut d = detector(5, 2.5);
        for _ in 0..5 {
            d.evaluate_and_admit(10.0).unwrap();
        }
        assert!(d.would_flag(11.0).unwrap());
        assert!(d.would_flag(11.0).unwrap());
        assert_eq!(d.len(), 5);
        assert!(d.window().all(|value| value == 10.0));
    }
}
