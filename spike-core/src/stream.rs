use crate::{Observation, Result, SourceConfig, SpikeError};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

/// Noisy baseline generator with occasional injected outliers.
///
/// Iterating yields observations immediately; [`SyntheticStream::run`] paces
/// them onto a channel at the configured interval.
pub struct SyntheticStream {
    name: String,
    config: SourceConfig,
    rng: StdRng,
    index: u64,
}

impl SyntheticStream {
    pub fn new(name: impl Into<String>, config: SourceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            name: name.into(),
            config,
            rng,
            index: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_exhausted(&self) -> bool {
        self.config.length.is_some_and(|length| self.index >= length)
    }

    fn sample_value(&mut self) -> f64 {
        let mut value =
            self.config.baseline + self.config.noise_amplitude * self.rng.random::<f64>();

        if self.rng.random::<f64>() < self.config.anomaly_probability {
            let spike = if self.config.anomaly_max > self.config.anomaly_min {
                self.rng
                    .random_range(self.config.anomaly_min..self.config.anomaly_max)
            } else {
                self.config.anomaly_min
            };
            debug!(stream = %self.name, index = self.index, spike, "Injecting outlier");
            value += spike;
        }

        value
    }

    /// Sends observations to `tx` until the stream is exhausted.
    ///
    /// Returns the number of observations delivered, or a stream error when
    /// the receiving side goes away first.
    pub async fn run(mut self, tx: mpsc::Sender<Observation>) -> Result<u64> {
        let mut ticker = (self.config.interval_ms > 0).then(|| {
            let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        info!(stream = %self.name, length = ?self.config.length, "Started synthetic stream");

        let mut sent = 0;
        while !self.is_exhausted() {
            match ticker.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => tokio::task::yield_now().await,
            }

            let Some(observation) = self.next() else {
                break;
            };

            tx.send(observation).await.map_err(|_| {
                SpikeError::Stream(format!("receiver for stream {} closed", self.name))
            })?;
            sent += 1;
        }

        info!(stream = %self.name, sent, "Synthetic stream finished");
        Ok(sent)
    }
}

impl Iterator for SyntheticStream {
    type Item = Observation;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            return None;
        }

        let value = self.sample_value();
        let observation = Observation::new(self.name.clone(), self.index, value);
        self.index += 1;
        Some(observation)
    }
}
