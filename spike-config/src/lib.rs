use config::{Config, Environment, File};
use spike_anomaly::detector::validate_config;
use spike_core::{MonitorConfig, Result, SpikeError};
use std::path::Path;
use tracing::info;

/// Environment variables override file settings, e.g.
/// `SPIKE_MONITOR_DETECTOR__WINDOW_CAPACITY=50`.
pub const ENV_PREFIX: &str = "SPIKE_MONITOR";

pub struct ConfigManager {
    monitor_config: MonitorConfig,
}

impl ConfigManager {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let monitor_config = Self::load(Some(path))?;

        info!(path = %path.display(), "Configuration loaded successfully");

        Ok(Self { monitor_config })
    }

    pub fn from_env() -> Result<Self> {
        let monitor_config = Self::load(None)?;

        info!("Configuration loaded from environment");

        Ok(Self { monitor_config })
    }

    fn load(path: Option<&Path>) -> Result<MonitorConfig> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| SpikeError::Configuration(e.to_string()))
    }

    pub fn get_config(&self) -> &MonitorConfig {
        &self.monitor_config
    }

    pub fn get_config_mut(&mut self) -> &mut MonitorConfig {
        &mut self.monitor_config
    }

    pub fn into_config(self) -> MonitorConfig {
        self.monitor_config
    }

    pub fn validate(&self) -> Result<()> {
        validate_config(&self.monitor_config.detector)?;

        let source = &self.monitor_config.source;

        if source.streams == 0 {
            return Err(SpikeError::Configuration(
                "At least one stream must be configured".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&source.anomaly_probability) {
            return Err(SpikeError::Configuration(format!(
                "Anomaly probability must be within [0, 1], got {}",
                source.anomaly_probability
            )));
        }

        if !source.baseline.is_finite() || !source.noise_amplitude.is_finite() {
            return Err(SpikeError::Configuration(
                "Baseline and noise amplitude must be finite".to_string(),
            ));
        }

        if !source.anomaly_min.is_finite()
            || !source.anomaly_max.is_finite()
            || !(source.anomaly_max - source.anomaly_min).is_finite()
        {
            return Err(SpikeError::Configuration(format!(
                "Anomaly range must be finite, got {}..{}",
                source.anomaly_min, source.anomaly_max
            )));
        }

        if source.noise_amplitude < 0.0 {
            return Err(SpikeError::Configuration(
                "Noise amplitude must not be negative".to_string(),
            ));
        }

        if source.anomaly_min > source.anomaly_max {
            return Err(SpikeError::Configuration(format!(
                "Anomaly range is empty: {} > {}",
                source.anomaly_min, source.anomaly_max
            )));
        }

        if self.monitor_config.sink.broadcast_capacity == 0 {
            return Err(SpikeError::Configuration(
                "Broadcast capacity must be positive".to_string(),
            ));
        }

        info!("Configuration validation passed");
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.monitor_config)
            .map_err(|e| SpikeError::Configuration(e.to_string()))?;

        std::fs::write(path, yaml)?;

        info!("Configuration saved to file");
        Ok(())
    }
}
