use crate::{format_verdict_message, VerdictSink};
use async_trait::async_trait;
use spike_core::{Result, SinkConfig, VerdictEvent};

/// Prints anomalies to stdout, or every observation when verbose.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    enabled: bool,
    verbose: bool,
}

impl ConsoleSink {
    pub fn new(verbose: bool) -> Self {
        Self {
            enabled: true,
            verbose,
        }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self {
            enabled: config.console_enabled,
            verbose: config.verbose,
        }
    }

    pub fn render(&self, event: &VerdictEvent) -> Option<String> {
        (event.anomalous || self.verbose).then(|| format_verdict_message(event))
    }
}

#[async_trait]
impl VerdictSink for ConsoleSink {
    async fn emit(&self, event: &VerdictEvent) -> Result<()> {
        if let Some(line) = self.render(event) {
            println!("{line}");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
