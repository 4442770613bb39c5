pub mod channel;
pub mod console;
pub mod json_lines;
pub mod manager;

pub use channel::ChannelSink;
pub use console::ConsoleSink;
pub use json_lines::JsonLinesSink;
pub use manager::SinkManager;

use async_trait::async_trait;
use spike_core::{Result, VerdictEvent};
use std::fmt::Debug;

/// Destination for verdict events. Sinks never see detector state.
#[async_trait]
pub trait VerdictSink: Send + Sync + Debug {
    async fn emit(&self, event: &VerdictEvent) -> Result<()>;

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
}

pub fn format_verdict_message(event: &VerdictEvent) -> String {
    if event.anomalous {
        format!(
            "[{}] Anomaly detected at {}: {}",
            event.stream, event.index, event.value
        )
    } else {
        format!("[{}] {}: {}", event.stream, event.index, event.value)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_anomaly_message() {
        let event = test_util::event(42, 27.5, true);
        assert_eq!(
            format_verdict_message(&event),
            "[sensor] Anomaly detected at 42: 27.5"
        );
    }

    #[test]
    fn test_format_normal_message() {
        let event = test_util::event(3, 11.0, false);
        assert_eq!(format_verdict_message(&event), "[sensor] 3: 11");
    }
}
