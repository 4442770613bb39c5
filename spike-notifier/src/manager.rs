use crate::VerdictSink;
use spike_core::VerdictEvent;
use tracing::{debug, error};

/// Fans each verdict out to every enabled sink.
///
/// A failing sink is logged and skipped so the others still receive the
/// event.
#[derive(Debug, Default)]
pub struct SinkManager {
    sinks: Vec<Box<dyn VerdictSink>>,
}

impl SinkManager {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn VerdictSink>) {
        debug!(sink = sink.name(), "Registered verdict sink");
        self.sinks.push(sink);
    }

    /// Returns the number of sinks that failed to accept the event.
    pub async fn emit_all(&self, event: &VerdictEvent) -> usize {
        let mut failures = 0;

        for sink in self.sinks.iter().filter(|s| s.is_enabled()) {
            if let Err(e) = sink.emit(event).await {
                error!("Failed to emit verdict via {}: {}", sink.name(), e);
                failures += 1;
            }
        }

        failures
    }

    pub async fn flush_all(&self) {
        for sink in self.sinks.iter().filter(|s| s.is_enabled()) {
            if let Err(e) = sink.flush().await {
                error!("Failed to flush {}: {}", sink.name(), e);
            }
        }
    }

    pub fn enabled_sinks(&self) -> Vec<String> {
        self.sinks
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name().to_string())
            .collect()
    }
}
