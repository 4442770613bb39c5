use crate::VerdictSink;
use async_trait::async_trait;
use spike_core::{Result, VerdictEvent};
use tokio::sync::broadcast;
use tracing::trace;

/// Republishes verdicts to any number of in-process subscribers.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: broadcast::Sender<VerdictEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VerdictEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl VerdictSink for ChannelSink {
    async fn emit(&self, event: &VerdictEvent) -> Result<()> {
        // no subscribers is not a failure
        if self.tx.send(event.clone()).is_err() {
            trace!(index = event.index, "No verdict subscribers");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
