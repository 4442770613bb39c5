use spike_anomaly::DetectorManager;
use spike_core::{event::VerdictEventBuilder, Observation, VerdictEvent};
use spike_notifier::SinkManager;
use std::{collections::BTreeMap, future::Future, sync::Arc};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub observations: u64,
    pub anomalies: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub streams: BTreeMap<String, StreamSummary>,
}

impl RunSummary {
    pub fn total(&self) -> StreamSummary {
        self.streams
            .values()
            .fold(StreamSummary::default(), |acc, s| StreamSummary {
                observations: acc.observations + s.observations,
                anomalies: acc.anomalies + s.anomalies,
                rejected: acc.rejected + s.rejected,
            })
    }

    pub fn log(&self) {
        for (stream, summary) in &self.streams {
            info!(
                stream = %stream,
                observations = summary.observations,
                anomalies = summary.anomalies,
                rejected = summary.rejected,
                "Stream summary"
            );
        }

        let total = self.total();
        info!(
            observations = total.observations,
            anomalies = total.anomalies,
            rejected = total.rejected,
            "Run summary"
        );
    }
}

/// Single consumer that feeds each observation to its stream's detector and
/// forwards the verdict to the sinks.
pub struct Pipeline {
    detectors: Arc<DetectorManager>,
    sinks: SinkManager,
    summary: RunSummary,
}

impl Pipeline {
    pub fn new(detectors: Arc<DetectorManager>, sinks: SinkManager) -> Self {
        Self {
            detectors,
            sinks,
            summary: RunSummary::default(),
        }
    }

    /// Drains `rx` until every producer is gone or `shutdown` resolves.
    pub async fn run<F>(
        mut self,
        mut rx: mpsc::Receiver<Observation>,
        shutdown: F,
    ) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                observation = rx.recv() => match observation {
                    Some(observation) => self.handle(observation).await,
                    None => {
                        info!("All streams finished");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping pipeline");
                    break;
                }
            }
        }

        self.sinks.flush_all().await;
        self.summary
    }

    async fn handle(&mut self, observation: Observation) {
        let summary = self
            .summary
            .streams
            .entry(observation.stream.clone())
            .or_default();
        summary.observations += 1;

        let assessment = match self.detectors.process(&observation.stream, observation.value) {
            Ok(assessment) => assessment,
            Err(e) => {
                warn!(
                    stream = %observation.stream,
                    index = observation.index,
                    "Rejected observation: {}",
                    e
                );
                summary.rejected += 1;
                return;
            }
        };

        if assessment.anomalous {
            summary.anomalies += 1;
            debug!(
                stream = %observation.stream,
                index = observation.index,
                value = observation.value,
                threshold = ?assessment.threshold,
                "Anomaly detected"
            );
        }

        let Some(event) = VerdictEventBuilder::new(observation)
            .with_verdict(assessment.anomalous)
            .with_threshold(assessment.threshold)
            .build()
        else {
            error!("Verdict event built without a verdict");
            return;
        };

        self.sinks.emit_all(&event).await;
    }
}

/// Logs a running anomaly rate every `every` verdicts until the feed closes.
///
/// Returns the number of verdicts seen.
pub async fn report_progress(mut rx: broadcast::Receiver<VerdictEvent>, every: u64) -> u64 {
    let every = every.max(1);
    let mut seen = 0u64;
    let mut anomalies = 0u64;

    loop {
        match rx.recv().await {
            Ok(event) => {
                seen += 1;
                if event.anomalous {
                    anomalies += 1;
                }
                if seen % every == 0 {
                    info!(
                        seen,
                        anomalies,
                        rate = anomalies as f64 / seen as f64,
                        "Progress"
                    );
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress reporter fell behind");
                seen += skipped;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    seen
}
