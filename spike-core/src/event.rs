use crate::{Observation, VerdictEvent};
use uuid::Uuid;

pub struct VerdictEventBuilder {
    id: Uuid,
    observation: Observation,
    anomalous: Option<bool>,
    threshold: Option<f64>,
}

impl VerdictEventBuilder {
    pub fn new(observation: Observation) -> Self {
        Self {
            id: Uuid::new_v4(),
            observation,
            anomalous: None,
            threshold: None,
        }
    }

    pub fn with_verdict(mut self, anomalous: bool) -> Self {
        self.anomalous = Some(anomalous);
        self
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns `None` until a verdict has been set.
    pub fn build(self) -> Option<VerdictEvent> {
        Some(VerdictEvent {
            id: self.id,
            stream: self.observation.stream,
            index: self.observation.index,
            timestamp: self.observation.timestamp,
            value: self.observation.value,
            anomalous: self.anomalous?,
            threshold: self.threshold,
        })
    }
}
