use crate::Pipeline;
use pulse_common::types::Alert;
use pulse_common::{PipelineError, Result};
use serde_json::Value;
use tracing;

/// Maximum number of characters of a rejected payload echoed to the log.
const MAX_PAYLOAD_LOG_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub received: u64,
    pub applied: u64,
    pub dropped: u64,
    pub alerts: u64,
}

pub struct AlertEngine<P> {
    pipeline: P,
    stats: EngineStats,
}

impl<P: Pipeline> AlertEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            stats: EngineStats::default(),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Decodes, validates and applies one raw payload.
    ///
    /// Decode and validation failures are returned before the pipeline is
    /// touched, so a rejected payload leaves all state as it was.
    pub fn ingest(&mut self, payload: &str) -> Result<Vec<Alert>> {
        self.stats.received += 1;

        let record = serde_json::from_str::<Value>(payload)
            .map_err(PipelineError::from)
            .and_then(|raw| self.pipeline.validate(&raw));

        match record {
            Ok(record) => {
                let alerts = self.pipeline.apply(&record);
                self.stats.applied += 1;
                self.stats.alerts += alerts.len() as u64;
                Ok(alerts)
            }
            Err(e) => {
                self.stats.dropped += 1;
                Err(e)
            }
        }
    }

    /// Like [`ingest`](Self::ingest), but reports a dropped payload with one
    /// log line and carries on with no alerts.
    pub fn process(&mut self, payload: &str) -> Vec<Alert> {
        match self.ingest(payload) {
            Ok(alerts) => alerts,
            Err(e) => {
                self.log_drop(&e, &truncate_payload(payload, MAX_PAYLOAD_LOG_CHARS));
                Vec::new()
            }
        }
    }

    /// Counts a message the source received but could not hand over as text.
    pub fn reject(&mut self, error: &PipelineError) {
        self.stats.received += 1;
        self.stats.dropped += 1;
        self.log_drop(error, "<unreadable>");
    }

    fn log_drop(&self, error: &PipelineError, payload: &str) {
        tracing::warn!(
            pipeline = self.pipeline.name(),
            kind = error.kind(),
            error = %error,
            payload = %payload,
            "Dropped event"
        );
    }
}

/// Truncate to at most `max` bytes, snapping back to a char boundary.
fn truncate_payload(payload: &str, max: usize) -> String {
    let payload = payload.trim_end();
    if payload.len() <= max {
        return payload.to_string();
    }
    let mut end = max;
    while end > 0 && !payload.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &payload[..end])
}
