use crate::error::Result;
use crate::AlertSink;
use async_trait::async_trait;
use pulse_common::types::{format_scope, Alert};
use tracing;

/// Writes one `warn` line per alert to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        tracing::warn!(
            rule = %alert.rule_name,
            severity = %alert.severity,
            scope = %format_scope(&alert.scope),
            metric = alert.metric,
            threshold = alert.threshold,
            "ALERT: {}",
            alert.message
        );
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}
