use crate::config::SinkConfig;
use crate::error::Result;
use crate::AlertSink;
use pulse_common::types::{Alert, Severity};
use tracing;

/// A registered sink and the lowest severity it receives.
struct RoutedSink {
    sink: Box<dyn AlertSink>,
    min_severity: Severity,
}

impl RoutedSink {
    fn accepts(&self, alert: &Alert) -> bool {
        alert.severity >= self.min_severity
    }
}

/// Fans alerts out to every sink whose minimum severity they meet.
///
/// Delivery failures are logged and never stop the other sinks.
#[derive(Default)]
pub struct SinkManager {
    sinks: Vec<RoutedSink>,
}

impl SinkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every configured sink, failing on the first one that cannot be opened.
    pub async fn from_configs(configs: &[SinkConfig]) -> Result<Self> {
        let mut manager = Self::new();
        for config in configs {
            let sink = config.build().await?;
            tracing::info!(
                sink = sink.sink_name(),
                min_severity = %config.min_severity(),
                "Sink registered"
            );
            manager.add(sink, config.min_severity());
        }
        Ok(manager)
    }

    pub fn add(&mut self, sink: Box<dyn AlertSink>, min_severity: Severity) {
        self.sinks.push(RoutedSink { sink, min_severity });
    }

    /// Sends `alert` to each routed sink. Returns how many accepted it.
    pub async fn dispatch(&self, alert: &Alert) -> usize {
        let mut delivered = 0;
        for routed in self.sinks.iter().filter(|r| r.accepts(alert)) {
            match routed.sink.send(alert).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::error!(
                        sink = routed.sink.sink_name(),
                        rule = %alert.rule_name,
                        error = %e,
                        "Failed to deliver alert"
                    );
                }
            }
        }
        delivered
    }

    pub async fn dispatch_all(&self, alerts: &[Alert]) {
        for alert in alerts {
            self.dispatch(alert).await;
        }
    }

    /// Flushes every sink. Returns the number of sinks that failed.
    pub async fn flush_all(&self) -> usize {
        let mut failed = 0;
        for RoutedSink { sink, .. } in &self.sinks {
            if let Err(e) = sink.flush().await {
                failed += 1;
                tracing::error!(sink = sink.sink_name(), error = %e, "Failed to flush sink");
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|r| r.sink.sink_name()).collect()
    }
}
