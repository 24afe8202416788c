use crate::error::{NotifyError, Result};
use crate::AlertSink;
use async_trait::async_trait;
use pulse_common::types::Alert;
use tokio::sync::mpsc;

/// Forwards alerts to an in-process receiver.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Alert>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Alert>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiver that observes it.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        self.tx
            .send(alert.clone())
            .map_err(|_| NotifyError::Closed(self.sink_name().to_string()))
    }

    fn sink_name(&self) -> &str {
        "channel"
    }
}
