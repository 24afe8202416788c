//! Alert delivery with pluggable sinks.
//!
//! Alerts produced by a pipeline are routed to one or more [`AlertSink`]
//! implementations based on severity. Built-in sinks write to the log, to a
//! JSON-lines stream (file or stdout), or to an in-process channel.

pub mod config;
pub mod error;
pub mod manager;
pub mod sinks;


use async_trait::async_trait;
use error::Result;
use pulse_common::types::Alert;

/// A destination for alerts.
///
/// Sinks are created from [`config::SinkConfig`] or directly, and registered
/// with a [`manager::SinkManager`] together with a minimum severity.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Delivers one alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be written or forwarded.
    async fn send(&self, alert: &Alert) -> Result<()>;

    /// Pushes out anything buffered. Called on shutdown.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Returns the sink type name (e.g., `"log"`, `"json_lines"`).
    fn sink_name(&self) -> &str;
}
