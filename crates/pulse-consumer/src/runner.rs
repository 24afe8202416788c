use crate::source::MessageSource;
use pulse_alert::engine::{AlertEngine, EngineStats};
use pulse_alert::Pipeline;
use pulse_common::Result;
use pulse_notify::manager::SinkManager;
use std::future::Future;
use tracing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: EngineStats,
    /// True when the loop ended because `shutdown` completed.
    pub interrupted: bool,
    pub sink_flush_failures: usize,
}

/// Consumes `source` until it ends or `shutdown` completes.
///
/// Each payload is fully processed and its alerts dispatched before the next
/// one is read. Whatever ends the loop, the source is closed and every sink
/// flushed before returning.
///
/// # Errors
///
/// Returns the source's transport error, after the orderly close.
pub async fn run<P, S, F>(
    engine: &mut AlertEngine<P>,
    source: &mut S,
    sinks: &SinkManager,
    shutdown: F,
) -> Result<RunSummary>
where
    P: Pipeline,
    S: MessageSource + ?Sized,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tracing::info!(
        pipeline = engine.pipeline().name(),
        source = source.source_name(),
        sinks = sinks.len(),
        "Consumer started"
    );

    let mut interrupted = false;
    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                interrupted = true;
                break Ok(());
            }
            next = source.next_message() => match next {
                Ok(Some(payload)) => {
                    let alerts = engine.process(&payload);
                    sinks.dispatch_all(&alerts).await;
                }
                Ok(None) => break Ok(()),
                Err(e) if e.is_recoverable() => engine.reject(&e),
                Err(e) => break Err(e),
            }
        }
    };

    source.close().await;
    let sink_flush_failures = sinks.flush_all().await;
    let stats = engine.stats();

    tracing::info!(
        pipeline = engine.pipeline().name(),
        received = stats.received,
        applied = stats.applied,
        dropped = stats.dropped,
        alerts = stats.alerts,
        "Consumer stopped"
    );

    if let Err(e) = &outcome {
        tracing::error!(error = %e, "Source failed");
    }

    outcome.map(|()| RunSummary {
        stats,
        interrupted,
        sink_flush_failures,
    })
}
