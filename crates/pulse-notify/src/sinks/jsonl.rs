use crate::error::Result;
use crate::AlertSink;
use async_trait::async_trait;
use pulse_common::types::Alert;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stdout};
use tokio::sync::Mutex;

/// Writes each alert as one compact JSON object per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<BufWriter<W>>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    /// Flushes and returns the underlying writer.
    pub async fn into_inner(self) -> Result<W> {
        let mut writer = self.writer.into_inner();
        writer.flush().await?;
        Ok(writer.into_inner())
    }
}

impl JsonLinesSink<File> {
    /// Opens `path` for appending, creating it if missing.
    pub async fn append(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await?;
        Ok(Self::new(file))
    }
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AlertSink for JsonLinesSink<W> {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "json_lines"
    }
}
