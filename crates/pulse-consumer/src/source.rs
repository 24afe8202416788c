//! Where raw payloads come from.
//!
//! A source yields one undecoded payload string per message, in arrival
//! order. Reads are cancel-safe so the consume loop can race them against
//! shutdown without losing a half-read message.

use async_trait::async_trait;
use pulse_common::Result;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split, Stdin};
use tokio::sync::mpsc;

#[async_trait]
pub trait MessageSource: Send {
    /// Next payload, or `None` once the source is exhausted or closed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Transport`](pulse_common::PipelineError::Transport)
    /// when the underlying stream fails. Any other error concerns this one
    /// message only and the source can be read again.
    async fn next_message(&mut self) -> Result<Option<String>>;

    /// Stops the source. Later calls to `next_message` return `Ok(None)`.
    async fn close(&mut self);

    fn source_name(&self) -> &str;
}

/// Newline-delimited payloads from any buffered reader.
///
/// Blank lines are skipped and a trailing `\r` is dropped. A line that is not
/// UTF-8 comes back as a recoverable [`PipelineError::Encoding`] and reading
/// resumes at the next line.
///
/// [`PipelineError::Encoding`]: pulse_common::PipelineError::Encoding
pub struct LineSource<R> {
    name: String,
    lines: Option<Split<R>>,
}

impl<R: AsyncBufRead + Unpin + Send> LineSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: Some(reader.split(b'\n')),
        }
    }
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::new(tokio::io::stdin()))
    }
}

impl LineSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
    async fn next_message(&mut self) -> Result<Option<String>> {
        while let Some(lines) = self.lines.as_mut() {
            match lines.next_segment().await? {
                Some(mut line) => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Ok(Some(String::from_utf8(line)?));
                }
                None => self.lines = None,
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        self.lines = None;
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Payloads pushed by another task through a bounded channel.
pub struct ChannelSource {
    rx: mpsc::Receiver<String>,
    closed: bool,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<String>) -> Self {
        Self { rx, closed: false }
    }

    /// Creates a source and the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        self.closed = true;
        self.rx.close();
    }

    fn source_name(&self) -> &str {
        "channel"
    }
}
