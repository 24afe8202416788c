use crate::error::{NotifyError, Result};
use crate::sinks::{JsonLinesSink, LogSink};
use crate::AlertSink;
use pulse_common::types::Severity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry of the `sinks` configuration list.
///
/// ```toml
/// [[sinks]]
/// type = "log"
///
/// [[sinks]]
/// type = "json_lines"
/// path = "alerts.jsonl"   # omitted or "-" writes to stdout
/// min_severity = "warning"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    Log {
        #[serde(default = "default_min_severity")]
        min_severity: Severity,
    },
    JsonLines {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default = "default_min_severity")]
        min_severity: Severity,
    },
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Log {
            min_severity: default_min_severity(),
        }
    }
}

impl SinkConfig {
    pub fn min_severity(&self) -> Severity {
        match self {
            Self::Log { min_severity } | Self::JsonLines { min_severity, .. } => *min_severity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::JsonLines { path: Some(path), .. } = self {
            if path.as_os_str().is_empty() {
                return Err(NotifyError::InvalidConfig(
                    "json_lines sink path must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Instantiates the configured sink.
    pub async fn build(&self) -> Result<Box<dyn AlertSink>> {
        self.validate()?;
        let sink: Box<dyn AlertSink> = match self {
            Self::Log { .. } => Box::new(LogSink),
            Self::JsonLines { path, .. } => match path {
                Some(path) if path.as_os_str() != "-" => {
                    Box::new(JsonLinesSink::append(path).await?)
                }
                _ => Box::new(JsonLinesSink::stdout()),
            },
        };
        Ok(sink)
    }
}
