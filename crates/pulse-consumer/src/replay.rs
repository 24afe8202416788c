//! Replays recorded payloads as newline-delimited JSON.
//!
//! Input is either one JSON array of records or JSON lines. Each record is
//! re-emitted as one compact line so a consumer can read it from a pipe.

use anyhow::{bail, Context};
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    pub interval: Duration,
    pub repeat: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            repeat: false,
        }
    }
}

/// Splits `text` into compact JSON records.
pub fn parse_records(text: &str) -> anyhow::Result<Vec<String>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let items: Vec<Value> =
            serde_json::from_str(trimmed).context("Failed to parse JSON array")?;
        return items
            .iter()
            .map(|v| serde_json::to_string(v).map_err(anyhow::Error::from))
            .collect();
    }

    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", idx + 1))?;
        records.push(serde_json::to_string(&value)?);
    }
    Ok(records)
}

/// Writes `records` to `out`, one per line, pausing between them.
/// Returns the number of records written. With `repeat` set this only
/// returns on a write error.
pub async fn replay<W>(records: &[String], out: &mut W, options: ReplayOptions) -> anyhow::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    if records.is_empty() {
        bail!("nothing to replay");
    }

    let mut written = 0u64;
    loop {
        for record in records {
            if written > 0 && !options.interval.is_zero() {
                tokio::time::sleep(options.interval).await;
            }
            out.write_all(record.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await?;
            written += 1;
        }
        if !options.repeat {
            return Ok(written);
        }
        tracing::debug!(written, "Replay looping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let records = parse_records(
            r#"[
  {"ts": "2025-09-05T09:00:00Z", "student": "ada", "course": "Algebra", "status": "present"},
  {"ts": "2025-09-05T09:05:00Z", "student": "bo", "course": "Algebra", "status": "late"}
]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].contains('\n'));
        assert!(records[1].contains("\"status\":\"late\""));
    }

    #[test]
    fn parses_json_lines_and_skips_blanks() {
        let records = parse_records("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(records, vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_records("{\"a\": 1}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[tokio::test]
    async fn replay_writes_one_line_per_record() {
        let records = vec!["{\"a\":1}".to_string(), "{\"a\":2}".to_string()];
        let mut out = Vec::new();
        let written = replay(
            &records,
            &mut out,
            ReplayOptions {
                interval: Duration::ZERO,
                repeat: false,
            },
        )
        .await
        .unwrap();
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
    }

    #[tokio::test]
    async fn replay_rejects_empty_input() {
        let mut out = Vec::new();
        assert!(replay(&[], &mut out, ReplayOptions::default()).await.is_err());
    }
}
