/// Errors raised while moving a payload from the transport to the rule engine.
///
/// Only [`PipelineError::Transport`] is fatal. The other variants describe a
/// single bad payload: the event is dropped and the stream keeps going.
///
/// # Examples
///
/// ```rust
/// use pulse_common::error::PipelineError;
///
/// let err = PipelineError::Validation("missing field 'status'".to_string());
/// assert!(err.is_recoverable());
/// assert!(err.to_string().contains("status"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The message source failed (broken pipe, unreadable file, closed broker).
    #[error("Transport: {0}")]
    Transport(#[from] std::io::Error),

    /// The payload is not well-formed JSON.
    #[error("Decode: payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// A transport frame whose bytes are not UTF-8 text.
    #[error("Decode: payload is not valid UTF-8 ({bytes} bytes, invalid from byte {valid_up_to})")]
    Encoding { bytes: usize, valid_up_to: usize },

    /// The payload is JSON but does not describe a valid record.
    #[error("Validation: {0}")]
    Validation(String),

    /// The `ts` field could not be parsed as an offset-qualified timestamp.
    #[error("Validation: invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

impl PipelineError {
    /// Returns `true` for per-event failures that only drop the offending payload.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }

    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Decode(_) | Self::Encoding { .. } => "decode",
            Self::Validation(_) => "validation",
            Self::InvalidTimestamp(_) => "invalid_timestamp",
        }
    }
}

impl From<std::string::FromUtf8Error> for PipelineError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding {
            bytes: err.as_bytes().len(),
            valid_up_to: err.utf8_error().valid_up_to(),
        }
    }
}

/// Convenience `Result` alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_is_a_recoverable_decode_error() {
        let err = PipelineError::from(String::from_utf8(b"ok\xff\xfe".to_vec()).unwrap_err());
        assert!(err.is_recoverable());
        assert_eq!(err.kind(), "decode");
        assert!(matches!(err, PipelineError::Encoding { bytes: 4, valid_up_to: 2 }));
    }

    #[test]
    fn only_transport_is_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(!PipelineError::from(io).is_recoverable());
        assert!(PipelineError::InvalidTimestamp("x".into()).is_recoverable());
    }
}
