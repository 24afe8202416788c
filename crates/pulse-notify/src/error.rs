/// Errors that can occur while delivering alerts.
///
/// # Examples
///
/// ```rust
/// use pulse_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("path must not be empty".to_string());
/// assert!(err.to_string().contains("path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Sink configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid sink configuration: {0}")]
    InvalidConfig(String),

    /// Writing to the underlying stream or file failed.
    #[error("Notify: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing an alert failed.
    #[error("Notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The receiving end of a channel sink has gone away.
    #[error("Notify: sink '{0}' is closed")]
    Closed(String),
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
