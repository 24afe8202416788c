//! Shared types for the pulse streaming pipelines.
//!
//! Records, alerts and the error taxonomy live here so that the rule engine,
//! the sinks and the consumer binary agree on one vocabulary.

pub mod error;
pub mod time;
pub mod types;
pub mod validate;

pub use error::{PipelineError, Result};
pub use time::{LocalTimestamp, TimeNormalizer, DEFAULT_TIMEZONE};
pub use validate::RecordValidator;
