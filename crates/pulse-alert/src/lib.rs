//! Stateful rule evaluation for the attendance and nutrition streams.
//!
//! Each pipeline owns its stores (rolling windows, per-day aggregates,
//! sliding time windows) and evaluates its rule table right after an event
//! has been applied to them. The [`engine::AlertEngine`] wraps a pipeline with
//! payload decoding, validation and drop accounting.

pub mod daily;
pub mod engine;
pub mod policy;
pub mod rules;
pub mod sliding;
pub mod window;


use pulse_common::types::Alert;
use pulse_common::Result;
use serde_json::Value;

/// A stream-specific rule set with its own state.
///
/// `validate` must not touch state, so a rejected payload never mutates
/// the stores. `apply` updates every store first and then evaluates the
/// rules in a fixed order, returning alerts in that order.
pub trait Pipeline: Send {
    /// Typed record produced by validation.
    type Record;

    /// Stream name used in logs (e.g., `"attendance"`).
    fn name(&self) -> &'static str;

    /// Converts a decoded payload into a typed record.
    fn validate(&self, raw: &Value) -> Result<Self::Record>;

    /// Applies the record to the stores and evaluates the rule table.
    fn apply(&mut self, record: &Self::Record) -> Vec<Alert>;
}
