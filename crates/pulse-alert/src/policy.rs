//! Re-fire policies shared by every rule.
//!
//! A rule decides whether its condition holds; the [`FireGate`] decides whether
//! that translates into an alert, based on the rule's [`FirePolicy`] and what
//! it already emitted for the same key in the same period (local date).

use pulse_common::types::{RuleId, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirePolicy {
    /// Fire on every event while the condition holds.
    #[default]
    Repeatable,
    /// Fire once per key and period, then stay quiet until the period changes.
    Latched,
    /// Fire when the condition starts holding; re-arm once it stops holding
    /// or the period changes.
    EdgeTriggered,
}

impl std::str::FromStr for FirePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "repeatable" => Ok(Self::Repeatable),
            "latched" => Ok(Self::Latched),
            "edge_triggered" | "edge" => Ok(Self::EdgeTriggered),
            _ => Err(format!("unknown fire policy: {s}")),
        }
    }
}

/// Key: (rule, scope key such as a course or student, period)
///
/// Each period keeps its own state, so an event that arrives late for an
/// earlier date finds that date's latch still set.
#[derive(Debug, Default)]
pub struct FireGate {
    tripped: HashMap<(RuleId, String, String), bool>,
}

impl FireGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when an alert should be emitted for this evaluation.
    pub fn admit(
        &mut self,
        rule: RuleId,
        policy: FirePolicy,
        key: &str,
        period: &str,
        holds: bool,
    ) -> bool {
        if policy == FirePolicy::Repeatable {
            return holds;
        }

        let gate_key = (rule, key.to_string(), period.to_string());
        let tripped = self.tripped.get(&gate_key).copied().unwrap_or(false);

        match policy {
            FirePolicy::Repeatable => holds,
            FirePolicy::Latched => {
                if holds && !tripped {
                    self.tripped.insert(gate_key, true);
                    true
                } else {
                    false
                }
            }
            FirePolicy::EdgeTriggered => {
                if holds || self.tripped.contains_key(&gate_key) {
                    self.tripped.insert(gate_key, holds);
                }
                holds && !tripped
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tripped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tripped.is_empty()
    }

    /// Forgets gate state for periods dated strictly before `cutoff`.
    pub fn sweep_before(&mut self, cutoff: &str) -> usize {
        let before = self.tripped.len();
        self.tripped
            .retain(|(_, _, period), _| period.as_str() >= cutoff);
        before - self.tripped.len()
    }
}

/// Optional per-rule settings read from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleOverride {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub policy: Option<FirePolicy>,
    #[serde(default)]
    pub severity: Option<Severity>,
}

/// Effective settings for one rule after applying overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSettings {
    pub enabled: bool,
    pub policy: FirePolicy,
    pub severity: Severity,
}

impl RuleSettings {
    pub fn resolve(
        rule: RuleId,
        default_policy: FirePolicy,
        overrides: &BTreeMap<RuleId, RuleOverride>,
    ) -> Self {
        let ov = overrides.get(&rule);
        Self {
            enabled: ov.and_then(|o| o.enabled).unwrap_or(true),
            policy: ov.and_then(|o| o.policy).unwrap_or(default_policy),
            severity: ov
                .and_then(|o| o.severity)
                .unwrap_or_else(|| rule.default_severity()),
        }
    }
}
