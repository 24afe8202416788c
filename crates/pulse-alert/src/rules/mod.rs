pub mod attendance;
pub mod nutrition;

use crate::policy::RuleSettings;
use chrono::{Duration, NaiveDate};
use pulse_common::time::LocalTimestamp;
use pulse_common::types::{Alert, RuleId};
use std::collections::BTreeMap;

/// Counts of live entries per store, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSizes {
    pub windows: usize,
    pub daily: usize,
    pub sliding: usize,
    pub gates: usize,
}

/// Fields of an alert that vary per rule.
pub(crate) struct AlertDraft<'a> {
    pub scope: &'a [(&'a str, &'a str)],
    pub metric: f64,
    pub threshold: f64,
    pub window: String,
    pub message: String,
}

pub(crate) fn build_alert(
    rule: RuleId,
    settings: &RuleSettings,
    at: &LocalTimestamp,
    draft: AlertDraft<'_>,
) -> Alert {
    let scope: BTreeMap<String, String> = draft
        .scope
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Alert {
        rule_id: rule,
        rule_name: rule.name().to_string(),
        severity: settings.severity,
        scope,
        metric: draft.metric,
        threshold: draft.threshold,
        window: draft.window,
        message: draft.message,
        timestamp: at.instant(),
        local_date: at.date_key(),
    }
}

/// Decides when date-keyed state should be swept. Sweeps happen when an
/// event's local date moves past the last swept date; there is no timer.
#[derive(Debug, Clone)]
pub(crate) struct RetentionClock {
    days: u32,
    last_swept: Option<NaiveDate>,
}

impl RetentionClock {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            last_swept: None,
        }
    }

    /// Returns the cutoff date key when a sweep is due for `today`.
    pub fn due(&mut self, today: NaiveDate) -> Option<String> {
        if self.days == 0 {
            return None;
        }
        if self.last_swept.is_some_and(|last| today <= last) {
            return None;
        }
        self.last_swept = Some(today);
        let cutoff = today - Duration::days(i64::from(self.days));
        Some(cutoff.format("%Y-%m-%d").to_string())
    }
}

pub(crate) fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}
