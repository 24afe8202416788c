//! Attendance rule table.
//!
//! | Rule | Condition |
//! |---|---|
//! | `ATTENDANCE_DROP_CLASS` (window) | the course window holds N events and their rate is below threshold |
//! | `ATTENDANCE_DROP_CLASS` (daily) | the course's rate for the local day is below threshold |
//! | `LATE_BURST_CLASS` | late count for (course, day) reached the burst threshold |
//! | `CHRONIC_ABSENCE_STUDENT` | student absences in the trailing window reached the threshold |

use super::{build_alert, percent, AlertDraft, RetentionClock, StoreSizes};
use crate::daily::{AttendanceCounts, DailyAggregateStore};
use crate::policy::{FireGate, FirePolicy, RuleOverride, RuleSettings};
use crate::sliding::SlidingTimeWindowStore;
use crate::window::{attendance_rate, WindowStore};
use crate::Pipeline;
use chrono::Duration;
use pulse_common::types::{Alert, AttendanceRecord, AttendanceStatus, RuleId};
use pulse_common::{RecordValidator, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Attendance rate below which the drop rules fire (exclusive).
    #[serde(default = "default_rate_threshold")]
    pub rate_threshold: f64,
    #[serde(default = "default_chronic_window_days")]
    pub chronic_window_days: u32,
    #[serde(default = "default_chronic_absence_threshold")]
    pub chronic_absence_threshold: usize,
    #[serde(default = "default_late_burst_threshold")]
    pub late_burst_threshold: u32,
    /// Days of per-day state to keep behind the newest local date; 0 keeps everything.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default)]
    pub rules: BTreeMap<RuleId, RuleOverride>,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            rate_threshold: default_rate_threshold(),
            chronic_window_days: default_chronic_window_days(),
            chronic_absence_threshold: default_chronic_absence_threshold(),
            late_burst_threshold: default_late_burst_threshold(),
            retention_days: default_retention_days(),
            rules: BTreeMap::new(),
        }
    }
}

fn default_window_size() -> usize {
    10
}

fn default_rate_threshold() -> f64 {
    0.85
}

fn default_chronic_window_days() -> u32 {
    7
}

fn default_chronic_absence_threshold() -> usize {
    2
}

fn default_late_burst_threshold() -> u32 {
    3
}

fn default_retention_days() -> u32 {
    7
}

impl AttendanceConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.window_size == 0 {
            return Err("attendance.window_size must be greater than 0".to_string());
        }
        if !(self.rate_threshold > 0.0 && self.rate_threshold <= 1.0) {
            return Err(format!(
                "attendance.rate_threshold must be in (0, 1], got {}",
                self.rate_threshold
            ));
        }
        if self.chronic_window_days == 0 {
            return Err("attendance.chronic_window_days must be greater than 0".to_string());
        }
        if let Some(rule) = self.rules.keys().find(|r| !RuleId::ATTENDANCE.contains(r)) {
            return Err(format!("rule '{rule}' is not an attendance rule"));
        }
        Ok(())
    }

    fn settings(&self, rule: RuleId) -> RuleSettings {
        RuleSettings::resolve(rule, FirePolicy::Repeatable, &self.rules)
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    drop_window: RuleSettings,
    drop_daily: RuleSettings,
    late_burst: RuleSettings,
    chronic: RuleSettings,
}

pub struct AttendanceRules {
    config: AttendanceConfig,
    validator: RecordValidator,
    settings: Settings,
    windows: WindowStore<AttendanceStatus>,
    daily: DailyAggregateStore<String, AttendanceCounts>,
    absences: SlidingTimeWindowStore,
    gate: FireGate,
    retention: RetentionClock,
}

impl AttendanceRules {
    pub fn new(config: AttendanceConfig, validator: RecordValidator) -> Self {
        let settings = Settings {
            drop_window: config.settings(RuleId::AttendanceDropWindow),
            drop_daily: config.settings(RuleId::AttendanceDropDaily),
            late_burst: config.settings(RuleId::LateBurst),
            chronic: config.settings(RuleId::ChronicAbsence),
        };
        Self {
            windows: WindowStore::new(config.window_size),
            daily: DailyAggregateStore::new(),
            absences: SlidingTimeWindowStore::new(Duration::days(i64::from(
                config.chronic_window_days,
            ))),
            gate: FireGate::new(),
            retention: RetentionClock::new(config.retention_days),
            settings,
            validator,
            config,
        }
    }

    pub fn config(&self) -> &AttendanceConfig {
        &self.config
    }

    /// Rolling-window rate for `course`, if it has been seen.
    pub fn window_rate(&self, course: &str) -> Option<f64> {
        self.windows.get(course).map(attendance_rate)
    }

    pub fn window_len(&self, course: &str) -> usize {
        self.windows.get(course).map_or(0, |w| w.len())
    }

    pub fn daily_counts(&self, course: &str, date_key: &str) -> Option<AttendanceCounts> {
        self.daily.get(&course.to_string(), date_key).copied()
    }

    pub fn absences(&self, student: &str) -> usize {
        self.absences.count(student)
    }

    pub fn store_sizes(&self) -> StoreSizes {
        StoreSizes {
            windows: self.windows.keys(),
            daily: self.daily.len(),
            sliding: self.absences.keys(),
            gates: self.gate.len(),
        }
    }

    fn sweep_if_due(&mut self, record: &AttendanceRecord) {
        let Some(cutoff) = self.retention.due(record.at.local_date()) else {
            return;
        };
        let daily = self.daily.sweep_before(&cutoff);
        let gates = self.gate.sweep_before(&cutoff);
        let students = self.absences.sweep(&record.at);
        if daily + gates + students > 0 {
            tracing::debug!(
                cutoff = %cutoff,
                daily,
                gates,
                students,
                "Swept expired attendance state"
            );
        }
    }
}

impl Pipeline for AttendanceRules {
    type Record = AttendanceRecord;

    fn name(&self) -> &'static str {
        "attendance"
    }

    fn validate(&self, raw: &Value) -> Result<AttendanceRecord> {
        self.validator.attendance(raw)
    }

    fn apply(&mut self, record: &AttendanceRecord) -> Vec<Alert> {
        self.sweep_if_due(record);

        let date_key = record.at.date_key();
        let date = date_key.as_str();
        let course = record.course.as_str();
        let student = record.student.as_str();

        tracing::info!(
            "[{} {}] {} | {} -> {}",
            date,
            record.at.hhmm(),
            course,
            student,
            record.status
        );

        // Update every store before any rule looks at them.
        let window = self.windows.observe(course, record.status);
        let window_full = window.is_full();
        let window_rate = attendance_rate(window);

        let counts = {
            let counts = self.daily.entry(&record.course, date);
            counts.record(record.status);
            *counts
        };

        let absences = match record.status {
            AttendanceStatus::Absent => Some(self.absences.record(student, &record.at)),
            _ => None,
        };

        let threshold = self.config.rate_threshold;
        let mut alerts = Vec::new();

        let s = self.settings.drop_window;
        if s.enabled {
            let holds = window_full && window_rate < threshold;
            if self
                .gate
                .admit(RuleId::AttendanceDropWindow, s.policy, course, date, holds)
            {
                let n = self.config.window_size;
                alerts.push(build_alert(
                    RuleId::AttendanceDropWindow,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("course", course)],
                        metric: window_rate,
                        threshold,
                        window: format!("last {n} events"),
                        message: format!(
                            "ATTENDANCE_DROP_CLASS (window): course='{course}' rate={} over last {n} events (< {})",
                            percent(window_rate),
                            percent(threshold)
                        ),
                    },
                ));
            }
        }

        let s = self.settings.drop_daily;
        if s.enabled {
            let daily_rate = counts.rate();
            let holds = daily_rate < threshold;
            if self
                .gate
                .admit(RuleId::AttendanceDropDaily, s.policy, course, date, holds)
            {
                alerts.push(build_alert(
                    RuleId::AttendanceDropDaily,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("course", course), ("date", date)],
                        metric: daily_rate,
                        threshold,
                        window: format!("local day {date}"),
                        message: format!(
                            "ATTENDANCE_DROP_CLASS (daily): course='{course}' date={date} rate={} (< {})",
                            percent(daily_rate),
                            percent(threshold)
                        ),
                    },
                ));
            }
        }

        let s = self.settings.late_burst;
        if s.enabled && record.status == AttendanceStatus::Late {
            let lates = counts.late;
            let burst = self.config.late_burst_threshold;
            if self
                .gate
                .admit(RuleId::LateBurst, s.policy, course, date, lates >= burst)
            {
                alerts.push(build_alert(
                    RuleId::LateBurst,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("course", course), ("date", date)],
                        metric: f64::from(lates),
                        threshold: f64::from(burst),
                        window: format!("local day {date}"),
                        message: format!(
                            "LATE_BURST_CLASS: course='{course}' date={date} lates={lates} (>= {burst})"
                        ),
                    },
                ));
            }
        }

        let s = self.settings.chronic;
        if let (true, Some(count)) = (s.enabled, absences) {
            let limit = self.config.chronic_absence_threshold;
            let days = self.config.chronic_window_days;
            if self
                .gate
                .admit(RuleId::ChronicAbsence, s.policy, student, date, count >= limit)
            {
                alerts.push(build_alert(
                    RuleId::ChronicAbsence,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("student", student)],
                        metric: count as f64,
                        threshold: limit as f64,
                        window: format!("trailing {days}d"),
                        message: format!(
                            "CHRONIC_ABSENCE_STUDENT: student='{student}' absences_last_{days}d={count} (>= {limit})"
                        ),
                    },
                ));
            }
        }

        alerts
    }
}
