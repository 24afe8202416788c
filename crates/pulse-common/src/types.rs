use crate::time::LocalTimestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attendance outcome for one student in one class session.
///
/// # Examples
///
/// ```
/// use pulse_common::types::AttendanceStatus;
///
/// let status: AttendanceStatus = " Late ".parse().unwrap();
/// assert_eq!(status, AttendanceStatus::Late);
/// assert!(status.is_attended());
/// assert!("excused".parse::<AttendanceStatus>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    /// Present and late both count toward the attendance rate.
    pub fn is_attended(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Late => write!(f, "late"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "late" => Ok(Self::Late),
            "absent" => Ok(Self::Absent),
            _ => Err(format!("unknown attendance status: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub at: LocalTimestamp,
    pub student: String,
    pub course: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MealRecord {
    pub at: LocalTimestamp,
    pub meal: String,
    pub protein_g: f64,
    pub carb_g: f64,
    pub fat_g: f64,
    pub kcal: f64,
    pub training_day: bool,
}

/// Alert severity level, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Identifies one row of the rule tables. Both attendance-drop variants share
/// the published name `ATTENDANCE_DROP_CLASS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    AttendanceDropWindow,
    AttendanceDropDaily,
    LateBurst,
    ChronicAbsence,
    CarbSpike,
    UnderfuelAfterWorkout,
    LateEating,
    ProteinGoal,
}

impl RuleId {
    pub const ATTENDANCE: [RuleId; 4] = [
        RuleId::AttendanceDropWindow,
        RuleId::AttendanceDropDaily,
        RuleId::LateBurst,
        RuleId::ChronicAbsence,
    ];

    pub const NUTRITION: [RuleId; 4] = [
        RuleId::CarbSpike,
        RuleId::UnderfuelAfterWorkout,
        RuleId::LateEating,
        RuleId::ProteinGoal,
    ];

    /// Published alert name.
    pub fn name(self) -> &'static str {
        match self {
            Self::AttendanceDropWindow | Self::AttendanceDropDaily => "ATTENDANCE_DROP_CLASS",
            Self::LateBurst => "LATE_BURST_CLASS",
            Self::ChronicAbsence => "CHRONIC_ABSENCE_STUDENT",
            Self::CarbSpike => "CARB_SPIKE",
            Self::UnderfuelAfterWorkout => "UNDERFUEL_AFTER_WORKOUT",
            Self::LateEating => "LATE_EATING",
            Self::ProteinGoal => "PROTEIN_GOAL",
        }
    }

    /// Configuration key, e.g. `"late_burst"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttendanceDropWindow => "attendance_drop_window",
            Self::AttendanceDropDaily => "attendance_drop_daily",
            Self::LateBurst => "late_burst",
            Self::ChronicAbsence => "chronic_absence",
            Self::CarbSpike => "carb_spike",
            Self::UnderfuelAfterWorkout => "underfuel_after_workout",
            Self::LateEating => "late_eating",
            Self::ProteinGoal => "protein_goal",
        }
    }

    pub fn default_severity(self) -> Severity {
        match self {
            Self::ProteinGoal => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub rule_id: RuleId,
    /// Published rule name (e.g., "ATTENDANCE_DROP_CLASS")
    pub rule_name: String,
    pub severity: Severity,
    /// Dimensions the alert applies to (e.g., course=Algebra, date=2025-09-05)
    pub scope: BTreeMap<String, String>,
    pub metric: f64,
    pub threshold: f64,
    /// Window the metric was computed over (e.g., "last 10 events")
    pub window: String,
    pub message: String,
    /// Timestamp of the event that triggered the alert
    pub timestamp: DateTime<Utc>,
    pub local_date: String,
}

impl Alert {
    pub fn scope_value(&self, dimension: &str) -> Option<&str> {
        self.scope.get(dimension).map(String::as_str)
    }
}

/// Format a scope map into a human-readable string.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use pulse_common::types::format_scope;
///
/// let mut scope = BTreeMap::new();
/// scope.insert("course".to_string(), "Algebra".to_string());
/// scope.insert("date".to_string(), "2025-09-05".to_string());
/// assert_eq!(format_scope(&scope), "course=Algebra, date=2025-09-05");
/// ```
pub fn format_scope(scope: &BTreeMap<String, String>) -> String {
    scope
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
