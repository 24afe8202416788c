//! Turns decoded JSON payloads into typed records.
//!
//! Attendance records are strict: every field must be present and the status
//! must be one of the three known values. Nutrition records are lenient and
//! only require a timestamp; everything else falls back to a default.

use crate::error::{PipelineError, Result};
use crate::time::TimeNormalizer;
use crate::types::{AttendanceRecord, AttendanceStatus, MealRecord};
use serde_json::{Map, Value};

const DEFAULT_MEAL: &str = "unknown";

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator {
    normalizer: TimeNormalizer,
}

impl RecordValidator {
    pub fn new(normalizer: TimeNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    pub fn attendance(&self, raw: &Value) -> Result<AttendanceRecord> {
        let obj = as_object(raw)?;

        let ts = required_str(obj, "ts")?;
        let student = required_str(obj, "student")?;
        let course = required_str(obj, "course")?;
        let status_raw = required_str(obj, "status")?;
        let status: AttendanceStatus = status_raw
            .parse()
            .map_err(|_| PipelineError::Validation(format!("invalid status '{status_raw}'")))?;

        Ok(AttendanceRecord {
            at: self.normalizer.normalize(ts)?,
            student: student.to_string(),
            course: course.to_string(),
            status,
        })
    }

    pub fn meal(&self, raw: &Value) -> Result<MealRecord> {
        let obj = as_object(raw)?;
        let ts = required_str(obj, "ts")?;

        let meal = obj
            .get("meal")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MEAL)
            .to_string();

        Ok(MealRecord {
            at: self.normalizer.normalize(ts)?,
            meal,
            protein_g: amount(obj, "protein_g"),
            carb_g: amount(obj, "carb_g"),
            fat_g: amount(obj, "fat_g"),
            kcal: amount(obj, "kcal"),
            training_day: flag(obj, "training_day"),
        })
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object()
        .ok_or_else(|| PipelineError::Validation("payload is not a JSON object".to_string()))
}

/// Looks up a non-blank string field; `ts` also answers to `timestamp`.
fn required_str<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    let value = match (obj.get(field), field) {
        (None | Some(Value::Null), "ts") => obj.get("timestamp"),
        (other, _) => other,
    };
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(PipelineError::Validation(
            format!("missing field '{field}'"),
        )),
        Some(other) => Err(PipelineError::Validation(format!(
            "field '{field}' must be a string, got {other}"
        ))),
    }
}

/// Numeric nutrient amount; absent or uncoercible values read as 0 and
/// negative amounts are clamped to 0.
fn amount(obj: &Map<String, Value>, field: &str) -> f64 {
    let value = match obj.get(field) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn flag(obj: &Map<String, Value>, field: &str) -> bool {
    match obj.get(field) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> RecordValidator {
        RecordValidator::default()
    }

    #[test]
    fn attendance_record_is_trimmed_and_normalized() {
        let raw = json!({
            "ts": "2025-09-05T13:05:00Z",
            "student": "  Ada ",
            "course": "Algebra",
            "status": " PRESENT "
        });
        let record = validator().attendance(&raw).unwrap();
        assert_eq!(record.student, "Ada");
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.at.date_key(), "2025-09-05");
        assert_eq!(record.at.hhmm(), "09:05");
    }

    #[test]
    fn attendance_rejects_unknown_or_missing_status() {
        let excused = json!({"ts": "2025-09-05T13:05:00Z", "student": "Ada", "course": "Algebra", "status": "excused"});
        let missing = json!({"ts": "2025-09-05T13:05:00Z", "student": "Ada", "course": "Algebra"});
        assert!(matches!(
            validator().attendance(&excused),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            validator().attendance(&missing),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn attendance_rejects_blank_and_non_string_fields() {
        let blank = json!({"ts": "2025-09-05T13:05:00Z", "student": "  ", "course": "Algebra", "status": "late"});
        let numeric = json!({"ts": "2025-09-05T13:05:00Z", "student": 42, "course": "Algebra", "status": "late"});
        assert!(validator().attendance(&blank).is_err());
        assert!(validator().attendance(&numeric).is_err());
        assert!(validator().attendance(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn attendance_bad_timestamp_is_reported_as_invalid_timestamp() {
        let raw = json!({"ts": "2025-09-05 13:05", "student": "Ada", "course": "Algebra", "status": "late"});
        assert!(matches!(
            validator().attendance(&raw),
            Err(PipelineError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn attendance_accepts_timestamp_alias() {
        let raw = json!({"timestamp": "2025-09-05T13:05:00Z", "student": "Ada", "course": "Algebra", "status": "absent"});
        let record = validator().attendance(&raw).unwrap();
        assert_eq!(record.status, AttendanceStatus::Absent);
    }

    #[test]
    fn meal_fields_default_when_absent_or_uncoercible() {
        let raw = json!({
            "ts": "2025-09-05T18:30:00Z",
            "protein_g": "23",
            "carb_g": "lots",
            "fat_g": null,
            "kcal": -40
        });
        let record = validator().meal(&raw).unwrap();
        assert_eq!(record.meal, "unknown");
        assert_eq!(record.protein_g, 23.0);
        assert_eq!(record.carb_g, 0.0);
        assert_eq!(record.fat_g, 0.0);
        assert_eq!(record.kcal, 0.0);
        assert!(!record.training_day);
    }

    #[test]
    fn meal_training_day_coercion() {
        for (value, expected) in [
            (json!(true), true),
            (json!(1), true),
            (json!("yes"), true),
            (json!(0), false),
            (json!("no"), false),
        ] {
            let raw = json!({"ts": "2025-09-05T18:30:00Z", "meal": "Greek yogurt", "training_day": value});
            assert_eq!(validator().meal(&raw).unwrap().training_day, expected);
        }
    }

    #[test]
    fn meal_requires_timestamp() {
        let raw = json!({"meal": "Greek yogurt", "kcal": 190});
        assert!(matches!(
            validator().meal(&raw),
            Err(PipelineError::Validation(_))
        ));
    }
}
