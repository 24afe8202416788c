use anyhow::{anyhow, Context};
use pulse_alert::rules::attendance::AttendanceConfig;
use pulse_alert::rules::nutrition::NutritionConfig;
use pulse_common::TimeNormalizer;
use pulse_notify::config::SinkConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// IANA zone used for local dates and hour-of-day rules.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub attendance: AttendanceConfig,
    #[serde(default)]
    pub nutrition: NutritionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default = "default_sinks")]
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Input file of newline-delimited payloads; stdin when unset or `"-"`.
    #[serde(default)]
    pub path: Option<String>,
}

impl SourceConfig {
    pub fn file_path(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && *p != "-")
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_sinks() -> Vec<SinkConfig> {
    vec![SinkConfig::default()]
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            attendance: AttendanceConfig::default(),
            nutrition: NutritionConfig::default(),
            source: SourceConfig::default(),
            sinks: default_sinks(),
        }
    }
}

impl ConsumerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            tracing::info!(path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(zone) = get("PULSE_TIMEZONE") {
            self.timezone = zone.trim().to_string();
        }
        if let Some(path) = get("PULSE_INPUT") {
            self.source.path = Some(path);
        }
        if let Some(v) = parse_var(&get, "ATTENDANCE_ROLLING_WINDOW_SIZE")? {
            self.attendance.window_size = v;
        }
        if let Some(v) = parse_var(&get, "ATTENDANCE_RATE_THRESHOLD")? {
            self.attendance.rate_threshold = v;
        }
        if let Some(v) = parse_var(&get, "ATTENDANCE_CHRONIC_WINDOW_DAYS")? {
            self.attendance.chronic_window_days = v;
        }
        if let Some(v) = parse_var(&get, "ATTENDANCE_CHRONIC_ABSENCES_THRESHOLD")? {
            self.attendance.chronic_absence_threshold = v;
        }
        if let Some(v) = parse_var(&get, "ATTENDANCE_LATE_BURST_THRESHOLD")? {
            self.attendance.late_burst_threshold = v;
        }
        if let Some(v) = parse_var(&get, "NUTRITION_ROLLING_WINDOW_SIZE")? {
            self.nutrition.window_size = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.normalizer()?;
        self.attendance.validate().map_err(|e| anyhow!(e))?;
        self.nutrition.validate().map_err(|e| anyhow!(e))?;
        for sink in &self.sinks {
            sink.validate()?;
        }
        Ok(())
    }

    pub fn normalizer(&self) -> anyhow::Result<TimeNormalizer> {
        TimeNormalizer::from_zone_name(&self.timezone).map_err(|e| anyhow!(e))
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| anyhow!("invalid value for {key}: '{raw}' ({e})"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_alert::policy::FirePolicy;
    use pulse_common::types::{RuleId, Severity};
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ConsumerConfig = toml::from_str("").unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.attendance.window_size, 10);
        assert_eq!(config.attendance.rate_threshold, 0.85);
        assert_eq!(config.nutrition.window_size, 8);
        assert_eq!(config.nutrition.protein_goal_g, 160.0);
        assert_eq!(config.sinks, vec![SinkConfig::default()]);
        assert!(config.source.file_path().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_toml_with_rule_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
timezone = "Europe/Berlin"

[attendance]
window_size = 5
rate_threshold = 0.9

[attendance.rules.late_burst]
policy = "edge_triggered"
severity = "critical"

[nutrition.rules.protein_goal]
enabled = false

[source]
path = "events.jsonl"

[[sinks]]
type = "json_lines"
path = "alerts.jsonl"
min_severity = "warning"
"#
        )
        .unwrap();

        let config = ConsumerConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.attendance.window_size, 5);
        assert_eq!(config.attendance.chronic_window_days, 7);
        let late = &config.attendance.rules[&RuleId::LateBurst];
        assert_eq!(late.policy, Some(FirePolicy::EdgeTriggered));
        assert_eq!(late.severity, Some(Severity::Critical));
        assert_eq!(
            config.nutrition.rules[&RuleId::ProteinGoal].enabled,
            Some(false)
        );
        assert_eq!(config.source.file_path(), Some("events.jsonl"));
        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.sinks[0].min_severity(), Severity::Warning);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sample_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/pulse.toml");
        let config = ConsumerConfig::load(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.sinks, vec![SinkConfig::default()]);
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let config = ConsumerConfig::load_or_default(missing.to_str().unwrap()).unwrap();
        assert_eq!(config.attendance.window_size, 10);
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "attendance = 3").unwrap();
        let err = ConsumerConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"), "{err}");
    }

    #[test]
    fn env_overrides_apply_on_top_of_file() {
        let vars: HashMap<&str, &str> = [
            ("PULSE_TIMEZONE", "UTC"),
            ("PULSE_INPUT", "-"),
            ("ATTENDANCE_ROLLING_WINDOW_SIZE", "20"),
            ("ATTENDANCE_RATE_THRESHOLD", " 0.75 "),
            ("ATTENDANCE_CHRONIC_WINDOW_DAYS", "14"),
            ("ATTENDANCE_CHRONIC_ABSENCES_THRESHOLD", "4"),
            ("ATTENDANCE_LATE_BURST_THRESHOLD", "5"),
            ("NUTRITION_ROLLING_WINDOW_SIZE", "12"),
        ]
        .into_iter()
        .collect();

        let mut config = ConsumerConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.timezone, "UTC");
        assert!(config.source.file_path().is_none());
        assert_eq!(config.attendance.window_size, 20);
        assert_eq!(config.attendance.rate_threshold, 0.75);
        assert_eq!(config.attendance.chronic_window_days, 14);
        assert_eq!(config.attendance.chronic_absence_threshold, 4);
        assert_eq!(config.attendance.late_burst_threshold, 5);
        assert_eq!(config.nutrition.window_size, 12);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = ConsumerConfig::default();
        let err = config
            .apply_overrides(|k| (k == "ATTENDANCE_ROLLING_WINDOW_SIZE").then(|| "ten".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("ATTENDANCE_ROLLING_WINDOW_SIZE"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ConsumerConfig::default();
        config.attendance.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::default();
        config.attendance.rate_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ConsumerConfig::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());
    }
}
