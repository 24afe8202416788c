//! Nutrition rule table.
//!
//! The nutrition stream has no grouping key: one rolling window of recent
//! meals and one set of daily totals per local date.

use super::{build_alert, AlertDraft, RetentionClock, StoreSizes};
use crate::daily::{DailyAggregateStore, NutritionTotals};
use crate::policy::{FireGate, FirePolicy, RuleOverride, RuleSettings};
use crate::window::RollingWindow;
use crate::Pipeline;
use pulse_common::types::{Alert, MealRecord, RuleId};
use pulse_common::{RecordValidator, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing;

/// Gate key for rules that apply to the whole stream.
const STREAM_KEY: &str = "";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_protein_goal_g")]
    pub protein_goal_g: f64,
    /// Local hour from which the protein goal is checked.
    #[serde(default = "default_goal_cutoff_hour")]
    pub goal_cutoff_hour: u32,
    #[serde(default = "default_late_eating_hour")]
    pub late_eating_hour: u32,
    #[serde(default = "default_late_eating_kcal")]
    pub late_eating_kcal: f64,
    /// Combined kcal of the two most recent meals below which a training day is underfueled.
    #[serde(default = "default_underfuel_kcal_two_meals")]
    pub underfuel_kcal_two_meals: f64,
    #[serde(default = "default_carb_spike_g")]
    pub carb_spike_g: f64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default)]
    pub rules: BTreeMap<RuleId, RuleOverride>,
}

impl Default for NutritionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            protein_goal_g: default_protein_goal_g(),
            goal_cutoff_hour: default_goal_cutoff_hour(),
            late_eating_hour: default_late_eating_hour(),
            late_eating_kcal: default_late_eating_kcal(),
            underfuel_kcal_two_meals: default_underfuel_kcal_two_meals(),
            carb_spike_g: default_carb_spike_g(),
            retention_days: default_retention_days(),
            rules: BTreeMap::new(),
        }
    }
}

fn default_window_size() -> usize {
    8
}

fn default_protein_goal_g() -> f64 {
    160.0
}

fn default_goal_cutoff_hour() -> u32 {
    20 // 8 PM
}

fn default_late_eating_hour() -> u32 {
    22 // 10 PM
}

fn default_late_eating_kcal() -> f64 {
    500.0
}

fn default_underfuel_kcal_two_meals() -> f64 {
    500.0
}

fn default_carb_spike_g() -> f64 {
    90.0
}

fn default_retention_days() -> u32 {
    7
}

impl NutritionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        // the underfuel rule looks at the last two meals
        if self.window_size < 2 {
            return Err("nutrition.window_size must be at least 2".to_string());
        }
        for (name, hour) in [
            ("goal_cutoff_hour", self.goal_cutoff_hour),
            ("late_eating_hour", self.late_eating_hour),
        ] {
            if hour > 23 {
                return Err(format!("nutrition.{name} must be an hour of day (0-23), got {hour}"));
            }
        }
        for (name, value) in [
            ("protein_goal_g", self.protein_goal_g),
            ("carb_spike_g", self.carb_spike_g),
            ("late_eating_kcal", self.late_eating_kcal),
            ("underfuel_kcal_two_meals", self.underfuel_kcal_two_meals),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("nutrition.{name} must be a positive number, got {value}"));
            }
        }
        if let Some(rule) = self.rules.keys().find(|r| !RuleId::NUTRITION.contains(r)) {
            return Err(format!("rule '{rule}' is not a nutrition rule"));
        }
        Ok(())
    }

    fn settings(&self, rule: RuleId) -> RuleSettings {
        let default_policy = match rule {
            RuleId::ProteinGoal => FirePolicy::Latched,
            _ => FirePolicy::Repeatable,
        };
        RuleSettings::resolve(rule, default_policy, &self.rules)
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    carb_spike: RuleSettings,
    underfuel: RuleSettings,
    late_eating: RuleSettings,
    protein_goal: RuleSettings,
}

pub struct NutritionRules {
    config: NutritionConfig,
    validator: RecordValidator,
    settings: Settings,
    recent: RollingWindow<MealRecord>,
    daily: DailyAggregateStore<(), NutritionTotals>,
    gate: FireGate,
    retention: RetentionClock,
}

impl NutritionRules {
    pub fn new(config: NutritionConfig, validator: RecordValidator) -> Self {
        let settings = Settings {
            carb_spike: config.settings(RuleId::CarbSpike),
            underfuel: config.settings(RuleId::UnderfuelAfterWorkout),
            late_eating: config.settings(RuleId::LateEating),
            protein_goal: config.settings(RuleId::ProteinGoal),
        };
        Self {
            recent: RollingWindow::new(config.window_size),
            daily: DailyAggregateStore::new(),
            gate: FireGate::new(),
            retention: RetentionClock::new(config.retention_days),
            settings,
            validator,
            config,
        }
    }

    pub fn config(&self) -> &NutritionConfig {
        &self.config
    }

    pub fn daily_totals(&self, date_key: &str) -> Option<NutritionTotals> {
        self.daily.get(&(), date_key).copied()
    }

    pub fn recent_meals(&self) -> &RollingWindow<MealRecord> {
        &self.recent
    }

    pub fn store_sizes(&self) -> StoreSizes {
        StoreSizes {
            windows: usize::from(!self.recent.is_empty()),
            daily: self.daily.len(),
            sliding: 0,
            gates: self.gate.len(),
        }
    }

    fn sweep_if_due(&mut self, record: &MealRecord) {
        let Some(cutoff) = self.retention.due(record.at.local_date()) else {
            return;
        };
        let daily = self.daily.sweep_before(&cutoff);
        let gates = self.gate.sweep_before(&cutoff);
        if daily + gates > 0 {
            tracing::debug!(cutoff = %cutoff, daily, gates, "Swept expired nutrition state");
        }
    }
}

impl Pipeline for NutritionRules {
    type Record = MealRecord;

    fn name(&self) -> &'static str {
        "nutrition"
    }

    fn validate(&self, raw: &Value) -> Result<MealRecord> {
        self.validator.meal(raw)
    }

    fn apply(&mut self, record: &MealRecord) -> Vec<Alert> {
        self.sweep_if_due(record);

        let date_key = record.at.date_key();
        let date = date_key.as_str();
        let hour = record.at.hour();
        let meal = record.meal.as_str();

        self.recent.push(record.clone());
        let totals = {
            let totals = self.daily.entry(&(), date);
            totals.add(record);
            *totals
        };

        tracing::info!(
            "[{} {}] meal='{}' p={}g c={}g f={}g kcal={} training_day={}",
            date,
            record.at.local().format("%H:%M:%S"),
            meal,
            record.protein_g,
            record.carb_g,
            record.fat_g,
            record.kcal,
            record.training_day
        );
        tracing::info!(
            "Daily so far ({}): P={:.0}g C={:.0}g F={:.0}g Kcal={:.0}",
            date,
            totals.protein_g,
            totals.carb_g,
            totals.fat_g,
            totals.kcal
        );

        let mut alerts = Vec::new();

        let s = self.settings.carb_spike;
        if s.enabled {
            let spike = self.config.carb_spike_g;
            let holds = record.carb_g >= spike;
            if self
                .gate
                .admit(RuleId::CarbSpike, s.policy, STREAM_KEY, date, holds)
            {
                alerts.push(build_alert(
                    RuleId::CarbSpike,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("meal", meal), ("date", date)],
                        metric: record.carb_g,
                        threshold: spike,
                        window: "single meal".to_string(),
                        message: format!(
                            "CARB_SPIKE: '{meal}' has {}g carbs (>= {spike}).",
                            record.carb_g
                        ),
                    },
                ));
            }
        }

        let s = self.settings.underfuel;
        if s.enabled {
            let limit = self.config.underfuel_kcal_two_meals;
            let last_two = (self.recent.len() >= 2)
                .then(|| self.recent.last(2).map(|m| m.kcal).sum::<f64>());
            let holds = record.training_day && last_two.is_some_and(|kcal| kcal < limit);
            if self
                .gate
                .admit(RuleId::UnderfuelAfterWorkout, s.policy, STREAM_KEY, date, holds)
            {
                let kcal = last_two.unwrap_or_default();
                alerts.push(build_alert(
                    RuleId::UnderfuelAfterWorkout,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("date", date)],
                        metric: kcal,
                        threshold: limit,
                        window: "last 2 meals".to_string(),
                        message: format!(
                            "UNDERFUEL_AFTER_WORKOUT: last two meals total {kcal:.0} kcal (< {limit:.0})."
                        ),
                    },
                ));
            }
        }

        let s = self.settings.late_eating;
        if s.enabled {
            let late_hour = self.config.late_eating_hour;
            let min_kcal = self.config.late_eating_kcal;
            let holds = hour >= late_hour && record.kcal >= min_kcal;
            if self
                .gate
                .admit(RuleId::LateEating, s.policy, STREAM_KEY, date, holds)
            {
                alerts.push(build_alert(
                    RuleId::LateEating,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("meal", meal), ("date", date)],
                        metric: record.kcal,
                        threshold: min_kcal,
                        window: format!("after {late_hour}:00 local"),
                        message: format!(
                            "LATE_EATING: {:.0} kcal after {late_hour}:00 local (meal='{meal}').",
                            record.kcal
                        ),
                    },
                ));
            }
        }

        let s = self.settings.protein_goal;
        if s.enabled {
            let cutoff = self.config.goal_cutoff_hour;
            let goal = self.config.protein_goal_g;
            let holds = hour >= cutoff && totals.protein_g >= goal;
            if self
                .gate
                .admit(RuleId::ProteinGoal, s.policy, STREAM_KEY, date, holds)
            {
                alerts.push(build_alert(
                    RuleId::ProteinGoal,
                    &s,
                    &record.at,
                    AlertDraft {
                        scope: &[("date", date)],
                        metric: totals.protein_g,
                        threshold: goal,
                        window: format!("local day {date} from {cutoff}:00"),
                        message: format!(
                            "PROTEIN_GOAL: Reached {:.0}g by {cutoff}:00 local. Nice!",
                            totals.protein_g
                        ),
                    },
                ));
            }
        }

        alerts
    }
}
