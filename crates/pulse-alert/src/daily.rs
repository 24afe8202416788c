//! Per-(key, local date) running counters.
//!
//! A new local date is simply a new map entry, so counters "reset" without any
//! rollover logic. Old dates stay until [`DailyAggregateStore::sweep_before`]
//! removes them.

use pulse_common::types::{AttendanceStatus, MealRecord};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct DailyAggregateStore<K, C> {
    entries: HashMap<(K, String), C>,
}

impl<K, C> Default for DailyAggregateStore<K, C> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, C> DailyAggregateStore<K, C>
where
    K: Eq + Hash + Clone,
    C: Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, key: &K, date_key: &str) -> &mut C {
        self.entries
            .entry((key.clone(), date_key.to_string()))
            .or_default()
    }

    pub fn get(&self, key: &K, date_key: &str) -> Option<&C> {
        self.entries.get(&(key.clone(), date_key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry dated strictly before `cutoff` (`YYYY-MM-DD` keys
    /// order lexicographically). Returns the number removed.
    pub fn sweep_before(&mut self, cutoff: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, date), _| date.as_str() >= cutoff);
        before - self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceCounts {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub total: u32,
}

impl AttendanceCounts {
    pub fn record(&mut self, status: AttendanceStatus) {
        self.total += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Late => self.late += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    /// (present + late) / total, `1.0` before the first event of the day.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        f64::from(self.present + self.late) / f64::from(self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionTotals {
    pub protein_g: f64,
    pub carb_g: f64,
    pub fat_g: f64,
    pub kcal: f64,
    pub meals: u32,
}

impl NutritionTotals {
    pub fn add(&mut self, meal: &MealRecord) {
        self.protein_g += meal.protein_g;
        self.carb_g += meal.carb_g;
        self.fat_g += meal.fat_g;
        self.kcal += meal.kcal;
        self.meals += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_created_lazily_per_date() {
        let mut store: DailyAggregateStore<String, AttendanceCounts> = DailyAggregateStore::new();
        let algebra = "Algebra".to_string();
        assert!(store.get(&algebra, "2025-09-05").is_none());

        store.entry(&algebra, "2025-09-05").record(AttendanceStatus::Absent);
        store.entry(&algebra, "2025-09-06").record(AttendanceStatus::Present);

        assert_eq!(store.get(&algebra, "2025-09-05").map(|c| c.rate()), Some(0.0));
        assert_eq!(store.get(&algebra, "2025-09-06").map(|c| c.rate()), Some(1.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn empty_counts_rate_is_one() {
        assert_eq!(AttendanceCounts::default().rate(), 1.0);
    }

    #[test]
    fn sweep_removes_only_older_dates() {
        let mut store: DailyAggregateStore<(), NutritionTotals> = DailyAggregateStore::new();
        for date in ["2025-08-30", "2025-09-01", "2025-09-02"] {
            store.entry(&(), date).meals += 1;
        }
        assert_eq!(store.sweep_before("2025-09-01"), 1);
        assert!(store.get(&(), "2025-08-30").is_none());
        assert!(store.get(&(), "2025-09-01").is_some());
    }
}
