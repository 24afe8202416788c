use chrono::{DateTime, Duration, Utc};
use pulse_common::LocalTimestamp;
use std::collections::{HashMap, VecDeque};

/// Time-ordered event instants for one key, pruned against a cutoff.
///
/// Appends are expected in non-decreasing timestamp order, which is what makes
/// pruning from the front sufficient.
#[derive(Debug, Clone, Default)]
pub struct SlidingEventLog {
    data: VecDeque<DateTime<Utc>>,
}

impl SlidingEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `instant`, prunes against `cutoff` and returns the retained count.
    pub fn record(&mut self, instant: DateTime<Utc>, cutoff: DateTime<Utc>) -> usize {
        self.data.push_back(instant);
        self.prune(cutoff);
        self.data.len()
    }

    /// Removes entries strictly older than `cutoff`.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) {
        while let Some(front) = self.data.front() {
            if *front < cutoff {
                self.data.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.data.back().copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.data.iter()
    }
}

/// Per-key [`SlidingEventLog`]s sharing one trailing window.
///
/// The window is measured on the local wall clock of the newest timestamp, so
/// "the last 7 days" spans 7 calendar days even across a DST change.
#[derive(Debug, Clone)]
pub struct SlidingTimeWindowStore {
    window: Duration,
    logs: HashMap<String, SlidingEventLog>,
}

impl SlidingTimeWindowStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            logs: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Oldest instant still inside the window that ends at `at`.
    pub fn cutoff(&self, at: &LocalTimestamp) -> DateTime<Utc> {
        at.wall_clock_minus(self.window)
    }

    pub fn record(&mut self, key: &str, at: &LocalTimestamp) -> usize {
        let cutoff = self.cutoff(at);
        self.logs
            .entry(key.to_string())
            .or_default()
            .record(at.instant(), cutoff)
    }

    pub fn count(&self, key: &str) -> usize {
        self.logs.get(key).map_or(0, SlidingEventLog::len)
    }

    pub fn get(&self, key: &str) -> Option<&SlidingEventLog> {
        self.logs.get(key)
    }

    pub fn keys(&self) -> usize {
        self.logs.len()
    }

    /// Prunes every log against the window ending at `at` and forgets keys
    /// left empty. Returns the number of keys removed.
    pub fn sweep(&mut self, at: &LocalTimestamp) -> usize {
        let cutoff = self.cutoff(at);
        let before = self.logs.len();
        self.logs.retain(|_, log| {
            log.prune(cutoff);
            !log.is_empty()
        });
        before - self.logs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pulse_common::TimeNormalizer;

    fn day(n: i64) -> LocalTimestamp {
        let instant = Utc.with_ymd_and_hms(2025, 9, 1, 14, 0, 0).unwrap() + Duration::days(n);
        TimeNormalizer::default().at(instant)
    }

    #[test]
    fn entries_outside_window_are_pruned() {
        let mut store = SlidingTimeWindowStore::new(Duration::days(7));
        assert_eq!(store.record("ada", &day(0)), 1);
        assert_eq!(store.record("ada", &day(6)), 2);
        // day 0 is more than 7 days before day 8
        assert_eq!(store.record("ada", &day(8)), 2);
        assert_eq!(
            store.get("ada").and_then(SlidingEventLog::latest),
            Some(day(8).instant())
        );
    }

    #[test]
    fn entry_exactly_on_the_cutoff_is_kept() {
        let mut store = SlidingTimeWindowStore::new(Duration::days(7));
        store.record("ada", &day(0));
        assert_eq!(store.record("ada", &day(7)), 2);
    }

    #[test]
    fn window_spans_local_days_across_dst_end() {
        let ny = TimeNormalizer::default();
        let mut store = SlidingTimeWindowStore::new(Duration::days(7));
        // 09:00 EDT, then 09:00 EST one calendar week later (169 elapsed hours)
        store.record("ada", &ny.normalize("2025-10-27T09:00:00-04:00").unwrap());
        let later = ny.normalize("2025-11-03T09:00:00-05:00").unwrap();
        assert_eq!(store.record("ada", &later), 2);

        // one minute later the first absence falls out
        let next = ny.normalize("2025-11-03T09:01:00-05:00").unwrap();
        assert_eq!(store.record("ada", &next), 2);
        assert_eq!(
            store.get("ada").and_then(|log| log.iter().next().copied()),
            Some(later.instant())
        );
    }

    #[test]
    fn sweep_drops_stale_keys() {
        let mut store = SlidingTimeWindowStore::new(Duration::days(7));
        store.record("ada", &day(0));
        store.record("bo", &day(5));
        assert_eq!(store.sweep(&day(10)), 1);
        assert_eq!(store.count("ada"), 0);
        assert_eq!(store.count("bo"), 1);
        assert_eq!(store.keys(), 1);
    }
}
