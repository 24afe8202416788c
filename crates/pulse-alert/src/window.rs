use pulse_common::types::AttendanceStatus;
use std::collections::{HashMap, VecDeque};

/// Fixed-capacity FIFO of the most recent observations.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    capacity: usize,
    data: VecDeque<T>,
}

impl<T> RollingWindow<T> {
    /// A capacity of 0 is bumped to 1; configuration validation rejects it earlier.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `value`, returning the evicted oldest entry once the window is full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }

    /// The `n` most recent entries, newest first.
    pub fn last(&self, n: usize) -> impl Iterator<Item = &T> {
        self.data.iter().rev().take(n)
    }
}

/// Per-key rolling windows sharing one capacity.
#[derive(Debug, Clone)]
pub struct WindowStore<T> {
    capacity: usize,
    windows: HashMap<String, RollingWindow<T>>,
}

impl<T> WindowStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: HashMap::new(),
        }
    }

    pub fn observe(&mut self, key: &str, value: T) -> &RollingWindow<T> {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RollingWindow::new(capacity));
        window.push(value);
        window
    }

    pub fn get(&self, key: &str) -> Option<&RollingWindow<T>> {
        self.windows.get(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn keys(&self) -> usize {
        self.windows.len()
    }
}

/// Share of attended (present or late) entries. An empty window reads as
/// fully attended so a cold start never alarms.
pub fn attendance_rate(window: &RollingWindow<AttendanceStatus>) -> f64 {
    if window.is_empty() {
        return 1.0;
    }
    let attended = window.iter().filter(|s| s.is_attended()).count();
    attended as f64 / window.len() as f64
}
