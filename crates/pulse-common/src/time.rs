//! Timestamp parsing and local-day bucketing.

use crate::error::{PipelineError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::borrow::Cow;

/// Calendar zone used when the configuration does not name one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Formats tried after strict RFC 3339, for offsets without a colon and
/// timestamps without seconds.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// An instant together with its wall-clock rendering in the target zone.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTimestamp {
    instant: DateTime<Utc>,
    local: DateTime<Tz>,
}

impl LocalTimestamp {
    pub fn new(instant: DateTime<Utc>, zone: Tz) -> Self {
        Self {
            instant,
            local: instant.with_timezone(&zone),
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn local(&self) -> &DateTime<Tz> {
        &self.local
    }

    /// Local calendar date as `YYYY-MM-DD`.
    pub fn date_key(&self) -> String {
        self.local.format("%Y-%m-%d").to_string()
    }

    pub fn local_date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    /// Local time of day as `HH:MM`.
    pub fn hhmm(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    /// The instant `span` earlier on the local wall clock.
    ///
    /// Across a DST change this is an hour away from `instant() - span`. A
    /// wall-clock time that falls in a gap resolves to the plain subtraction;
    /// an ambiguous one resolves to its earlier reading.
    pub fn wall_clock_minus(&self, span: Duration) -> DateTime<Utc> {
        let naive = self.local.naive_local() - span;
        self.local
            .timezone()
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(self.instant - span)
    }
}

/// Converts source timestamps into a fixed calendar zone.
///
/// # Examples
///
/// ```
/// use pulse_common::time::TimeNormalizer;
///
/// let normalizer = TimeNormalizer::new(chrono_tz::America::New_York);
/// let ts = normalizer.normalize("2025-09-05T02:30:00Z").unwrap();
/// assert_eq!(ts.date_key(), "2025-09-04");
/// assert_eq!(ts.hhmm(), "22:30");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    zone: Tz,
}

impl Default for TimeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl TimeNormalizer {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Builds a normalizer from an IANA zone name such as `"Europe/Berlin"`.
    pub fn from_zone_name(name: &str) -> std::result::Result<Self, String> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|e| format!("unknown time zone '{name}': {e}"))
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Parses an offset-qualified ISO-8601 timestamp. A trailing `Z` is read
    /// as `+00:00`; timestamps without any offset are rejected.
    pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidTimestamp(raw.to_string()));
        }

        let text = match trimmed
            .strip_suffix('Z')
            .or_else(|| trimmed.strip_suffix('z'))
        {
            Some(head) => Cow::Owned(format!("{head}+00:00")),
            None => Cow::Borrowed(trimmed),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
            return Ok(dt.with_timezone(&Utc));
        }

        FALLBACK_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&text, fmt).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| PipelineError::InvalidTimestamp(raw.to_string()))
    }

    pub fn normalize(&self, raw: &str) -> Result<LocalTimestamp> {
        Self::parse_instant(raw).map(|instant| self.at(instant))
    }

    pub fn at(&self, instant: DateTime<Utc>) -> LocalTimestamp {
        LocalTimestamp::new(instant, self.zone)
    }
}
