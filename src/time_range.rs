//! Time window for a fetch pass
//!
//! `--start` / `--end` accept Unix seconds or ISO-8601. When either bound is
//! given the other is defaulted: end = now, start = end - 24h.

use crate::config::ConfigError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Default window length when only one bound (or neither, explicitly) is set
pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Inclusive [start, end] window over transaction unix time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::InvertedRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Build a window from optional CLI bounds.
    /// Returns None when neither bound is given (no filtering).
    pub fn resolve(
        start: Option<&str>,
        end: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, ConfigError> {
        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        let end = match end {
            Some(raw) => parse_timestamp(raw)?,
            None => now,
        };
        let start = match start {
            Some(raw) => parse_timestamp(raw)?,
            None => end
                .checked_sub_signed(Duration::hours(DEFAULT_WINDOW_HOURS))
                .ok_or_else(|| ConfigError::InvalidTimestamp(end.to_rfc3339()))?,
        };

        Self::new(start, end).map(Some)
    }

    pub fn contains(&self, utime: i64) -> bool {
        utime >= self.start.timestamp() && utime <= self.end.timestamp()
    }

    /// True when `utime` lies before the window (older pages cannot match)
    pub fn is_before(&self, utime: i64) -> bool {
        utime < self.start.timestamp()
    }
}

/// Parse Unix seconds or an ISO-8601 timestamp (naive forms are taken as UTC)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ConfigError> {
    let raw = raw.trim();
    let invalid = || ConfigError::InvalidTimestamp(raw.to_string());

    if !raw.is_empty() && raw.trim_start_matches('-').chars().all(|c| c.is_ascii_digit()) {
        let secs: i64 = raw.parse().map_err(|_| invalid())?;
        return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(invalid)
}
