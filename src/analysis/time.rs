//! Time coordinate handling.
//!
//! Mooring files store time as elapsed units since an epoch (CF-conventions,
//! e.g. `"seconds since 1970-01-01 00:00:00"`). Analysis works in fractional
//! days since the first sample of the record.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use thiserror::Error;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Error type for time coordinate handling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeError {
    /// No samples at all
    #[error("time coordinate is empty")]
    Empty,

    /// NaN or infinite time value
    #[error("time coordinate has a non-finite value at index {index}")]
    NonFinite { index: usize },

    /// Sample not strictly later than its predecessor
    #[error("time coordinate is not strictly increasing at index {index}")]
    NotMonotonic { index: usize },

    /// Fewer samples than an operation needs
    #[error("time coordinate needs at least {expected} samples, got {got}")]
    TooShort { expected: usize, got: usize },

    /// CF `units` attribute could not be interpreted
    #[error("invalid time units '{0}'")]
    InvalidUnits(String),
}

/// Convert raw elapsed seconds to fractional days since the first sample.
///
/// The first sample maps to day 0.0 and the output is strictly increasing.
///
/// # Errors
///
/// Returns an error if the input is empty, contains NaN/Inf, or is not
/// strictly increasing.
pub fn normalize_to_days(seconds: &[f64]) -> Result<Vec<f64>, TimeError> {
    validate(seconds)?;
    let t0 = seconds[0];
    Ok(seconds.iter().map(|&t| (t - t0) / SECONDS_PER_DAY).collect())
}

/// Median spacing between samples in seconds.
pub fn sampling_interval_seconds(seconds: &[f64]) -> Result<f64, TimeError> {
    if seconds.len() < 2 {
        return Err(TimeError::TooShort {
            expected: 2,
            got: seconds.len(),
        });
    }
    validate(seconds)?;

    let mut diffs: Vec<f64> = seconds.windows(2).map(|w| w[1] - w[0]).collect();
    diffs.sort_by(f64::total_cmp);

    let mid = diffs.len() / 2;
    let median = if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    };
    Ok(median)
}

fn validate(seconds: &[f64]) -> Result<(), TimeError> {
    if seconds.is_empty() {
        return Err(TimeError::Empty);
    }
    if let Some(index) = seconds.iter().position(|t| !t.is_finite()) {
        return Err(TimeError::NonFinite { index });
    }
    if let Some(i) = seconds.windows(2).position(|w| w[1] <= w[0]) {
        return Err(TimeError::NotMonotonic { index: i + 1 });
    }
    Ok(())
}

/// Unit of a CF time coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    pub fn seconds(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3_600.0,
            TimeUnit::Days => SECONDS_PER_DAY,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// Parsed CF-conventions time units, `"<unit> since <epoch>"`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CfTimeUnits {
    /// Unit of the stored values
    pub unit: TimeUnit,
    /// Reference epoch (UTC)
    pub epoch: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a CF `units` attribute such as `"days since 1950-01-01T00:00:00Z"`.
    pub fn parse(units: &str) -> Result<Self, TimeError> {
        let invalid = || TimeError::InvalidUnits(units.to_string());

        let (unit, epoch) = units.trim().split_once(" since ").ok_or_else(invalid)?;
        let unit = TimeUnit::parse(unit.trim()).ok_or_else(invalid)?;
        let epoch = parse_epoch(epoch).ok_or_else(invalid)?;

        Ok(Self { unit, epoch })
    }

    /// Unix epoch in seconds (the default when a file carries no units).
    pub fn unix_seconds() -> Self {
        Self {
            unit: TimeUnit::Seconds,
            epoch: NaiveDateTime::UNIX_EPOCH,
        }
    }

    /// Convert a stored value to elapsed seconds since the epoch.
    pub fn to_seconds(&self, value: f64) -> f64 {
        value * self.unit.seconds()
    }

    /// Convert a stored value to seconds since 1970-01-01.
    pub fn to_unix_seconds(&self, value: f64) -> f64 {
        let offset = (self.epoch - NaiveDateTime::UNIX_EPOCH).num_milliseconds() as f64 / 1000.0;
        offset + self.to_seconds(value)
    }

    /// Convert a stored value to a calendar date-time.
    ///
    /// Returns `None` for non-finite values or dates out of chrono's range.
    pub fn to_datetime(&self, value: f64) -> Option<NaiveDateTime> {
        let millis = self.to_seconds(value) * 1000.0;
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return None;
        }
        let delta = TimeDelta::try_milliseconds(millis.round() as i64)?;
        self.epoch.checked_add_signed(delta)
    }
}

impl std::fmt::Display for CfTimeUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = match self.unit {
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        write!(f, "{} since {}", unit, self.epoch.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Parse a CF epoch, shifting a trailing `±HH:MM` offset back to UTC.
fn parse_epoch(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s.strip_suffix("UTC").unwrap_or(s).trim();
    let s = s.strip_suffix('Z').unwrap_or(s);

    // Signs inside the leading YYYY-MM-DD are date separators
    let (s, offset) = match s.char_indices().skip(10).find(|&(_, c)| matches!(c, '+' | '-')) {
        Some((i, _)) => (s[..i].trim_end(), parse_utc_offset(&s[i..])?),
        None => (s, TimeDelta::zero()),
    };
    parse_local_epoch(s).map(|local| local - offset)
}

/// Offset east of UTC from `+H`, `+HH`, `+H:MM`, `+HH:MM` or `+HHMM`.
fn parse_utc_offset(s: &str) -> Option<TimeDelta> {
    let s = s.trim();
    let (sign, body) = match s.split_at_checked(1)? {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) if (1..=2).contains(&h.len()) && m.len() == 2 => (h, m),
        Some(_) => return None,
        None if body.len() <= 2 => (body, "0"),
        None if body.len() == 4 => body.split_at(2),
        None => return None,
    };
    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    Some(TimeDelta::minutes(sign * (hours * 60 + minutes)))
}

fn parse_local_epoch(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
