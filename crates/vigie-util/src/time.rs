//! Time utilities for vigie
//!
//! Provides the wall-clock primitives used by login schedules: clock times
//! with minute precision and ISO days of the week.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `VIGIE_MOCK_TIME` environment variable can be set
//! to override the system time returned by [`now`]. This is useful for
//! previewing how a schedule behaves at another moment of the week.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! VIGIE_MOCK_TIME="2025-12-29 08:30:00" vigie check --schedule user.json --role agent
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "VIGIE_MOCK_TIME";

/// Format accepted by [`parse_local_datetime`] and the mock time variable
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_local_datetime(&mock_time_str) {
                    Some(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    None => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = DATETIME_FORMAT,
                            "Invalid mock time"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
///
/// Schedule evaluation never calls this itself; callers read the clock once
/// and pass the instant down.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` string in the server's local time zone.
///
/// Returns `None` for malformed input and for local times that do not exist
/// or are ambiguous (DST transitions).
pub fn parse_local_datetime(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Errors produced when reading an `HH:MM` clock time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockParseError {
    #[error("expected HH:MM format")]
    BadShape,

    #[error("invalid hour '{0}'")]
    InvalidHour(String),

    #[error("invalid minute '{0}'")]
    InvalidMinute(String),

    #[error("hour must be 0-23, got {0}")]
    HourOutOfRange(u8),

    #[error("minute must be 0-59, got {0}")]
    MinuteOutOfRange(u8),
}

/// Wall-clock time of day with minute precision
///
/// Ordering is chronological within a single day. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parse `HH:MM` (a single-digit hour is accepted).
    pub fn parse(s: &str) -> Result<Self, ClockParseError> {
        let (hour_str, minute_str) = s.trim().split_once(':').ok_or(ClockParseError::BadShape)?;

        if hour_str.is_empty()
            || hour_str.len() > 2
            || !hour_str.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ClockParseError::InvalidHour(hour_str.to_string()));
        }
        if minute_str.len() != 2 || !minute_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ClockParseError::InvalidMinute(minute_str.to_string()));
        }

        let hour: u8 = hour_str
            .parse()
            .map_err(|_| ClockParseError::InvalidHour(hour_str.to_string()))?;
        let minute: u8 = minute_str
            .parse()
            .map_err(|_| ClockParseError::InvalidMinute(minute_str.to_string()))?;

        if hour >= 24 {
            return Err(ClockParseError::HourOutOfRange(hour));
        }
        if minute >= 60 {
            return Err(ClockParseError::MinuteOutOfRange(minute));
        }

        Ok(Self { hour, minute })
    }

    /// Truncates seconds: 17:00:59 reads as 17:00.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Returns minutes since midnight
    pub fn as_minutes_from_midnight(&self) -> u16 {
        (self.hour as u16) * 60 + self.minute as u16
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ClockParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// ISO day of the week, 1 = Monday through 7 = Sunday
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum IsoWeekday {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl IsoWeekday {
    pub const ALL: [IsoWeekday; 7] = [
        IsoWeekday::Monday,
        IsoWeekday::Tuesday,
        IsoWeekday::Wednesday,
        IsoWeekday::Thursday,
        IsoWeekday::Friday,
        IsoWeekday::Saturday,
        IsoWeekday::Sunday,
    ];

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1..=7 => Some(Self::ALL[(n - 1) as usize]),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn of(dt: &DateTime<Local>) -> Self {
        Self::from(dt.weekday())
    }
}

impl From<Weekday> for IsoWeekday {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl TryFrom<u8> for IsoWeekday {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or_else(|| format!("day of week must be 1-7, got {}", value))
    }
}

impl From<IsoWeekday> for u8 {
    fn from(value: IsoWeekday) -> Self {
        value.number()
    }
}

impl fmt::Display for IsoWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}
