//! Canonical weekly schedule

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vigie_util::{ClockTime, IsoWeekday};

/// Inclusive `[start, end]` clock range within a single calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeWindow {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Both bounds count as inside. A window with `start > end` never matches.
    pub fn contains(&self, clock: ClockTime) -> bool {
        self.start <= clock && clock <= self.end
    }

    /// True for windows like 22:00-02:00 that would need to cross midnight
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// A window whose bounds could not be read. It never matches, but it still
/// marks its day as restricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedWindow {
    /// Raw start bound, if one was present
    pub start: Option<String>,
    /// Raw end bound, if one was present
    pub end: Option<String>,
    pub reason: String,
}

/// Login rules for one day of the week
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub enabled: bool,
    #[serde(default)]
    pub windows: Vec<TimeWindow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedWindow>,
}

impl DayEntry {
    /// Enabled day with no hours configured
    pub fn unrestricted() -> Self {
        Self {
            enabled: true,
            windows: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Day on which logging in is refused outright
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            windows: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn with_windows(windows: Vec<TimeWindow>) -> Self {
        Self {
            enabled: true,
            windows,
            rejected: Vec::new(),
        }
    }

    /// Whether any window, readable or not, was configured for the day
    pub fn has_windows(&self) -> bool {
        !self.windows.is_empty() || !self.rejected.is_empty()
    }

    /// First window containing `clock`, in configuration order
    pub fn matching_window(&self, clock: ClockTime) -> Option<&TimeWindow> {
        self.windows.iter().find(|w| w.contains(clock))
    }

    pub(crate) fn push(&mut self, window: Result<TimeWindow, RejectedWindow>) {
        match window {
            Ok(w) => self.windows.push(w),
            Err(r) => self.rejected.push(r),
        }
    }
}

/// Per-ISO-day login rules, independent of the document format they came from.
///
/// A day with no entry has no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    days: BTreeMap<IsoWeekday, DayEntry>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, day: IsoWeekday) -> Option<&DayEntry> {
        self.days.get(&day)
    }

    /// Replace the rules for `day`
    pub fn set_day(&mut self, day: IsoWeekday, entry: DayEntry) {
        self.days.insert(day, entry);
    }

    /// Builder-style variant of [`WeeklySchedule::set_day`]
    pub fn with_day(mut self, day: IsoWeekday, entry: DayEntry) -> Self {
        self.set_day(day, entry);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (IsoWeekday, &DayEntry)> {
        self.days.iter().map(|(day, entry)| (*day, entry))
    }

    pub(crate) fn contains_day(&self, day: IsoWeekday) -> bool {
        self.days.contains_key(&day)
    }

    pub(crate) fn entry_mut(&mut self, day: IsoWeekday) -> &mut DayEntry {
        self.days.entry(day).or_insert_with(DayEntry::unrestricted)
    }
}
