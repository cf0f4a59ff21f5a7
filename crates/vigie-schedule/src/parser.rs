//! Normalization of raw schedule documents into a [`WeeklySchedule`]

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;
use vigie_util::{ClockTime, IsoWeekday};

use crate::format::{day_from_french_name, day_from_number_key, detect_format, json_type_name};
use crate::{DayEntry, RejectedWindow, ScheduleFormat, TimeWindow, WeeklySchedule};

/// Why a whole document was discarded
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum ScheduleFault {
    #[error("not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("unrecognized schedule shape (top-level {found})")]
    UnknownShape { found: String },

    #[error("at {path}: expected {expected}, found {found}")]
    UnexpectedType {
        path: String,
        expected: String,
        found: String,
    },
}

impl ScheduleFault {
    fn unexpected(path: impl Into<String>, expected: &str, found: &Value) -> Self {
        Self::UnexpectedType {
            path: path.into(),
            expected: expected.to_string(),
            found: json_type_name(found).to_string(),
        }
    }
}

/// Non-fatal finding about a document. Issues never change a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ScheduleIssue {
    #[error("ignored key '{key}'")]
    IgnoredKey { key: String },

    #[error("{day}: '{key}' repeats an earlier key for the same day and was ignored")]
    DuplicateDay { day: IsoWeekday, key: String },

    #[error("{day}: window skipped ({reason})")]
    InvalidWindow { day: IsoWeekday, reason: String },

    #[error("{day}: window {start}-{end} crosses midnight and can never match")]
    InvertedWindow {
        day: IsoWeekday,
        start: ClockTime,
        end: ClockTime,
    },

    #[error("{day}: empty window list denies the whole day")]
    EmptyWindowList { day: IsoWeekday },

    #[error("{day}: only one of start/end is set, the day is unrestricted")]
    PartialBounds { day: IsoWeekday },

    #[error("entry {entry}: day {value} is outside 1-7")]
    DayOutOfRange { entry: usize, value: i64 },

    #[error("entry {entry}: applies to no day")]
    EntryMatchesNoDay { entry: usize },
}

/// Result of normalizing a schedule document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSchedule {
    pub schedule: WeeklySchedule,
    pub format: ScheduleFormat,
    /// Set when the document was discarded; the schedule is then empty
    pub fault: Option<ScheduleFault>,
    pub issues: Vec<ScheduleIssue>,
}

impl ParsedSchedule {
    fn absent() -> Self {
        Self {
            schedule: WeeklySchedule::new(),
            format: ScheduleFormat::Absent,
            fault: None,
            issues: Vec::new(),
        }
    }

    fn malformed(format: ScheduleFormat, fault: ScheduleFault) -> Self {
        debug!(%format, %fault, "Schedule document discarded");
        Self {
            schedule: WeeklySchedule::new(),
            format,
            fault: Some(fault),
            issues: Vec::new(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        self.fault.is_some()
    }
}

/// Parse the raw text of a schedule column.
///
/// `None`, blank text and `null` mean nothing is configured. Never fails:
/// unreadable input comes back as an empty schedule with a fault.
pub fn parse_schedule(raw: Option<&str>) -> ParsedSchedule {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return ParsedSchedule::absent();
    };

    match serde_json::from_str::<Value>(text) {
        Ok(value) => parse_schedule_value(&value),
        Err(e) => ParsedSchedule::malformed(
            ScheduleFormat::Unknown,
            ScheduleFault::InvalidJson {
                message: e.to_string(),
            },
        ),
    }
}

/// Parse an already-decoded schedule document.
///
/// A JSON string holding an encoded object or array is decoded once more.
pub fn parse_schedule_value(value: &Value) -> ParsedSchedule {
    if let Value::String(inner) = value {
        return match serde_json::from_str::<Value>(inner) {
            Ok(decoded @ (Value::Object(_) | Value::Array(_))) => parse_document(&decoded),
            _ => ParsedSchedule::malformed(
                ScheduleFormat::Unknown,
                ScheduleFault::UnknownShape {
                    found: "string".into(),
                },
            ),
        };
    }

    parse_document(value)
}

fn parse_document(value: &Value) -> ParsedSchedule {
    let format = detect_format(value);

    let result = match (format, value) {
        (ScheduleFormat::Absent, _) => return ParsedSchedule::absent(),
        (ScheduleFormat::NumericDayMap, Value::Object(map)) => parse_numeric_map(map),
        (ScheduleFormat::NamedDayMap, Value::Object(map)) => parse_named_map(map),
        (ScheduleFormat::EntryList, Value::Array(entries)) => parse_entry_list(entries),
        _ => Err(ScheduleFault::UnknownShape {
            found: json_type_name(value).into(),
        }),
    };

    match result {
        Ok(builder) => {
            debug!(
                %format,
                days = builder.schedule.iter().count(),
                issues = builder.issues.len(),
                "Schedule document parsed"
            );
            ParsedSchedule {
                schedule: builder.schedule,
                format,
                fault: None,
                issues: builder.issues,
            }
        }
        Err(fault) => ParsedSchedule::malformed(format, fault),
    }
}

#[derive(Default)]
struct Builder {
    schedule: WeeklySchedule,
    issues: Vec<ScheduleIssue>,
}

impl Builder {
    fn add_window(&mut self, day: IsoWeekday, window: Result<TimeWindow, RejectedWindow>) {
        match &window {
            Ok(w) if w.is_inverted() => self.issues.push(ScheduleIssue::InvertedWindow {
                day,
                start: w.start,
                end: w.end,
            }),
            Err(rejected) => self.issues.push(ScheduleIssue::InvalidWindow {
                day,
                reason: rejected.reason.clone(),
            }),
            Ok(_) => {}
        }
        self.schedule.entry_mut(day).push(window);
    }
}

fn parse_numeric_map(map: &Map<String, Value>) -> Result<Builder, ScheduleFault> {
    let mut builder = Builder::default();

    for (key, value) in map {
        let Some(day) = day_from_number_key(key) else {
            builder.issues.push(ScheduleIssue::IgnoredKey { key: key.clone() });
            continue;
        };

        let Value::Array(windows) = value else {
            return Err(ScheduleFault::unexpected(key.as_str(), "array of windows", value));
        };

        if windows.is_empty() {
            builder.schedule.set_day(day, DayEntry::disabled());
            builder.issues.push(ScheduleIssue::EmptyWindowList { day });
            continue;
        }

        for window in windows {
            builder.add_window(day, read_window(window));
        }
    }

    Ok(builder)
}

fn parse_named_map(map: &Map<String, Value>) -> Result<Builder, ScheduleFault> {
    let mut builder = Builder::default();

    for (key, value) in map {
        let Some(day) = day_from_french_name(key) else {
            builder.issues.push(ScheduleIssue::IgnoredKey { key: key.clone() });
            continue;
        };

        let Value::Object(fields) = value else {
            return Err(ScheduleFault::unexpected(key.as_str(), "object", value));
        };

        if builder.schedule.contains_day(day) {
            builder.issues.push(ScheduleIssue::DuplicateDay {
                day,
                key: key.clone(),
            });
            continue;
        }

        let enabled = match fields.get("enabled") {
            None | Some(Value::Null) => true,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(ScheduleFault::unexpected(
                    format!("{}.enabled", key),
                    "boolean",
                    other,
                ));
            }
        };

        if !enabled {
            builder.schedule.set_day(day, DayEntry::disabled());
            continue;
        }

        let start = fields.get("start").filter(|v| is_set(v));
        let end = fields.get("end").filter(|v| is_set(v));

        match (start, end) {
            (Some(_), Some(_)) => builder.add_window(day, read_window(value)),
            (None, None) => builder.schedule.set_day(day, DayEntry::unrestricted()),
            _ => {
                builder.schedule.set_day(day, DayEntry::unrestricted());
                builder.issues.push(ScheduleIssue::PartialBounds { day });
            }
        }
    }

    Ok(builder)
}

fn parse_entry_list(entries: &[Value]) -> Result<Builder, ScheduleFault> {
    let mut builder = Builder::default();

    for (index, entry) in entries.iter().enumerate() {
        let Value::Object(fields) = entry else {
            return Err(ScheduleFault::unexpected(format!("[{}]", index), "object", entry));
        };

        let days = entry_days(fields, index, &mut builder.issues)?;
        if days.is_empty() {
            builder.issues.push(ScheduleIssue::EntryMatchesNoDay { entry: index });
            continue;
        }

        let window = read_window(entry);
        for day in days {
            builder.add_window(day, window.clone());
        }
    }

    Ok(builder)
}

/// Days an entry applies to: the union of `day` and `days`, or the whole
/// week when neither is given.
fn entry_days(
    fields: &Map<String, Value>,
    index: usize,
    issues: &mut Vec<ScheduleIssue>,
) -> Result<BTreeSet<IsoWeekday>, ScheduleFault> {
    let mut numbers = Vec::new();
    let mut specified = false;

    match fields.get("day") {
        None | Some(Value::Null) => {}
        Some(Value::Number(n)) if n.as_i64().is_some() => {
            specified = true;
            numbers.extend(n.as_i64());
        }
        Some(other) => {
            return Err(ScheduleFault::unexpected(format!("[{}].day", index), "integer", other));
        }
    }

    match fields.get("days") {
        None | Some(Value::Null) => {}
        Some(Value::Array(list)) => {
            specified = true;
            for (i, item) in list.iter().enumerate() {
                match item.as_i64() {
                    Some(n) => numbers.push(n),
                    None => {
                        return Err(ScheduleFault::unexpected(
                            format!("[{}].days[{}]", index, i),
                            "integer",
                            item,
                        ));
                    }
                }
            }
        }
        Some(other) => {
            return Err(ScheduleFault::unexpected(
                format!("[{}].days", index),
                "array of integers",
                other,
            ));
        }
    }

    if !specified {
        return Ok(IsoWeekday::ALL.into_iter().collect());
    }

    let mut days = BTreeSet::new();
    for value in numbers {
        match u8::try_from(value).ok().and_then(IsoWeekday::from_number) {
            Some(day) => {
                days.insert(day);
            }
            None => issues.push(ScheduleIssue::DayOutOfRange { entry: index, value }),
        }
    }
    Ok(days)
}

/// Read a `{start, end}` object. Problems are confined to the window.
fn read_window(value: &Value) -> Result<TimeWindow, RejectedWindow> {
    let Value::Object(fields) = value else {
        return Err(RejectedWindow {
            start: None,
            end: None,
            reason: format!("window is a {}, not an object", json_type_name(value)),
        });
    };

    let start_raw = fields.get("start");
    let end_raw = fields.get("end");

    match (read_bound("start", start_raw), read_bound("end", end_raw)) {
        (Ok(start), Ok(end)) => Ok(TimeWindow::new(start, end)),
        (start, end) => {
            let reason = [start.err(), end.err()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join("; ");
            Err(RejectedWindow {
                start: start_raw.map(raw_text),
                end: end_raw.map(raw_text),
                reason,
            })
        }
    }
}

fn read_bound(name: &str, value: Option<&Value>) -> Result<ClockTime, String> {
    match value {
        None | Some(Value::Null) => Err(format!("missing {}", name)),
        Some(Value::String(s)) => {
            ClockTime::parse(s).map_err(|e| format!("{} '{}': {}", name, s, e))
        }
        Some(other) => Err(format!("{} is a {}, not a string", name, json_type_name(other))),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Form submissions leave unset bounds as `null` or `""`
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}
