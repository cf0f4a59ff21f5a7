//! Schedule document formats and their detection

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use vigie_util::IsoWeekday;

/// Which encoding a raw schedule document uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFormat {
    /// Null, empty, or `{}`: nothing configured
    Absent,
    /// `{"1": [{"start", "end"}, ...], ...}` keyed by ISO day number
    NumericDayMap,
    /// `{"Lundi": {"enabled", "start", "end"}, ...}` keyed by French day name
    NamedDayMap,
    /// `[{"day" | "days", "start", "end"}, ...]`
    EntryList,
    /// None of the above
    Unknown,
}

impl fmt::Display for ScheduleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::NumericDayMap => "numeric day map",
            Self::NamedDayMap => "named day map",
            Self::EntryList => "entry list",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Classify a document.
///
/// Object keys are probed for ISO day numbers first, then French day names;
/// the first family with any matching key wins. Arrays are entry lists.
pub fn detect_format(value: &Value) -> ScheduleFormat {
    match value {
        Value::Null => ScheduleFormat::Absent,
        Value::Object(map) if map.is_empty() => ScheduleFormat::Absent,
        Value::Object(map) => {
            if map.keys().any(|k| day_from_number_key(k).is_some()) {
                ScheduleFormat::NumericDayMap
            } else if map.keys().any(|k| day_from_french_name(k).is_some()) {
                ScheduleFormat::NamedDayMap
            } else {
                ScheduleFormat::Unknown
            }
        }
        Value::Array(_) => ScheduleFormat::EntryList,
        _ => ScheduleFormat::Unknown,
    }
}

/// `"1"` through `"7"`, nothing else
pub fn day_from_number_key(key: &str) -> Option<IsoWeekday> {
    match key.as_bytes() {
        [digit @ b'1'..=b'7'] => IsoWeekday::from_number(digit - b'0'),
        _ => None,
    }
}

/// Case-insensitive French day name
pub fn day_from_french_name(name: &str) -> Option<IsoWeekday> {
    let name = name.trim();
    IsoWeekday::ALL
        .into_iter()
        .find(|day| french_day_name(*day).eq_ignore_ascii_case(name))
}

pub fn french_day_name(day: IsoWeekday) -> &'static str {
    match day {
        IsoWeekday::Monday => "Lundi",
        IsoWeekday::Tuesday => "Mardi",
        IsoWeekday::Wednesday => "Mercredi",
        IsoWeekday::Thursday => "Jeudi",
        IsoWeekday::Friday => "Vendredi",
        IsoWeekday::Saturday => "Samedi",
        IsoWeekday::Sunday => "Dimanche",
    }
}

/// JSON type name used in diagnostics
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
