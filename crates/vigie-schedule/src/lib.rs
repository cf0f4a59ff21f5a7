//! Login schedule documents for vigie
//!
//! User records store their weekly login hours as free-form JSON in one of
//! three shapes:
//! - numeric day map: `{"1": [{"start": "08:00", "end": "12:00"}]}`
//! - named day map: `{"Lundi": {"enabled": true, "start": "08:00", "end": "17:00"}}`
//! - entry list: `[{"days": [1, 2], "start": "08:00", "end": "17:00"}]`
//!
//! [`parse_schedule`] detects the shape and normalizes it into a
//! [`WeeklySchedule`]. It never fails; unreadable documents come back empty
//! with a [`ScheduleFault`] attached.

mod format;
mod model;
mod parser;

pub use format::*;
pub use model::*;
pub use parser::*;
