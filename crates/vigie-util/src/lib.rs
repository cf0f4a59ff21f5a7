//! Shared utilities for vigie
//!
//! This crate provides:
//! - ID types (ActorId, AttemptId)
//! - Clock primitives (ClockTime, IsoWeekday) and a mockable `now()`
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
