//! Login schedule policy evaluator

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use vigie_config::LoginPolicy;
use vigie_schedule::{DayEntry, TimeWindow, WeeklySchedule, parse_schedule};
use vigie_util::{ClockTime, IsoWeekday};

/// Why a login was allowed or refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Role is exempt from schedules
    Bypassed,
    /// Nothing configured for the day
    NoRestriction,
    WithinWindow,
    OutsideWindow,
    DayDisabled,
    /// Schedule document could not be read
    MalformedInput,
}

impl DecisionReason {
    /// Stable snake_case code, as stored in the audit log
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bypassed => "bypassed",
            Self::NoRestriction => "no_restriction",
            Self::WithinWindow => "within_window",
            Self::OutsideWindow => "outside_window",
            Self::DayDisabled => "day_disabled",
            Self::MalformedInput => "malformed_input",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of a login authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub authorized: bool,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            authorized: true,
            reason,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            authorized: false,
            reason,
        }
    }
}

/// The moment and role a decision is made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub weekday: IsoWeekday,
    pub clock: ClockTime,
    pub role: String,
}

impl EvaluationContext {
    /// Day and minute of `now` in the server's local calendar
    pub fn new(now: &DateTime<Local>, role: impl Into<String>) -> Self {
        Self {
            weekday: IsoWeekday::of(now),
            clock: ClockTime::from_naive_time(now.time()),
            role: role.into(),
        }
    }

    pub fn at(weekday: IsoWeekday, clock: ClockTime, role: impl Into<String>) -> Self {
        Self {
            weekday,
            clock,
            role: role.into(),
        }
    }
}

/// A decision along with the schedule data that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<'a> {
    pub decision: Decision,
    /// Rules for the evaluated day, when they were consulted
    pub day_entry: Option<&'a DayEntry>,
    pub matched_window: Option<&'a TimeWindow>,
}

/// Applies a [`LoginPolicy`] to canonical schedules.
///
/// Evaluation is pure: the same schedule and context always produce the
/// same decision.
#[derive(Debug, Clone, Default)]
pub struct PolicyEvaluator {
    policy: LoginPolicy,
}

impl PolicyEvaluator {
    pub fn new(policy: LoginPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LoginPolicy {
        &self.policy
    }

    pub fn evaluate(
        &self,
        schedule: &WeeklySchedule,
        ctx: &EvaluationContext,
        parse_failed: bool,
    ) -> Decision {
        self.trace(schedule, ctx, parse_failed).decision
    }

    /// Same as [`PolicyEvaluator::evaluate`], keeping the day entry and
    /// matching window for diagnostics
    pub fn trace<'a>(
        &self,
        schedule: &'a WeeklySchedule,
        ctx: &EvaluationContext,
        parse_failed: bool,
    ) -> Evaluation<'a> {
        if self.policy.is_exempt(&ctx.role) {
            return outcome(Decision::allow(DecisionReason::Bypassed), None, None);
        }

        if parse_failed {
            let decision = Decision {
                authorized: self.policy.fail_open,
                reason: DecisionReason::MalformedInput,
            };
            return outcome(decision, None, None);
        }

        let Some(entry) = schedule.day(ctx.weekday) else {
            return outcome(Decision::allow(DecisionReason::NoRestriction), None, None);
        };

        if !entry.enabled {
            return outcome(Decision::deny(DecisionReason::DayDisabled), Some(entry), None);
        }

        if !entry.has_windows() {
            return outcome(Decision::allow(DecisionReason::NoRestriction), Some(entry), None);
        }

        match entry.matching_window(ctx.clock) {
            Some(window) => outcome(
                Decision::allow(DecisionReason::WithinWindow),
                Some(entry),
                Some(window),
            ),
            None => outcome(Decision::deny(DecisionReason::OutsideWindow), Some(entry), None),
        }
    }

    /// Decide a login from the raw schedule column of the user record.
    ///
    /// Exempt roles are decided before the document is even read.
    pub fn authorize_login(
        &self,
        raw_schedule: Option<&str>,
        role: &str,
        now: &DateTime<Local>,
    ) -> Decision {
        if self.policy.is_exempt(role) {
            return Decision::allow(DecisionReason::Bypassed);
        }

        let parsed = parse_schedule(raw_schedule);
        if let Some(fault) = &parsed.fault {
            warn!(
                %fault,
                format = %parsed.format,
                fail_open = self.policy.fail_open,
                "Unreadable login schedule"
            );
        }

        let ctx = EvaluationContext::new(now, role);
        let decision = self.evaluate(&parsed.schedule, &ctx, parsed.is_malformed());
        debug!(
            weekday = %ctx.weekday,
            clock = %ctx.clock,
            role,
            reason = %decision.reason,
            authorized = decision.authorized,
            "Login schedule evaluated"
        );
        decision
    }
}

fn outcome<'a>(
    decision: Decision,
    day_entry: Option<&'a DayEntry>,
    matched_window: Option<&'a TimeWindow>,
) -> Evaluation<'a> {
    Evaluation {
        decision,
        day_entry,
        matched_window,
    }
}
