//! Read-only decision explanations for the operator console

use serde::Serialize;
use vigie_schedule::{
    DayEntry, ScheduleFault, ScheduleFormat, ScheduleIssue, TimeWindow, parse_schedule,
};
use vigie_util::{ClockTime, IsoWeekday};

use crate::{Decision, EvaluationContext, PolicyEvaluator};

/// Why a decision came out the way it did
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub decision: Decision,
    pub weekday: IsoWeekday,
    pub clock: ClockTime,
    pub format: ScheduleFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_window: Option<TimeWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_entry: Option<DayEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<ScheduleFault>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ScheduleIssue>,
}

/// Runs the login pipeline and reports its intermediate results.
///
/// Never use an explanation to gate a login; go through
/// [`PolicyEvaluator::authorize_login`] or [`crate::LoginGate`].
#[derive(Debug, Clone, Default)]
pub struct ExplainService {
    evaluator: PolicyEvaluator,
}

impl ExplainService {
    pub fn new(evaluator: PolicyEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn explain(&self, raw_schedule: Option<&str>, ctx: &EvaluationContext) -> Explanation {
        let parsed = parse_schedule(raw_schedule);
        let trace = self
            .evaluator
            .trace(&parsed.schedule, ctx, parsed.is_malformed());

        Explanation {
            decision: trace.decision,
            weekday: ctx.weekday,
            clock: ctx.clock,
            format: parsed.format,
            matched_window: trace.matched_window.copied(),
            day_entry: trace.day_entry.cloned(),
            fault: parsed.fault.clone(),
            issues: parsed.issues.clone(),
        }
    }
}
