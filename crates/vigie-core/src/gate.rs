//! Audited entry points for every caller of the evaluator

use chrono::{DateTime, Local};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{info, warn};
use vigie_config::LoginPolicy;
use vigie_store::{AuditEvent, AuditEventType, LoginRecord, Store};
use vigie_util::{ActorId, AttemptId};

use crate::{
    Decision, DecisionReason, EvaluationContext, ExplainService, Explanation, PolicyEvaluator,
};

/// The only text a refused login may show the end user.
/// Schedule contents are never revealed.
pub const DENIED_MESSAGE: &str = "connexion refusée";

/// A login (or session check) as seen by the authentication service.
///
/// The caller has already verified the password and rejected disabled
/// accounts before building this.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub actor: ActorId,
    pub role: String,
    /// Raw schedule column from the user record
    pub schedule_json: Option<String>,
    pub source_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl LoginAttempt {
    pub fn new(actor: impl Into<ActorId>, role: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            role: role.into(),
            schedule_json: None,
            source_ip: None,
            user_agent: None,
        }
    }

    pub fn with_schedule(mut self, schedule_json: impl Into<String>) -> Self {
        self.schedule_json = Some(schedule_json.into());
        self
    }

    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Which caller is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallSite {
    Login,
    SessionCheck,
}

/// Shared front door for login, session re-validation and explain.
///
/// Every decision is logged and written to the audit store. Audit failures
/// are logged and never change a decision.
pub struct LoginGate {
    evaluator: PolicyEvaluator,
    explainer: ExplainService,
    store: Arc<dyn Store>,
}

impl LoginGate {
    pub fn new(policy: LoginPolicy, store: Arc<dyn Store>) -> Self {
        info!(
            exempt_roles = ?policy.exempt_roles,
            fail_open = policy.fail_open,
            "Login gate initialized"
        );

        let evaluator = PolicyEvaluator::new(policy);
        Self {
            explainer: ExplainService::new(evaluator.clone()),
            evaluator,
            store,
        }
    }

    pub fn policy(&self) -> &LoginPolicy {
        self.evaluator.policy()
    }

    /// Decide whether a fresh login may proceed
    pub fn authorize_login(&self, attempt: &LoginAttempt, now: DateTime<Local>) -> Decision {
        self.decide(attempt, now, CallSite::Login)
    }

    /// Decide whether an open session may continue
    pub fn revalidate_session(&self, attempt: &LoginAttempt, now: DateTime<Local>) -> Decision {
        self.decide(attempt, now, CallSite::SessionCheck)
    }

    /// Operator preview of a decision. Audited as a preview, not a login.
    pub fn explain(
        &self,
        raw_schedule: Option<&str>,
        role: &str,
        now: DateTime<Local>,
    ) -> Explanation {
        let ctx = EvaluationContext::new(&now, role);
        let explanation = self.explainer.explain(raw_schedule, &ctx);

        self.append(AuditEventType::ExplainRequested {
            role: role.to_string(),
            reason: explanation.decision.reason.code().to_string(),
        });

        explanation
    }

    fn decide(&self, attempt: &LoginAttempt, now: DateTime<Local>, site: CallSite) -> Decision {
        let attempt_id = AttemptId::new();
        let decision =
            self.evaluator
                .authorize_login(attempt.schedule_json.as_deref(), &attempt.role, &now);

        if decision.authorized {
            info!(
                attempt = %attempt_id,
                actor = %attempt.actor,
                role = %attempt.role,
                reason = %decision.reason,
                site = ?site,
                "Login schedule allows access"
            );
        } else {
            warn!(
                attempt = %attempt_id,
                actor = %attempt.actor,
                role = %attempt.role,
                reason = %decision.reason,
                source_ip = ?attempt.source_ip,
                site = ?site,
                "Login schedule refuses access"
            );
        }

        if decision.reason == DecisionReason::MalformedInput {
            warn!(
                attempt = %attempt_id,
                actor = %attempt.actor,
                authorized = decision.authorized,
                "Schedule document for this user should be repaired"
            );
        }

        let record = LoginRecord {
            attempt_id,
            actor: attempt.actor.clone(),
            role: attempt.role.clone(),
            reason: decision.reason.code().to_string(),
            evaluated_at: now,
            source_ip: attempt.source_ip,
            user_agent: attempt.user_agent.clone(),
        };

        let event = match (site, decision.authorized) {
            (CallSite::Login, true) => AuditEventType::LoginAuthorized(record),
            (CallSite::Login, false) => AuditEventType::LoginDenied(record),
            (CallSite::SessionCheck, authorized) => {
                AuditEventType::SessionRevalidated { authorized, record }
            }
        };
        self.append(event);

        decision
    }

    fn append(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to record audit event");
        }
    }
}
