//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use vigie_util::{ActorId, AttemptId};

/// One evaluated login or session check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub attempt_id: AttemptId,
    pub actor: ActorId,
    pub role: String,
    /// Decision reason code (e.g. `outside_window`)
    pub reason: String,
    /// Instant the schedule was evaluated for
    pub evaluated_at: DateTime<Local>,
    pub source_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Types of audit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service or CLI started against this store
    ServiceStarted,

    /// Login allowed by the schedule
    LoginAuthorized(LoginRecord),

    /// Login refused by the schedule
    LoginDenied(LoginRecord),

    /// An open session was checked against the schedule again
    SessionRevalidated {
        authorized: bool,
        #[serde(flatten)]
        record: LoginRecord,
    },

    /// Operator previewed a decision
    ExplainRequested { role: String, reason: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: vigie_util::now(),
            event,
        }
    }
}
