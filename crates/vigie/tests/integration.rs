//! Integration tests for vigie
//!
//! These tests drive the full pipeline: config, schedule parsing,
//! evaluation and the audit store.

use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use vigie_config::parse_config;
use vigie_core::{
    Decision, DecisionReason, EvaluationContext, ExplainService, LoginAttempt, LoginGate,
    PolicyEvaluator,
};
use vigie_schedule::{ScheduleFormat, parse_schedule};
use vigie_store::{AuditEventType, SqliteStore, Store};
use vigie_util::{ClockTime, IsoWeekday};

// 2025-12-29 is a Monday; 2026-01-03 is a Saturday
fn monday(hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 12, 29, hour, minute, 0).unwrap()
}

fn saturday(hour: u32, minute: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 1, 3, hour, minute, 0).unwrap()
}

fn authorize(raw: Option<&str>, role: &str, now: DateTime<Local>) -> Decision {
    PolicyEvaluator::default().authorize_login(raw, role, &now)
}

#[test]
fn test_exempt_role_always_authorized() {
    let schedules = [
        None,
        Some("not json"),
        Some(r#"{"Samedi": {"enabled": false}}"#),
        Some(r#"{"1": []}"#),
        Some(r#"[{"start": "00:00", "end": "00:01"}]"#),
    ];

    for raw in schedules {
        for role in ["superadmin", "SUPERADMIN", "SuperAdmin"] {
            for now in [monday(3, 0), saturday(12, 0), monday(23, 59)] {
                assert_eq!(
                    authorize(raw, role, now),
                    Decision::allow(DecisionReason::Bypassed),
                    "raw {:?} role {}",
                    raw,
                    role
                );
            }
        }
    }
}

#[test]
fn test_absent_schedule_is_unrestricted() {
    for raw in [None, Some(""), Some("null"), Some("{}")] {
        for now in [monday(0, 0), saturday(23, 59)] {
            assert_eq!(
                authorize(raw, "agent", now),
                Decision::allow(DecisionReason::NoRestriction)
            );
        }
    }
}

#[test]
fn test_named_day_window() {
    let raw = r#"{"Lundi": {"enabled": true, "start": "08:00", "end": "17:00"}}"#;

    assert_eq!(
        authorize(Some(raw), "agent", monday(9, 0)),
        Decision::allow(DecisionReason::WithinWindow)
    );
    assert_eq!(
        authorize(Some(raw), "agent", monday(18, 0)),
        Decision::deny(DecisionReason::OutsideWindow)
    );
}

#[test]
fn test_named_day_disabled() {
    let raw = r#"{"Samedi": {"enabled": false}}"#;

    for (hour, minute) in [(0, 0), (8, 30), (12, 0), (23, 59)] {
        assert_eq!(
            authorize(Some(raw), "agent", saturday(hour, minute)),
            Decision::deny(DecisionReason::DayDisabled)
        );
    }
}

#[test]
fn test_numeric_day_windows() {
    let raw = r#"{"1": [{"start":"08:00","end":"12:00"}, {"start":"14:00","end":"18:00"}]}"#;

    assert!(authorize(Some(raw), "agent", monday(15, 0)).authorized);
    assert!(!authorize(Some(raw), "agent", monday(13, 0)).authorized);
}

#[test]
fn test_malformed_document_fails_open() {
    for raw in ["not json", r#""not json""#, "[1, 2, 3]", r#"{"weekdays": "8-17"}"#] {
        assert_eq!(
            authorize(Some(raw), "agent", monday(3, 0)),
            Decision::allow(DecisionReason::MalformedInput),
            "raw {}",
            raw
        );
    }
}

#[test]
fn test_boundaries_are_inclusive() {
    let raw = r#"[{"day": 1, "start": "08:00", "end": "17:00"}]"#;

    assert!(authorize(Some(raw), "agent", monday(8, 0)).authorized);
    assert!(authorize(Some(raw), "agent", monday(17, 0)).authorized);
    // seconds are truncated: 17:00:59 still reads as 17:00
    let late = Local.with_ymd_and_hms(2025, 12, 29, 17, 0, 59).unwrap();
    assert!(authorize(Some(raw), "agent", late).authorized);
    assert!(!authorize(Some(raw), "agent", monday(7, 59)).authorized);
    assert!(!authorize(Some(raw), "agent", monday(17, 1)).authorized);
}

#[test]
fn test_overnight_window_never_matches() {
    let raw = r#"{"1": [{"start": "22:00", "end": "02:00"}]}"#;

    for hour in [0, 1, 2, 12, 22, 23] {
        assert_eq!(
            authorize(Some(raw), "agent", monday(hour, 0)),
            Decision::deny(DecisionReason::OutsideWindow)
        );
    }
}

#[test]
fn test_evaluation_is_idempotent() {
    let raw = r#"{"Lundi": {"enabled": true, "start": "08:00", "end": "17:00"}}"#;
    let parsed = parse_schedule(Some(raw));
    let evaluator = PolicyEvaluator::default();
    let noon = ClockTime::new(12, 0).unwrap();
    let ctx = EvaluationContext::at(IsoWeekday::Monday, noon, "agent");

    let first = evaluator.evaluate(&parsed.schedule, &ctx, parsed.is_malformed());
    for _ in 0..10 {
        assert_eq!(
            evaluator.evaluate(&parsed.schedule, &ctx, parsed.is_malformed()),
            first
        );
    }
}

#[test]
fn test_all_formats_agree_on_equivalent_schedules() {
    let numeric = r#"{"1": [{"start": "08:00", "end": "17:00"}]}"#;
    let named = r#"{"Lundi": {"enabled": true, "start": "08:00", "end": "17:00"}}"#;
    let list = r#"[{"day": 1, "start": "08:00", "end": "17:00"}]"#;

    assert_eq!(parse_schedule(Some(numeric)).format, ScheduleFormat::NumericDayMap);
    assert_eq!(parse_schedule(Some(named)).format, ScheduleFormat::NamedDayMap);
    assert_eq!(parse_schedule(Some(list)).format, ScheduleFormat::EntryList);

    assert_eq!(
        parse_schedule(Some(numeric)).schedule,
        parse_schedule(Some(named)).schedule
    );
    assert_eq!(
        parse_schedule(Some(named)).schedule,
        parse_schedule(Some(list)).schedule
    );
}

#[test]
fn test_configured_policy_drives_gate() {
    let config = parse_config(
        r#"
        config_version = 1

        [policy]
        exempt_roles = ["superadmin", "chef-de-poste"]
        fail_open = false
        "#,
    )
    .unwrap();

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let gate = LoginGate::new(config.policy, store.clone());

    let chef = LoginAttempt::new("chef.traore", "Chef-De-Poste")
        .with_schedule(r#"{"Samedi": {"enabled": false}}"#);
    assert_eq!(
        gate.authorize_login(&chef, saturday(10, 0)),
        Decision::allow(DecisionReason::Bypassed)
    );

    let agent = LoginAttempt::new("agent.kone", "agent").with_schedule("{broken");
    assert_eq!(
        gate.authorize_login(&agent, saturday(10, 0)),
        Decision::deny(DecisionReason::MalformedInput)
    );

    let events = store.get_recent_audits(10).unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0].event,
        AuditEventType::LoginDenied(r) if r.reason == "malformed_input"
    ));
    assert!(matches!(
        &events[1].event,
        AuditEventType::LoginAuthorized(r) if r.reason == "bypassed"
    ));
}

#[test]
fn test_login_and_session_check_share_one_evaluator() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let gate = LoginGate::new(Default::default(), store.clone());
    let attempt = LoginAttempt::new("agent.kone", "agent")
        .with_schedule(r#"[{"days": [1, 2, 3, 4, 5], "start": "07:00", "end": "19:00"}]"#)
        .with_source_ip("10.1.2.3".parse().unwrap())
        .with_user_agent("curl/8.0");

    let login = gate.authorize_login(&attempt, monday(18, 30));
    let later = gate.revalidate_session(&attempt, monday(19, 30));

    assert_eq!(login, Decision::allow(DecisionReason::WithinWindow));
    assert_eq!(later, Decision::deny(DecisionReason::OutsideWindow));

    let events = store.get_recent_audits(10).unwrap();
    match &events[0].event {
        AuditEventType::SessionRevalidated { authorized, record } => {
            assert!(!authorized);
            assert_eq!(record.source_ip, attempt.source_ip);
            assert_eq!(record.user_agent.as_deref(), Some("curl/8.0"));
            assert_eq!(record.evaluated_at, monday(19, 30));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_explain_service_matches_gate() {
    let raw = r#"{
        "Lundi": {"enabled": true, "start": "08:00", "end": "17:00"},
        "Samedi": {"enabled": false}
    }"#;
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let gate = LoginGate::new(Default::default(), store);
    let service = ExplainService::default();

    for now in [monday(7, 0), monday(9, 0), saturday(9, 0)] {
        let ctx = EvaluationContext::new(&now, "agent");
        let explanation = service.explain(Some(raw), &ctx);
        let attempt = LoginAttempt::new("agent.kone", "agent").with_schedule(raw);
        assert_eq!(explanation.decision, gate.authorize_login(&attempt, now));
    }
}

#[test]
fn test_audit_log_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    let db_path = dir.path().join(vigie_util::AUDIT_DB_FILENAME);
    std::fs::write(
        &config_path,
        "config_version = 1\n\n[policy]\nexempt_roles = [\"superadmin\"]\n",
    )
    .unwrap();

    let config = vigie_config::load_config(&config_path).unwrap();
    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        let gate = LoginGate::new(config.policy.clone(), store);
        let attempt = LoginAttempt::new("agent.kone", "agent")
            .with_schedule(r#"{"Samedi": {"enabled": false}}"#);
        assert!(!gate.authorize_login(&attempt, saturday(9, 0)).authorized);
    }

    let reopened = SqliteStore::open(&db_path).unwrap();
    assert!(reopened.is_healthy());
    let events = reopened.get_recent_audits(10).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0].event,
        AuditEventType::LoginDenied(r) if r.reason == "day_disabled"
    ));
}
