//! vigie - login schedule tooling
//!
//! Command-line front end to the login schedule evaluator:
//! - `check` / `revalidate`: decide a login or session check, with audit
//! - `explain`: show why a decision was reached
//! - `lint`: report the format and problems of a schedule document
//! - `audit`: list recent audit records

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::io::Read;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vigie_config::{Config, load_config_or_default};
use vigie_core::{DENIED_MESSAGE, LoginAttempt, LoginGate};
use vigie_schedule::{DayEntry, parse_schedule};
use vigie_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use vigie_util::{
    AUDIT_DB_FILENAME, default_config_path, format_datetime_full, parse_local_datetime,
};

/// vigie - Weekly login schedule evaluator
#[derive(Parser, Debug)]
#[command(name = "vigie")]
#[command(about = "Evaluate, explain and lint weekly login schedules", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/vigie/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set VIGIE_DATA_DIR env var)
    #[arg(short, long, env = "VIGIE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decide a login attempt (exit code 1 when refused)
    Check(AttemptArgs),

    /// Re-check an open session (exit code 1 when refused)
    Revalidate(AttemptArgs),

    /// Explain the decision for a schedule, role and instant
    Explain(PreviewArgs),

    /// Report the format and problems of a schedule document
    Lint {
        /// Schedule JSON file, or `-` for stdin
        file: PathBuf,
    },

    /// Show recent audit records
    Audit {
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(ClapArgs, Debug)]
struct PreviewArgs {
    /// Schedule JSON file, or `-` for stdin (omit for no schedule)
    #[arg(short, long)]
    schedule: Option<PathBuf>,

    /// Role of the user
    #[arg(short, long)]
    role: String,

    /// Evaluate at this local time instead of now (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    at: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct AttemptArgs {
    #[command(flatten)]
    preview: PreviewArgs,

    /// Login of the user
    #[arg(long, default_value = "cli")]
    actor: String,

    /// Source address of the attempt
    #[arg(long)]
    ip: Option<IpAddr>,

    /// User agent of the attempt
    #[arg(long)]
    user_agent: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    debug!(
        config_path = %args.config.display(),
        exempt_roles = ?config.policy.exempt_roles,
        fail_open = config.policy.fail_open,
        "Configuration loaded"
    );

    match args.command {
        Command::Check(attempt) => decide(&config, args.data_dir, attempt, false),
        Command::Revalidate(attempt) => decide(&config, args.data_dir, attempt, true),
        Command::Explain(preview) => {
            let gate = open_gate(&config, args.data_dir)?;
            let raw = read_schedule(preview.schedule.as_deref())?;
            let now = resolve_instant(preview.at.as_deref())?;

            let explanation = gate.explain(raw.as_deref(), &preview.role, now);
            println!("{}", serde_json::to_string_pretty(&explanation)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Lint { file } => lint(&file),
        Command::Audit { limit } => {
            let store = open_store(&config, args.data_dir)?;
            for event in store.get_recent_audits(limit)? {
                println!(
                    "{} #{} {}",
                    format_datetime_full(&event.timestamp),
                    event.id,
                    serde_json::to_string(&event.event)?
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn decide(
    config: &Config,
    data_dir: Option<PathBuf>,
    args: AttemptArgs,
    session_check: bool,
) -> Result<ExitCode> {
    let gate = open_gate(config, data_dir)?;
    let now = resolve_instant(args.preview.at.as_deref())?;

    let mut attempt = LoginAttempt::new(args.actor, args.preview.role);
    attempt.schedule_json = read_schedule(args.preview.schedule.as_deref())?;
    attempt.source_ip = args.ip;
    attempt.user_agent = args.user_agent;

    let decision = if session_check {
        gate.revalidate_session(&attempt, now)
    } else {
        gate.authorize_login(&attempt, now)
    };

    println!("{}", serde_json::to_string(&decision)?);
    if decision.authorized {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", DENIED_MESSAGE);
        Ok(ExitCode::from(1))
    }
}

fn lint(file: &Path) -> Result<ExitCode> {
    let raw = read_schedule(Some(file))?;
    let parsed = parse_schedule(raw.as_deref());

    println!("Format: {}", parsed.format);
    for (day, entry) in parsed.schedule.iter() {
        println!("  {}: {}", day, describe_day(entry));
    }

    for issue in &parsed.issues {
        println!("  warning: {}", issue);
    }

    match &parsed.fault {
        Some(fault) => {
            println!("✗ Malformed schedule: {}", fault);
            Ok(ExitCode::from(1))
        }
        None => {
            println!("✓ Schedule is readable");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One-line summary of a day's rules, rejected windows included
fn describe_day(entry: &DayEntry) -> String {
    if !entry.enabled {
        return "disabled".to_string();
    }
    if !entry.has_windows() {
        return "unrestricted".to_string();
    }

    let mut parts: Vec<String> = entry
        .windows
        .iter()
        .map(|w| format!("{}-{}", w.start, w.end))
        .collect();
    parts.extend(entry.rejected.iter().map(|r| {
        format!(
            "rejected {}-{}",
            r.start.as_deref().unwrap_or("?"),
            r.end.as_deref().unwrap_or("?")
        )
    }));

    if entry.windows.is_empty() {
        parts.push("no valid window (denies)".to_string());
    }
    parts.join(", ")
}

fn open_store(config: &Config, data_dir: Option<PathBuf>) -> Result<Arc<dyn Store>> {
    let data_dir = data_dir.unwrap_or_else(|| config.service.data_dir.clone());

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(AUDIT_DB_FILENAME);
    let store: Arc<dyn Store> = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {:?}", db_path))?,
    );

    info!(db_path = %db_path.display(), "Store initialized");
    Ok(store)
}

fn open_gate(config: &Config, data_dir: Option<PathBuf>) -> Result<LoginGate> {
    let store = open_store(config, data_dir)?;
    store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;
    Ok(LoginGate::new(config.policy.clone(), store))
}

/// `None` means no schedule was given; `-` reads stdin
fn read_schedule(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };

    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read schedule from stdin")?;
        buf
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read schedule {:?}", path))?
    };

    Ok(Some(decode_schedule(bytes)))
}

/// Invalid UTF-8 is replaced rather than refused, so the document still
/// reaches the evaluator and gets a decision.
fn decode_schedule(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                valid_up_to = e.utf8_error().valid_up_to(),
                "Schedule is not valid UTF-8"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

fn resolve_instant(at: Option<&str>) -> Result<DateTime<Local>> {
    match at {
        None => Ok(vigie_util::now()),
        Some(s) => match parse_local_datetime(s) {
            Some(dt) => Ok(dt),
            None => bail!("Invalid --at value '{}': expected YYYY-MM-DD HH:MM:SS", s),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigie_schedule::parse_schedule_value;
    use vigie_util::IsoWeekday;

    fn monday(doc: serde_json::Value) -> DayEntry {
        parse_schedule_value(&doc)
            .schedule
            .day(IsoWeekday::Monday)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_decode_schedule_keeps_valid_text() {
        let text = r#"{"Lundi": {"enabled": false}}"#;
        assert_eq!(decode_schedule(text.as_bytes().to_vec()), text);
    }

    #[test]
    fn test_decode_schedule_replaces_invalid_bytes() {
        let mut bytes = br#"{"1": [{"start": "08:00", "end": "12:00"}]}"#.to_vec();
        bytes.push(0xff);

        let text = decode_schedule(bytes);
        assert!(text.ends_with('\u{FFFD}'));
        assert!(parse_schedule(Some(&text)).is_malformed());
    }

    #[test]
    fn test_describe_day() {
        assert_eq!(describe_day(&DayEntry::disabled()), "disabled");
        assert_eq!(describe_day(&DayEntry::unrestricted()), "unrestricted");

        let entry = monday(serde_json::json!({
            "1": [{"start": "08:00", "end": "12:00"}, {"start": "8h", "end": "17:00"}]
        }));
        assert_eq!(describe_day(&entry), "08:00-12:00, rejected 8h-17:00");
    }

    #[test]
    fn test_describe_day_with_only_rejected_windows() {
        let entry = monday(serde_json::json!({"1": [{"start": "8h", "end": "12:00"}]}));
        assert_eq!(
            describe_day(&entry),
            "rejected 8h-12:00, no valid window (denies)"
        );

        let entry = monday(serde_json::json!({"1": [{"end": "12:00"}]}));
        assert_eq!(describe_day(&entry), "rejected ?-12:00, no valid window (denies)");
    }
}
