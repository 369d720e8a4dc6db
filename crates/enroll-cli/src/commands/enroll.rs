//! Enroll command
//!
//! Register one participant and report the outcome.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use enroll_core::engine::EnrollOutcome;
use enroll_core::session::Candidate;
use enroll_core::types::AttendanceMode;

use super::{resolve_session, GlobalOptions};

/// Arguments for the enroll command
#[derive(Debug, Args)]
pub struct EnrollArgs {
    /// Participant name
    pub name: String,

    /// Register in the quota category
    #[arg(long)]
    pub quota: bool,

    /// Attendance mode (local or remote)
    #[arg(long, default_value_t = AttendanceMode::Local)]
    pub mode: AttendanceMode,

    /// Session to register for (defaults to the first configured session)
    #[arg(long, short)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the enroll command
pub fn execute(globals: &GlobalOptions, args: EnrollArgs) -> Result<()> {
    let service = globals.open_service()?;
    let session_id = resolve_session(service.config(), args.session.as_deref())?;
    let candidate = Candidate::new(args.name, args.quota, args.mode, session_id);

    let outcome = match service.enroll(&candidate) {
        Ok(outcome) => outcome,
        Err(err) => {
            if let Some(class) = err.persistence_class() {
                eprintln!("{} {}", "✗".red(), class.message());
            }
            return Err(err.into());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
        return Ok(());
    }

    let marker = match &outcome {
        EnrollOutcome::Enrolled { .. } => "✓".green(),
        EnrollOutcome::Queued { .. } | EnrollOutcome::AlreadyQueued { .. } => "ℹ".blue(),
        EnrollOutcome::Rejected { .. } => "✗".red(),
    };
    println!("{} {}", marker, outcome.message());

    if let Some(participant) = outcome.participant() {
        println!("  ID: {}", participant.id.to_string().dimmed());
    }
    Ok(())
}

fn outcome_json(outcome: &EnrollOutcome) -> serde_json::Value {
    let status = match outcome {
        EnrollOutcome::Enrolled { .. } => "enrolled",
        EnrollOutcome::Queued { .. } => "queued",
        EnrollOutcome::AlreadyQueued { .. } => "already_queued",
        EnrollOutcome::Rejected { .. } => "rejected",
    };
    let mut value = serde_json::json!({
        "status": status,
        "success": outcome.is_success(),
        "added_to_queue": outcome.added_to_queue(),
        "message": outcome.message(),
    });
    if let Some(participant) = outcome.participant() {
        value["participant"] = serde_json::json!(participant);
    }
    match outcome {
        EnrollOutcome::AlreadyQueued { rank, .. } => value["rank"] = serde_json::json!(rank),
        EnrollOutcome::Rejected { reason, .. } => {
            value["reason"] = serde_json::json!(reason.to_string())
        }
        _ => {}
    }
    value
}
