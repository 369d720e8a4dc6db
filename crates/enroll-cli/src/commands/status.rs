//! Status, stats and sessions commands
//!
//! Read-only views over the loaded enrollment state.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use enroll_core::session::{Participant, SessionStats};
use enroll_core::types::SessionId;
use enroll_core::EnrollmentService;

use super::{resolve_session, GlobalOptions};

/// Arguments for the status command
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Session to show (defaults to every session)
    #[arg(long, short)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the stats command
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Session to show (defaults to every session)
    #[arg(long, short)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the sessions command
#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn selected_sessions(service: &EnrollmentService, arg: Option<&str>) -> Result<Vec<SessionId>> {
    match arg {
        Some(_) => Ok(vec![resolve_session(service.config(), arg)?]),
        None => Ok(service.config().session_ids()),
    }
}

/// Execute the status command
pub fn execute_status(globals: &GlobalOptions, args: StatusArgs) -> Result<()> {
    let service = globals.open_service()?;
    let sessions = selected_sessions(&service, args.session.as_deref())?;

    if args.json {
        let mut map = serde_json::Map::new();
        for id in &sessions {
            map.insert(id.to_string(), serde_json::to_value(service.state(id)?)?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    for id in &sessions {
        let state = service.state(id)?;
        println!("{}", format!("Session {}", id).bold().underline());
        if let Some(descriptor) = service.config().session(id) {
            println!("{}", format!("{} {}", descriptor.date, descriptor.time_slot).dimmed());
        }
        println!();

        println!("  {} ({})", "Enrolled".green(), state.enrolled_count());
        print_participants(&state.enrolled);
        println!("  {} ({})", "Waiting list".yellow(), state.queue_len());
        print_participants(&state.waiting_queue);
        println!();
    }
    Ok(())
}

fn print_participants(participants: &[Participant]) {
    if participants.is_empty() {
        println!("    {}", "none".dimmed());
        return;
    }
    for (i, p) in participants.iter().enumerate() {
        let category = if p.needs_quota_category {
            "quota".cyan()
        } else {
            "regular".normal()
        };
        println!(
            "    {:>2}. {} [{}, {}] {}",
            i + 1,
            p.name,
            category,
            p.attendance_mode,
            p.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
        );
    }
}

/// Execute the stats command
pub fn execute_stats(globals: &GlobalOptions, args: StatsArgs) -> Result<()> {
    let service = globals.open_service()?;
    let sessions = selected_sessions(&service, args.session.as_deref())?;
    let stats = sessions
        .iter()
        .map(|id| service.stats(id))
        .collect::<enroll_core::Result<Vec<_>>>()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let limits = service.engine().limits();
    for s in &stats {
        print_stats(s, limits.quota_spots, limits.non_quota_spots, limits.max_capacity);
    }
    Ok(())
}

fn print_stats(stats: &SessionStats, quota_spots: usize, non_quota_spots: usize, capacity: usize) {
    let header = if stats.is_full() {
        format!("Session {} (full)", stats.session_id).red()
    } else {
        format!("Session {}", stats.session_id).normal()
    };
    println!("{}", header.bold());
    println!("  Enrolled:      {}/{}", stats.total, capacity);
    println!(
        "  Quota:         {}/{} ({} left)",
        stats.quota_count, quota_spots, stats.remaining_quota
    );
    println!(
        "  Regular:       {}/{} ({} left)",
        stats.non_quota_count, non_quota_spots, stats.remaining_non_quota
    );
    println!("  Waiting list:  {}", stats.queue_length);
    println!(
        "  Attendance:    {} local, {} remote",
        stats.local_count, stats.remote_count
    );
    println!();
}

/// Execute the sessions command
pub fn execute_sessions(globals: &GlobalOptions, args: SessionsArgs) -> Result<()> {
    let config = globals.load_config()?;
    let sessions = &config.sessions.list;

    if args.json {
        println!("{}", serde_json::to_string_pretty(sessions)?);
        return Ok(());
    }

    println!("{}", "Sessions:".bold().underline());
    println!();
    for (i, s) in sessions.iter().enumerate() {
        let mut line = format!("  {} {} {}", s.id.to_string().green(), s.date, s.time_slot);
        if i == 0 {
            line.push_str(&format!(" {}", "(primary)".dimmed()));
        }
        if let Some(gate) = config.gate.as_ref().filter(|g| g.session_id == s.id) {
            line.push_str(&format!(
                " {}",
                format!(
                    "early registration limited to {} waiting list until {}",
                    gate.source_session_id,
                    gate.cutoff.format("%Y-%m-%d %H:%M UTC")
                )
                .yellow()
            ));
        }
        println!("{}", line);
    }
    Ok(())
}
