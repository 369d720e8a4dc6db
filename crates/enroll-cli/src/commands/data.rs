//! Refresh and clear commands
//!
//! Maintenance operations on persisted enrollment data.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use enroll_core::store::Layer;

use super::{resolve_session, GlobalOptions};

/// Arguments for the clear command
#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Session to clear
    #[arg(long, short, conflicts_with = "all")]
    pub session: Option<String>,

    /// Clear every session
    #[arg(long)]
    pub all: bool,

    /// Skip confirmation
    #[arg(long, short)]
    pub yes: bool,
}

/// Execute the refresh command
pub fn execute_refresh(globals: &GlobalOptions) -> Result<()> {
    let service = globals.new_service()?;
    match service.refresh() {
        Some(Layer::Remote) => println!("{} Loaded from durable store.", "✓".green()),
        Some(Layer::Local) => println!("{} Loaded local cache.", "✓".green()),
        Some(Layer::Default) => println!(
            "{} No stored data could be read, starting empty.",
            "⚠".yellow()
        ),
        None => println!("{} A load is already in progress.", "ℹ".blue()),
    }
    println!("  {} records", service.snapshot().record_count());
    Ok(())
}

/// Execute the clear command
pub fn execute_clear(globals: &GlobalOptions, args: ClearArgs) -> Result<()> {
    if args.session.is_none() && !args.all {
        anyhow::bail!("Specify --session <id> or --all");
    }

    let service = globals.open_service()?;
    let session = match &args.session {
        Some(raw) => Some(resolve_session(service.config(), Some(raw))?),
        None => None,
    };

    let target = match &session {
        Some(id) => format!("session {}", id),
        None => "every session".to_string(),
    };

    if !args.yes {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(format!("Delete all registrations for {}?", target))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Clear cancelled.");
            return Ok(());
        }
    }

    service
        .clear_data(session.as_ref())
        .with_context(|| format!("Failed to clear {}", target))?;
    println!("{} Cleared {}.", "✓".green(), target);
    Ok(())
}
