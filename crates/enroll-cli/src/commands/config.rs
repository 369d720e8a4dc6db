//! Config command
//!
//! Inspect and create workshop-enroll configuration.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use enroll_core::config::EnrollConfig;
use std::fs;

use super::GlobalOptions;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show effective configuration
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration
    Validate,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file without confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Execute the config command
pub fn execute(globals: &GlobalOptions, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(globals, json),
        ConfigCommand::Validate => validate_config(globals),
        ConfigCommand::Init { force } => init_config(globals, force),
    }
}

/// Hide secrets before printing
fn redacted(mut config: EnrollConfig) -> EnrollConfig {
    if config.store.api_key.is_some() {
        config.store.api_key = Some("********".to_string());
    }
    config
}

fn show_config(globals: &GlobalOptions, as_json: bool) -> Result<()> {
    let config = redacted(globals.load_config()?);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "Configuration:".bold().underline());
    if globals.config_path.exists() {
        println!("{}", globals.config_path.display().to_string().dimmed());
    } else {
        println!("{}", "(defaults, no config file)".dimmed());
    }
    println!();
    println!("{}", config.to_toml_string()?);
    Ok(())
}

fn validate_config(globals: &GlobalOptions) -> Result<()> {
    let path = &globals.config_path;

    if !path.exists() {
        eprintln!(
            "{} Configuration not found at {}, defaults apply",
            "⚠".yellow(),
            path.display()
        );
        return Ok(());
    }

    let config = globals.load_config()?;
    println!("{} Configuration is valid", "✓".green());
    println!(
        "  {} sessions, capacity {} ({} quota, {} regular)",
        config.sessions.list.len(),
        config.capacity.max_capacity,
        config.capacity.quota_spots,
        config.capacity.non_quota_spots
    );
    if config.store.is_remote_configured() {
        println!("  Durable store: {}", config.store.url.as_deref().unwrap_or_default().cyan());
    } else {
        println!("  {} Durable store not configured, local cache only", "⚠".yellow());
    }
    Ok(())
}

fn init_config(globals: &GlobalOptions, force: bool) -> Result<()> {
    let path = &globals.config_path;

    if path.exists() && !force {
        use dialoguer::Confirm;

        let confirmed = Confirm::new()
            .with_prompt(format!("Overwrite {}?", path.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = format!(
        "# workshop-enroll configuration\n\n{}",
        EnrollConfig::default().to_toml_string()?
    );
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} Wrote default configuration to {}", "✓".green(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn globals(temp: &TempDir) -> GlobalOptions {
        GlobalOptions {
            config_path: temp.path().join("nested").join("config.toml"),
            store_url: None,
            store_key: None,
        }
    }

    #[test]
    fn test_redacted_hides_key() {
        let mut config = EnrollConfig::default();
        config.store.api_key = Some("secret".to_string());
        assert_eq!(redacted(config).store.api_key.as_deref(), Some("********"));
        assert_eq!(redacted(EnrollConfig::default()).store.api_key, None);
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let globals = globals(&temp);

        init_config(&globals, true).unwrap();
        assert!(globals.config_path.exists());

        let config = globals.load_config().unwrap();
        assert_eq!(config.capacity.max_capacity, 20);
        assert_eq!(config.sessions.list.len(), 2);
        assert!(config.gate.is_some());
    }

    #[test]
    fn test_validate_missing_file_is_ok() {
        let temp = TempDir::new().unwrap();
        validate_config(&globals(&temp)).unwrap();
    }
}
