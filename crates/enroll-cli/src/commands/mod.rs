//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod config;
pub mod data;
pub mod enroll;
pub mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use enroll_core::config::EnrollConfig;
use enroll_core::types::SessionId;
use enroll_core::EnrollmentService;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = ".workshop-enroll/config.toml";

/// workshop-enroll - Workshop enrollment with quotas and waiting lists
#[derive(Debug, Parser)]
#[command(name = "workshop-enroll")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Durable store base URL (overrides store.url)
    #[arg(long, global = true, env = "WORKSHOP_ENROLL_STORE_URL")]
    pub store_url: Option<String>,

    /// Durable store API key (overrides store.api_key)
    #[arg(long, global = true, env = "WORKSHOP_ENROLL_STORE_KEY", hide_env_values = true)]
    pub store_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a participant for a session
    Enroll(enroll::EnrollArgs),

    /// Show enrolled participants and waiting lists
    Status(status::StatusArgs),

    /// Show seat counts per session
    Stats(status::StatsArgs),

    /// List configured sessions
    Sessions(status::SessionsArgs),

    /// Reload state from the durable store
    Refresh,

    /// Delete registrations for one session or all sessions
    Clear(data::ClearArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config_path: PathBuf,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
}

impl GlobalOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config_path: cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            store_url: cli.store_url.clone(),
            store_key: cli.store_key.clone(),
        }
    }

    /// Load the config file and apply command-line overrides
    pub fn load_config(&self) -> Result<EnrollConfig> {
        tracing::debug!("Using config {}", self.config_path.display());
        let mut config = load_config_file(&self.config_path)?;
        if let Some(url) = &self.store_url {
            config.store.url = Some(url.clone());
        }
        if let Some(key) = &self.store_key {
            config.store.api_key = Some(key.clone());
        }
        Ok(config)
    }

    /// Load config and open the stores without loading state
    pub fn new_service(&self) -> Result<EnrollmentService> {
        let config = self.load_config()?;
        let store = enroll_storage::open_session_store(&config)
            .context("Failed to open enrollment store")?;
        Ok(EnrollmentService::new(config, store)?)
    }

    /// Load config, open the stores and load persisted state
    pub fn open_service(&self) -> Result<EnrollmentService> {
        let service = self.new_service()?;
        service.refresh();
        Ok(service)
    }
}

fn load_config_file(path: &Path) -> Result<EnrollConfig> {
    EnrollConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolve a session argument, defaulting to the primary session
pub fn resolve_session(config: &EnrollConfig, arg: Option<&str>) -> Result<SessionId> {
    match arg {
        Some(raw) => {
            let id = SessionId::from_string(raw)?;
            if config.session(&id).is_none() {
                anyhow::bail!(
                    "Unknown session '{}'. Configured: {}",
                    id,
                    config
                        .session_ids()
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Ok(id)
        }
        None => config
            .primary_session()
            .cloned()
            .context("No sessions configured"),
    }
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let globals = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Enroll(args) => enroll::execute(&globals, args),
        Commands::Status(args) => status::execute_status(&globals, args),
        Commands::Stats(args) => status::execute_stats(&globals, args),
        Commands::Sessions(args) => status::execute_sessions(&globals, args),
        Commands::Refresh => data::execute_refresh(&globals),
        Commands::Clear(args) => data::execute_clear(&globals, args),
        Commands::Config(cmd) => config::execute(&globals, cmd),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
