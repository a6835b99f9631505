//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod helpers;
mod sources;
mod state;
mod tick;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "seatwatch")]
#[command(about = "Opera ticket monitor: reports adjacent free seats for chosen productions")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "SEATWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run one monitoring tick: collect, check, notify new facts
    Tick {
        /// Keep running, one tick every monitor.tick_interval_secs
        #[arg(short, long)]
        daemon: bool,
    },

    /// Inspect or edit the notified-facts state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },

    /// Classify a single ticket page
    Check {
        /// Ticket page URL
        url: String,
        /// Adjacent seats required (defaults to monitor.min_adjacent_seats)
        #[arg(short = 'n', long)]
        min_adjacent: Option<u32>,
    },

    /// Fetch repertoire listings only (no checks, no notifications)
    Sources {
        /// Only theaters whose name or city contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List notified facts
    Show,
    /// Forget all notified facts
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Drop facts about performances that already took place
    Prune,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    match &config.source_path {
        Some(path) => tracing::debug!("Using config {}", path.display()),
        None => tracing::debug!("Using built-in configuration"),
    }

    match cli.command {
        Commands::Tick { daemon } => tick::cmd_tick(&config, daemon).await,
        Commands::State { command } => match command {
            StateCommands::Show => state::cmd_state_show(&config),
            StateCommands::Reset { yes } => state::cmd_state_reset(&config, yes),
            StateCommands::Prune => state::cmd_state_prune(&config),
        },
        Commands::Check { url, min_adjacent } => {
            check::cmd_check(&config, &url, min_adjacent).await
        }
        Commands::Sources { filter } => sources::cmd_sources(&config, filter.as_deref()).await,
    }
}
