//! Kestrel CLI
//!
//! Runs simulated launches of the session orchestrator against scripted
//! collaborators and inspects the effective configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use kestrel_session::SessionConfig;

#[derive(Parser)]
#[command(name = "kestrel")]
#[command(about = "Kestrel - wallet session bootstrap simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".kestrel/config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one launch from a scenario file and print what the UI saw
    Simulate {
        /// Scenario file (TOML with a `[scenario]` table)
        scenario: PathBuf,

        /// Also print the collaborator call journal
        #[arg(short, long)]
        journal: bool,
    },

    /// Print the effective session configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SessionConfig::load(&cli.config)?;

    let log_filter = if cli.verbose {
        "debug"
    } else {
        config.log_filter.as_str()
    };
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    match cli.command {
        Commands::Simulate { scenario, journal } => {
            commands::simulate::run(&scenario, config, journal).await?;
        }
        Commands::Config => {
            commands::show_config::run(&config)?;
        }
    }

    Ok(())
}
