//! Deepwork CLI - Focus Session Controller
//!
//! Command-line interface for running focus sessions.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use deepwork::cli::commands::{self, RunOptions};
use deepwork::cli::{Cli, Commands};
use deepwork::{Config, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Deepwork v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = dispatch(cli).await {
        error!("[{}] {}", e.error_code(), e);
        for suggestion in e.recovery_suggestions() {
            eprintln!("  - {}", suggestion);
        }
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config).await,
        None => {
            println!("Deepwork v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

async fn handle_command(cmd: Commands, config: &Config) -> Result<()> {
    match cmd {
        Commands::Run {
            minutes,
            id,
            task,
            soundscape,
            volume,
            tick_ms,
            quality,
            notes,
            park,
        } => {
            let options = RunOptions {
                minutes,
                id,
                task,
                soundscape,
                volume,
                quality,
                notes,
                park,
            };
            commands::run(options, Duration::from_millis(tick_ms.max(1)), config).await
        }
        Commands::Render {
            profile,
            seconds,
            volume,
            output,
        } => commands::render(&profile, seconds, volume, &output, config),
        Commands::Profiles => commands::list_profiles(),
    }
}
