//! CLI Module
//!
//! Command-line interface for running focus sessions and rendering
//! soundscapes.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Deepwork - focus sessions with synthesized ambience
#[derive(Parser, Debug)]
#[command(name = "deepwork")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one focus session until the countdown expires or Ctrl-C
    #[command(name = "run")]
    Run {
        /// Planned duration in minutes
        #[arg(short, long, default_value_t = 25)]
        minutes: u32,

        /// Session id; a fresh UUID when omitted, non-UUID ids stay local
        #[arg(long)]
        id: Option<String>,

        /// Associated task reference
        #[arg(long)]
        task: Option<String>,

        /// Soundscape profile name
        #[arg(short, long, default_value = "silence")]
        soundscape: String,

        /// Volume in [0, 1]; defaults to the configured volume
        #[arg(long)]
        volume: Option<f32>,

        /// Countdown tick period in milliseconds
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,

        /// Focus quality recorded at the end (1-5)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        quality: Option<u8>,

        /// Notes recorded at the end
        #[arg(short, long)]
        notes: Option<String>,

        /// Parking-lot entry captured at start (repeatable)
        #[arg(long)]
        park: Vec<String>,
    },

    /// Render a soundscape to a WAV file
    #[command(name = "render")]
    Render {
        /// Soundscape profile name
        #[arg(short, long)]
        profile: String,

        /// Length in seconds
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        /// Volume in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        volume: f32,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List soundscape profiles
    #[command(name = "profiles")]
    Profiles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_parking_lot() {
        let cli = Cli::parse_from([
            "deepwork", "run", "--minutes", "50", "--park", "call bank", "--park", "buy milk",
            "-q", "4",
        ]);
        match cli.command {
            Some(Commands::Run {
                minutes,
                park,
                quality,
                ..
            }) => {
                assert_eq!(minutes, 50);
                assert_eq!(park, vec!["call bank", "buy milk"]);
                assert_eq!(quality, Some(4));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["deepwork", "run", "-q", "6"]).is_err());
    }
}
