//! Command definitions for the Tabata timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::types::{Command, IntervalPlan};

// ============================================================================
// CLI Structure
// ============================================================================

/// Tabata interval timer with spoken announcements
#[derive(Parser, Debug)]
#[command(
    name = "tabata",
    version,
    about = "Tabata interval timer with spoken announcements",
    long_about = "Controls a background Tabata timer daemon over a Unix socket.\n\
                  The daemon is started automatically on first use and announces \
                  every round through the default audio output.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start a new session
    Start(StartArgs),

    /// Stop the running session
    Stop,

    /// Show current timer status
    Status,

    /// Shut the daemon down
    Quit,

    /// Play one voice clip on this machine's audio output
    CheckAudio(CheckAudioArgs),

    /// Run as daemon (started automatically by the other commands)
    #[command(hide = true)]
    Daemon(DaemonArgs),
}

impl Commands {
    /// The protocol command this subcommand sends, if any.
    pub fn to_command(&self) -> Option<Command> {
        match self {
            Commands::Start(args) => Some(Command::Start(args.plan())),
            Commands::Stop => Some(Command::Stop),
            Commands::Status => Some(Command::Status),
            Commands::Quit => Some(Command::Quit),
            Commands::CheckAudio(_) | Commands::Daemon(_) => None,
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the start command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StartArgs {
    /// Work interval in seconds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub work_sec: u32,

    /// Rest interval in seconds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub rest_sec: u32,

    /// Number of rounds
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub rounds: u32,
}

impl StartArgs {
    /// The interval plan described by these arguments.
    pub fn plan(&self) -> IntervalPlan {
        IntervalPlan {
            work_seconds: self.work_sec,
            rest_seconds: self.rest_sec,
            rounds: self.rounds,
        }
    }
}

impl Default for StartArgs {
    fn default() -> Self {
        let plan = IntervalPlan::default();
        Self {
            work_sec: plan.work_seconds,
            rest_sec: plan.rest_seconds,
            rounds: plan.rounds,
        }
    }
}

/// Arguments for the hidden daemon command
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonArgs {
    /// Socket to listen on (defaults to the configured path)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Discard all audio instead of opening the output device
    #[arg(long)]
    pub mute: bool,
}

/// Arguments for the check-audio command
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CheckAudioArgs {
    /// Clip name, e.g. `round`, `num7` or `message001`
    #[arg(default_value = "done")]
    pub clip: String,
}

// ============================================================================
// Tests
// ============================================================================
