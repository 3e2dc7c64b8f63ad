//! CLI argument definitions
//!
//! All Clap derive structs for `trafficlight` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;
use crate::phase::Phase;

// ============================================================================
// Root CLI
// ============================================================================

/// Two-phase traffic light on a randomized schedule.
#[derive(Parser, Debug)]
#[command(name = "trafficlight", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRAFFICLIGHT_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "TRAFFICLIGHT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a light and report every phase change.
    Run(RunArgs),

    /// Run a light until it changes into the target phase.
    Wait(WaitArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Run / Wait
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRAFFICLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the initial phase.
    #[arg(long)]
    pub initial_phase: Option<Phase>,

    /// Seed the cycle schedule for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many phase changes.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cycles: Option<u64>,

    /// Stop after this much time (e.g. `30s`, `2m`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Write JSONL events to this file (`-` for stdout).
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "TRAFFICLIGHT_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `wait`.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Phase to wait for.
    #[arg(short, long)]
    pub target: Phase,

    /// Give up after this much time (e.g. `7s`).
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub deadline: Option<Duration>,

    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRAFFICLIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Version
// ============================================================================

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
