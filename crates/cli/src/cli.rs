//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Outfall - concurrent record drain for structured streams
#[derive(Parser, Debug)]
#[command(
    name = "outfall",
    author,
    version,
    about = "Concurrent record drain for structured streams",
    long_about = "Drains structured record streams into configured destinations.\n\n\
                  Loads a blueprint, assembles one drain stage per destination with \n\
                  a bounded pool of writer workers, feeds it synthetic records, and \n\
                  shuts everything down cleanly at end of stream or on Ctrl-C."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OUTFALL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OUTFALL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the drain pipeline
    Run(RunArgs),

    /// Validate a blueprint file without running
    Validate(ValidateArgs),

    /// Display version and blueprint format information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to blueprint file (TOML or JSON)
    #[arg(short, long, default_value = "outfall.toml", env = "OUTFALL_CONFIG")]
    pub config: PathBuf,

    /// Stop after this many seconds (0 = run until end of stream)
    #[arg(long, default_value = "0", env = "OUTFALL_DURATION")]
    pub duration: u64,

    /// Override the number of payloads the feed emits (0 = unbounded)
    #[arg(long, env = "OUTFALL_PAYLOADS")]
    pub payloads: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OUTFALL_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to blueprint file to validate
    #[arg(short, long, default_value = "outfall.toml")]
    pub config: PathBuf,

    /// Show the full destination table with params
    #[arg(long)]
    pub detailed: bool,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Print a commented example blueprint instead of version info
    #[arg(long)]
    pub example_config: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
