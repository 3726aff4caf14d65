//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "hydro", version, about = "Hydroponic tank controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/hydro.toml")]
    pub config: PathBuf,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Latest controller state, rewritten by `run` and read by `snapshot` and `health`
    #[arg(long = "status-file", value_name = "PATH", default_value = "hydro-status.json")]
    pub status_file: PathBuf,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control and telemetry loops until Ctrl-C
    Run {
        /// Stop after this many control cycles
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Append telemetry records to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        telemetry_file: Option<PathBuf>,
    },
    /// Print the latest telemetry record of the running controller
    Snapshot,
    /// Quick sensor and output check (hardware presence / sim ok)
    SelfCheck,
    /// Health of the running controller for operational monitoring
    Health,
}
