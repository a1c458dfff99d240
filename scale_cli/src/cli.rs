//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG: &str = "etc/scale_config.toml";

#[derive(Parser, Debug)]
#[command(name = "scale_cli", version, about = "Serial scale discovery and polling")]
pub struct Cli {
    /// Path to config TOML (default: etc/scale_config.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print events and errors as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Explicit scale location, bypassing discovery.
#[derive(clap::Args, Debug, Clone)]
pub struct LocationArgs {
    /// Serial port the scale is attached to
    #[arg(long, value_name = "PORT", requires = "baud")]
    pub port: Option<String>,
    /// Baud rate of the scale
    #[arg(long, value_name = "BPS", requires = "port")]
    pub baud: Option<u32>,
}

impl LocationArgs {
    pub fn location(&self) -> Option<scale_core::DeviceLocation> {
        match (&self.port, self.baud) {
            (Some(port), Some(baud)) => Some(scale_core::DeviceLocation::new(port.clone(), baud)),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every candidate port and baud rate for a scale
    Discover {
        /// Candidate ports, in probe order (overrides config)
        #[arg(long, value_name = "PORTS", value_delimiter = ',')]
        ports: Option<Vec<String>>,
        /// Candidate baud rates, in probe order (overrides config)
        #[arg(long, value_name = "BAUDS", value_delimiter = ',')]
        bauds: Option<Vec<u32>>,
    },
    /// Discover the scale (unless given) and print weights until the budget runs out or Ctrl-C
    Watch {
        #[command(flatten)]
        location: LocationArgs,
        /// Session budget in milliseconds (overrides config)
        #[arg(long = "budget-ms", value_name = "MS")]
        budget_ms: Option<u64>,
    },
    /// Take a single manual reading
    Read {
        #[command(flatten)]
        location: LocationArgs,
        /// Run discovery first when no location is given
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "port")]
        discover: bool,
    },
    /// Show the candidate ports and the ports the OS reports
    ListPorts,
}
