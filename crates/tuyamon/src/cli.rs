//! Clap derive structures for the `tuyamon` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// tuyamon: Prometheus exporter and control endpoint for Tuya smart sockets
#[derive(Debug, Parser)]
#[command(
    name = "tuyamon",
    version,
    about = "Export Tuya smart-socket telemetry to Prometheus and switch sockets over HTTP",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the JSON config file [default: config/config.json]
    #[arg(long, short = 'c', env = "TUYAMON_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// HTTP listen address (overrides the config file)
    #[arg(long, short = 'l', global = true)]
    pub listen: Option<SocketAddr>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the cloud and serve metrics and control requests
    Serve,

    /// Print every device's current fields as JSON
    Devices,

    /// Switch a device on or off
    Power(PowerArgs),
}

#[derive(Debug, Args)]
pub struct PowerArgs {
    /// Device name (case and separators are ignored)
    pub device: String,

    /// Desired state
    #[arg(value_enum)]
    pub state: PowerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}
