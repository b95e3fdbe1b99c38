//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `ConfigError`, and `PollFailure` into user-facing
//! errors with actionable help text and distinct exit codes.

use miette::Diagnostic;
use thiserror::Error;

use tuyamon_config::ConfigError;
use tuyamon_core::{CoreError, PollFailure};

/// Process exit codes.
///
/// 1, 2 and 3 are the poll loop's crash codes. clap exits with 2 on a
/// usage error as well; that happens before any polling and prints `Usage`
/// on stderr. Codes from 4 up are unique.
pub mod exit_code {
    pub const GENERAL: u8 = 1;
    /// Shared with clap's usage error.
    pub const CYCLE_WATCHDOG: u8 = 2;
    pub const STARTUP: u8 = 3;
    pub const NOT_FOUND: u8 = 4;
    pub const CONFIG: u8 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration ({path})")]
    #[diagnostic(
        code(tuyamon::config),
        help(
            "Expected a JSON file with appKey, appSecret, countryCode, email, and password.\n\
             Pass --config <path> or set TUYAMON_* environment variables."
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Device '{name}' not found")]
    #[diagnostic(
        code(tuyamon::not_found),
        help("Run: tuyamon devices to see available devices")
    )]
    DeviceNotFound { name: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(tuyamon::auth_failed),
        help("Check email, password, appKey, and countryCode in the config file.")
    )]
    AuthFailed { message: String },

    #[error(transparent)]
    #[diagnostic(code(tuyamon::core))]
    Core(CoreError),

    #[error("Poll loop stopped: {0}")]
    #[diagnostic(code(tuyamon::poll))]
    Poll(#[from] PollFailure),

    #[error("Cannot bind HTTP listener on {addr}")]
    #[diagnostic(code(tuyamon::listen), help("Choose another address with --listen."))]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot encode JSON output: {0}")]
    #[diagnostic(code(tuyamon::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Poll(failure) => failure.exit_code(),
            Self::AuthFailed { .. } => exit_code::STARTUP,
            Self::DeviceNotFound { .. } => exit_code::NOT_FOUND,
            Self::Config { .. } => exit_code::CONFIG,
            Self::Core(_) | Self::Bind { .. } | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            other => CliError::Core(other),
        }
    }
}
