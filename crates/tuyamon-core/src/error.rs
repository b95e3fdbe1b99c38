// ── Core error types ──
//
// Domain errors from tuyamon-core. Callers never see HTTP status codes
// or envelope parse failures directly; the `From<tuyamon_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the cloud API: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Cloud request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    /// A numeric field was recorded without a gauge being registered for
    /// it first. Indicates a device class whose map and derivation step
    /// disagree.
    #[error("No gauge registered for field '{field}'")]
    MissingGauge { field: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Cloud error code (e.g. "PERMISSION_DENIED").
        code: Option<String>,
    },

    // ── Metrics errors ───────────────────────────────────────────────
    #[error("Metrics error: {0}")]
    Metrics(String),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<tuyamon_api::Error> for CoreError {
    fn from(err: tuyamon_api::Error) -> Self {
        use tuyamon_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
            },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: e.status().map(|s| s.as_u16().to_string()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::ClientBuild(reason) => CoreError::ConnectionFailed { reason },
            ApiError::UnknownRegion(region) => CoreError::Config {
                message: format!("Unknown region '{region}'"),
            },
            ApiError::Api { code, message } => CoreError::Api { message, code },
            ApiError::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            ApiError::Serialization(message) => {
                CoreError::Internal(format!("Serialization error: {message}"))
            }
        }
    }
}

impl From<prometheus::Error> for CoreError {
    fn from(err: prometheus::Error) -> Self {
        CoreError::Metrics(err.to_string())
    }
}
