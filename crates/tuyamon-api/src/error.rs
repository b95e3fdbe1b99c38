use thiserror::Error;

/// Top-level error type for the `tuyamon-api` crate.
///
/// Covers transport, envelope, and session failures of the cloud API.
/// `tuyamon-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, unknown account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The cloud no longer recognises the session id.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    ClientBuild(String),

    /// Unrecognised region code.
    #[error("Unknown region '{0}' (expected one of: us, eu, cn, in)")]
    UnknownRegion(String),

    // ── API ─────────────────────────────────────────────────────────
    /// The envelope reported `success: false`.
    #[error("Cloud API error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}
