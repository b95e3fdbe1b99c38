//! Configuration for the tuyamon exporter.
//!
//! A JSON document (by default `./config/config.json`) merged with
//! `TUYAMON_`-prefixed environment variables, validated and translated to
//! `tuyamon_core::ExporterConfig`. Environment keys are the file's keys in
//! SCREAMING_SNAKE_CASE, nested with a double underscore
//! (`TUYAMON_APP_KEY`, `TUYAMON_TIMINGS__POLL_DELAY=5`).

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

use tuyamon_api::Region;
use tuyamon_core::{CloudConfig, ExporterConfig, PollTimings};

/// Config file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TUYAMON_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// What to do when login or the initial refresh fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupFailurePolicy {
    /// Exit with a non-zero status.
    #[default]
    Exit,
    /// Log and keep serving, never becoming ready.
    Idle,
}

/// Top-level configuration document. Keys are camelCase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(deserialize_with = "scalar_string")]
    pub app_key: String,

    #[serde(deserialize_with = "secret")]
    pub app_secret: SecretString,

    /// Cloud region code (`us`, `eu`, `cn`, `in`).
    pub country_code: String,

    pub email: String,

    #[serde(deserialize_with = "secret")]
    pub password: SecretString,

    /// Overrides the region's API host.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// HTTP listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub startup_failure: StartupFailurePolicy,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub timings: Timings,
}

/// Poll timing overrides, in seconds. Unset values keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    #[serde(default)]
    pub poll_delay: Option<u64>,
    #[serde(default)]
    pub refresh_interval: Option<u64>,
    #[serde(default)]
    pub inactive_timeout: Option<u64>,
    #[serde(default)]
    pub cycle_watchdog: Option<u64>,
    #[serde(default)]
    pub startup_watchdog: Option<u64>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8001))
}
fn default_request_timeout() -> u64 {
    10
}

/// Environment values that look numeric arrive as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

fn secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_string(deserializer).map(SecretString::from)
}

// ── Loading ─────────────────────────────────────────────────────────

/// The figment used by [`load_config`]: file first, environment on top.
pub fn figment(path: &Path) -> Figment {
    let env = Env::prefixed(ENV_PREFIX)
        .split("__")
        .map(|key| camel_case_key(key.as_str()).into())
        .lowercase(false);

    Figment::new().merge(Json::file(path)).merge(env)
}

/// `TIMINGS.POLL_DELAY` -> `timings.pollDelay`
fn camel_case_key(key: &str) -> String {
    key.split('.')
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for ch in segment.chars() {
                if ch == '_' {
                    upper = !out.is_empty();
                } else if upper {
                    out.push(ch.to_ascii_uppercase());
                    upper = false;
                } else {
                    out.push(ch.to_ascii_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Load and validate configuration from `path` plus the environment.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    extract(&figment(path))
}

/// Extract and validate a `Config` from any figment.
pub fn extract(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// `path` if given, else [`DEFAULT_CONFIG_PATH`].
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("appKey", &self.app_key), ("email", &self.email)] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must not be empty".into(),
                });
            }
        }
        self.region()?;
        Ok(())
    }

    /// Parsed `countryCode`.
    pub fn region(&self) -> Result<Region, ConfigError> {
        self.country_code
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "countryCode".into(),
                reason: format!("unknown region '{}'", self.country_code),
            })
    }

    /// Poll timings with overrides applied.
    pub fn poll_timings(&self) -> PollTimings {
        let defaults = PollTimings::default();
        let pick = |value: Option<u64>, default: Duration| value.map_or(default, Duration::from_secs);

        PollTimings {
            poll_delay: pick(self.timings.poll_delay, defaults.poll_delay),
            refresh_interval: pick(self.timings.refresh_interval, defaults.refresh_interval),
            inactive_timeout: pick(self.timings.inactive_timeout, defaults.inactive_timeout),
            cycle_watchdog: pick(self.timings.cycle_watchdog, defaults.cycle_watchdog),
            startup_watchdog: pick(self.timings.startup_watchdog, defaults.startup_watchdog),
        }
    }

    /// Build the core's runtime configuration.
    pub fn to_exporter_config(&self) -> Result<ExporterConfig, ConfigError> {
        Ok(ExporterConfig {
            cloud: CloudConfig {
                region: self.region()?,
                base_url: self.base_url.clone(),
                app_key: self.app_key.clone(),
                app_secret: self.app_secret.clone(),
                email: self.email.clone(),
                password: self.password.clone(),
                timeout: Duration::from_secs(self.request_timeout),
            },
            timings: self.poll_timings(),
        })
    }
}
