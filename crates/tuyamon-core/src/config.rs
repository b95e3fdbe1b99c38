// ── Runtime exporter configuration ──
//
// These types describe how to reach the cloud and how often to poll.
// They carry credential data and timing, but never touch disk; the
// binary builds an `ExporterConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use tuyamon_api::Region;
use url::Url;

/// Credentials and endpoint for the cloud API.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub region: Region,
    /// Overrides the region's API host (testing, proxies).
    pub base_url: Option<Url>,
    pub app_key: String,
    pub app_secret: SecretString,
    pub email: String,
    pub password: SecretString,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

/// Poll loop and refresh timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    /// Delay between the end of one poll cycle and the start of the next.
    pub poll_delay: Duration,
    /// Minimum age of the device list before a cycle refreshes it.
    pub refresh_interval: Duration,
    /// Devices whose newest data point is older than this are dropped on refresh.
    pub inactive_timeout: Duration,
    /// Upper bound for one poll cycle, including a due refresh.
    pub cycle_watchdog: Duration,
    /// Upper bound for login plus the initial refresh.
    pub startup_watchdog: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(2),
            refresh_interval: Duration::from_secs(60 * 60),
            inactive_timeout: Duration::from_secs(30 * 60),
            cycle_watchdog: Duration::from_secs(30),
            startup_watchdog: Duration::from_secs(30),
        }
    }
}

/// Everything the core needs to run.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub cloud: CloudConfig,
    pub timings: PollTimings,
}
