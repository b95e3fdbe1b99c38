// ── Poll loop ──
//
// Login and initial refresh under a startup watchdog, then an endless
// sequence of cycles: refresh the device set when due, read every device
// in turn, record the results. Each cycle runs under its own watchdog.
//
// The loop never retries. The first error or watchdog expiry clears the
// ready flag and ends the loop with a `PollFailure`; deciding what to do
// with the process is left to the caller.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::cloud::CloudApi;
use crate::config::PollTimings;
use crate::error::CoreError;
use crate::store::DeviceRegistry;

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PollState {
    Starting,
    Idle,
    Refreshing,
    Polling,
    Failed,
}

/// Which watchdog-guarded phase failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PollPhase {
    Startup,
    Cycle,
}

/// Terminal outcome of the poll loop.
#[derive(Debug, Error)]
pub enum PollFailure {
    #[error("{phase} watchdog expired after {after:?}")]
    Watchdog { phase: PollPhase, after: Duration },

    #[error("{phase} failed: {source}")]
    Failed { phase: PollPhase, source: CoreError },
}

impl PollFailure {
    pub fn phase(&self) -> PollPhase {
        match self {
            Self::Watchdog { phase, .. } | Self::Failed { phase, .. } => *phase,
        }
    }

    /// Process exit code for this failure: 3 for any startup failure,
    /// 2 for a cycle watchdog, 1 for a cycle error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Watchdog {
                phase: PollPhase::Startup,
                ..
            }
            | Self::Failed {
                phase: PollPhase::Startup,
                ..
            } => 3,
            Self::Watchdog {
                phase: PollPhase::Cycle,
                ..
            } => 2,
            Self::Failed {
                phase: PollPhase::Cycle,
                ..
            } => 1,
        }
    }
}

/// Drives login, refresh, and periodic collection.
pub struct PollLoop {
    cloud: Arc<dyn CloudApi>,
    registry: Arc<DeviceRegistry>,
    timings: PollTimings,
    state: watch::Sender<PollState>,
    ready: watch::Sender<bool>,
}

impl PollLoop {
    pub fn new(cloud: Arc<dyn CloudApi>, registry: Arc<DeviceRegistry>, timings: PollTimings) -> Self {
        let (state, _) = watch::channel(PollState::Starting);
        let (ready, _) = watch::channel(false);
        Self {
            cloud,
            registry,
            timings,
            state,
            ready,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn state(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// `true` once a cycle has completed, `false` again after a failure.
    pub fn ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Login and build the initial device set.
    pub async fn startup(&self) -> Result<(), PollFailure> {
        self.state.send_replace(PollState::Starting);

        let work = async {
            self.cloud.login().await?;
            self.state.send_replace(PollState::Refreshing);
            self.registry.refresh().await
        };

        match timeout(self.timings.startup_watchdog, work).await {
            Ok(Ok(())) => {
                self.state.send_replace(PollState::Idle);
                info!(devices = self.registry.len(), "startup complete");
                Ok(())
            }
            Ok(Err(source)) => Err(self.fail(PollFailure::Failed {
                phase: PollPhase::Startup,
                source,
            })),
            Err(_) => Err(self.fail(PollFailure::Watchdog {
                phase: PollPhase::Startup,
                after: self.timings.startup_watchdog,
            })),
        }
    }

    /// Run one poll cycle under the cycle watchdog.
    pub async fn cycle(&self) -> Result<(), PollFailure> {
        match timeout(self.timings.cycle_watchdog, self.collect()).await {
            Ok(Ok(count)) => {
                self.state.send_replace(PollState::Idle);
                self.ready.send_replace(true);
                debug!(devices = count, "poll cycle complete");
                Ok(())
            }
            Ok(Err(source)) => Err(self.fail(PollFailure::Failed {
                phase: PollPhase::Cycle,
                source,
            })),
            Err(_) => Err(self.fail(PollFailure::Watchdog {
                phase: PollPhase::Cycle,
                after: self.timings.cycle_watchdog,
            })),
        }
    }

    /// Run cycles back to back, `poll_delay` apart, until one fails.
    pub async fn poll_forever(&self) -> Result<Infallible, PollFailure> {
        loop {
            self.cycle().await?;
            tokio::time::sleep(self.timings.poll_delay).await;
        }
    }

    /// Startup followed by `poll_forever`. Returns only on failure.
    pub async fn run(&self) -> PollFailure {
        if let Err(failure) = self.startup().await {
            return failure;
        }
        match self.poll_forever().await {
            Err(failure) => failure,
            Ok(never) => match never {},
        }
    }

    async fn collect(&self) -> Result<usize, CoreError> {
        if self.registry.refresh_due(self.timings.refresh_interval) {
            self.state.send_replace(PollState::Refreshing);
            self.registry.refresh().await?;
        }

        self.state.send_replace(PollState::Polling);
        let gauges = self.registry.gauges();
        let devices = self.registry.devices();

        for device in &devices {
            let fields = device.get(false).await?;
            gauges.record(device.name(), &fields)?;
        }

        Ok(devices.len())
    }

    fn fail(&self, failure: PollFailure) -> PollFailure {
        self.ready.send_replace(false);
        self.state.send_replace(PollState::Failed);
        error!(phase = %failure.phase(), error = %failure, "poll loop failed");
        failure
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fake::{FakeCloud, SOCKET_PRODUCT};
    use crate::store::GaugeRegistry;
    use serde_json::json;

    fn setup() -> (Arc<FakeCloud>, PollLoop) {
        let cloud = Arc::new(FakeCloud::new());
        cloud.add_device("g1", "d1", "Kitchen Plug", SOCKET_PRODUCT, None);
        cloud.set_data_points("d1", json!({ "1": true, "4": 500, "5": 100, "6": 2300 }));

        let timings = PollTimings::default();
        let registry = Arc::new(DeviceRegistry::new(
            cloud.clone(),
            Arc::new(GaugeRegistry::new()),
            timings.inactive_timeout,
        ));
        let poll = PollLoop::new(cloud.clone(), registry, timings);
        (cloud, poll)
    }

    #[tokio::test(start_paused = true)]
    async fn startup_logs_in_and_refreshes() {
        let (cloud, poll) = setup();
        poll.startup().await.unwrap();

        assert_eq!(cloud.login_count(), 1);
        assert_eq!(cloud.refresh_count(), 1);
        assert_eq!(poll.registry().len(), 1);
        assert_eq!(*poll.state().borrow(), PollState::Idle);
        assert!(!*poll.ready().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn startup_login_failure_is_fatal() {
        let (cloud, poll) = setup();
        cloud.fail_login(true);

        let failure = poll.startup().await.unwrap_err();
        assert!(matches!(
            failure,
            PollFailure::Failed {
                phase: PollPhase::Startup,
                source: CoreError::AuthenticationFailed { .. }
            }
        ));
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(*poll.state().borrow(), PollState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn startup_watchdog_expires() {
        let (cloud, poll) = setup();
        cloud.set_delay(Duration::from_secs(60));

        let failure = poll.startup().await.unwrap_err();
        assert!(matches!(
            failure,
            PollFailure::Watchdog {
                phase: PollPhase::Startup,
                ..
            }
        ));
        assert_eq!(failure.exit_code(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_records_and_marks_ready() {
        let (_cloud, poll) = setup();
        poll.startup().await.unwrap();
        poll.cycle().await.unwrap();

        assert!(*poll.ready().borrow());
        let text = poll.registry().gauges().encode().unwrap();
        assert!(text.contains(r#"voltage{name="Kitchen Plug"} 230"#));
        assert!(text.contains(r#"va{name="Kitchen Plug"} 115"#));
        assert!(text.contains(r#"power_on{name="Kitchen Plug"} 1"#));
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_refreshes_only_when_due() {
        let (cloud, poll) = setup();
        poll.startup().await.unwrap();

        poll.cycle().await.unwrap();
        poll.cycle().await.unwrap();
        assert_eq!(cloud.refresh_count(), 1);

        tokio::time::advance(Duration::from_secs(3601)).await;
        poll.cycle().await.unwrap();
        assert_eq!(cloud.refresh_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_refreshes_without_startup() {
        let (cloud, poll) = setup();
        poll.cycle().await.unwrap();
        assert_eq!(cloud.refresh_count(), 1);
        assert_eq!(poll.registry().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_error_clears_ready() {
        let (cloud, poll) = setup();
        poll.startup().await.unwrap();
        poll.cycle().await.unwrap();
        assert!(*poll.ready().borrow());

        cloud.fail_reads(true);
        let failure = poll.cycle().await.unwrap_err();
        assert_eq!(failure.exit_code(), 1);
        assert!(!*poll.ready().borrow());
        assert_eq!(*poll.state().borrow(), PollState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_watchdog_expires() {
        let (cloud, poll) = setup();
        poll.startup().await.unwrap();
        cloud.set_delay(Duration::from_secs(45));

        let failure = poll.cycle().await.unwrap_err();
        assert!(matches!(
            failure,
            PollFailure::Watchdog {
                phase: PollPhase::Cycle,
                after
            } if after == Duration::from_secs(30)
        ));
        assert_eq!(failure.exit_code(), 2);
        assert!(!*poll.ready().borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn run_ends_on_first_failure() {
        let (cloud, poll) = setup();
        cloud.fail_reads(true);

        let failure = poll.run().await;
        assert_eq!(failure.phase(), PollPhase::Cycle);
        assert_eq!(failure.exit_code(), 1);
    }
}
