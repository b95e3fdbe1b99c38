//! `tuyamon serve`: poll loop plus HTTP server.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use tuyamon_config::{Config, StartupFailurePolicy};
use tuyamon_core::{
    CloudApi, ControlEndpoint, DeviceRegistry, ExporterConfig, GaugeRegistry, PollFailure,
    PollLoop, TuyaCloud,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::server::{self, AppState};

pub async fn handle(
    config: &Config,
    exporter: ExporterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cloud: Arc<dyn CloudApi> = Arc::new(TuyaCloud::new(&exporter.cloud)?);
    let gauges = Arc::new(GaugeRegistry::new());
    let registry = Arc::new(DeviceRegistry::new(
        Arc::clone(&cloud),
        Arc::clone(&gauges),
        exporter.timings.inactive_timeout,
    ));
    let poll = PollLoop::new(cloud, Arc::clone(&registry), exporter.timings);

    let addr = global.listen.unwrap_or(config.listen);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    let state = AppState {
        gauges,
        control: ControlEndpoint::new(registry),
        ready: poll.ready(),
    };

    info!(
        region = %exporter.cloud.region,
        poll_delay = ?exporter.timings.poll_delay,
        "starting exporter"
    );

    tokio::select! {
        failure = poll_until_failure(&poll, config.startup_failure) => Err(CliError::Poll(failure)),
        result = server::serve(listener, state) => {
            result?;
            Ok(())
        }
    }
}

/// Run the poll loop. Under the `idle` policy a startup failure parks the
/// loop forever instead of ending it, leaving the server up but never ready.
async fn poll_until_failure(poll: &PollLoop, policy: StartupFailurePolicy) -> PollFailure {
    if let Err(failure) = poll.startup().await {
        if policy == StartupFailurePolicy::Idle {
            warn!(error = %failure, "startup failed, serving without data");
            return std::future::pending().await;
        }
        return failure;
    }

    match poll.poll_forever().await {
        Err(failure) => failure,
        Ok(never) => match never {},
    }
}
