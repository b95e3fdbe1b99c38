//! Command dispatch: bridges CLI args -> core services -> output.

pub mod devices;
pub mod power;
pub mod serve;

use std::sync::Arc;

use tuyamon_config::Config;
use tuyamon_core::{CloudApi, DeviceRegistry, ExporterConfig, GaugeRegistry, PollLoop, TuyaCloud};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a parsed command. No subcommand means `serve`.
pub async fn dispatch(
    cmd: Option<Command>,
    config: &Config,
    exporter: ExporterConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd.unwrap_or(Command::Serve) {
        Command::Serve => serve::handle(config, exporter, global).await,
        Command::Devices => devices::handle(exporter).await,
        Command::Power(args) => power::handle(exporter, &args).await,
    }
}

/// Log in and build the device registry once, under the startup watchdog.
/// Used by the one-shot commands.
pub async fn connect(exporter: ExporterConfig) -> Result<Arc<DeviceRegistry>, CliError> {
    let cloud: Arc<dyn CloudApi> = Arc::new(TuyaCloud::new(&exporter.cloud)?);
    let registry = Arc::new(DeviceRegistry::new(
        Arc::clone(&cloud),
        Arc::new(GaugeRegistry::new()),
        exporter.timings.inactive_timeout,
    ));

    PollLoop::new(cloud, Arc::clone(&registry), exporter.timings)
        .startup()
        .await?;
    Ok(registry)
}
