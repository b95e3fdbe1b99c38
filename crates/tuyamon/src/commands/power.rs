//! `tuyamon power <device> <on|off>`

use tracing::info;

use tuyamon_core::ExporterConfig;

use crate::cli::PowerArgs;
use crate::error::CliError;

pub async fn handle(exporter: ExporterConfig, args: &PowerArgs) -> Result<(), CliError> {
    let registry = super::connect(exporter).await?;
    let device = registry
        .lookup(&args.device)
        .ok_or_else(|| CliError::DeviceNotFound {
            name: args.device.clone(),
        })?;

    let on = args.state.is_on();
    device.set_power(on).await?;
    info!(device = %device.name(), on, "power state sent");
    Ok(())
}
