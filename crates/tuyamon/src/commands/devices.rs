//! `tuyamon devices`: dump every device's current fields as JSON.

use serde_json::{Map, Value, json};

use tuyamon_core::ExporterConfig;

use crate::error::CliError;

pub async fn handle(exporter: ExporterConfig) -> Result<(), CliError> {
    let registry = super::connect(exporter).await?;

    let mut out = Map::new();
    for device in registry.devices() {
        let fields = device.get(true).await?;
        out.insert(
            device.name().to_owned(),
            json!({
                "class": device.class(),
                "groupId": device.group_id(),
                "deviceId": device.device_id(),
                "fields": fields,
            }),
        );
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
    Ok(())
}
