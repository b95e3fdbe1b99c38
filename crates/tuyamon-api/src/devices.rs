// Location and device endpoints
//
// Discovery is two-level: locations first, then the devices of each
// location's group. Data-point reads and writes are scoped by group id
// and device id.

use serde_json::json;
use tracing::debug;

use crate::client::TuyaClient;
use crate::error::Error;
use crate::models::{DataPoints, GroupDevice, Location};

impl TuyaClient {
    /// List all locations visible to the logged-in account.
    ///
    /// Action `tuya.m.location.list`
    pub async fn list_locations(&self) -> Result<Vec<Location>, Error> {
        debug!("listing locations");
        self.request("tuya.m.location.list", None, None).await
    }

    /// List the devices belonging to a location's group.
    ///
    /// Action `tuya.m.my.group.device.list`
    pub async fn list_group_devices(&self, group_id: &str) -> Result<Vec<GroupDevice>, Error> {
        debug!(group_id, "listing group devices");
        self.request("tuya.m.my.group.device.list", Some(group_id), None)
            .await
    }

    /// Fetch the current raw data-point snapshot of one device.
    ///
    /// Action `tuya.m.device.dp.get` with `{"devId": ...}`
    pub async fn get_data_points(
        &self,
        group_id: &str,
        device_id: &str,
    ) -> Result<DataPoints, Error> {
        debug!(group_id, device_id, "reading data points");
        self.request(
            "tuya.m.device.dp.get",
            Some(group_id),
            Some(&json!({ "devId": device_id })),
        )
        .await
    }

    /// Publish a batch of raw data points to one device.
    ///
    /// Action `tuya.m.device.dp.publish` with `{"devId": ..., "dps": {...}}`
    pub async fn publish_data_points(
        &self,
        group_id: &str,
        device_id: &str,
        dps: &DataPoints,
    ) -> Result<(), Error> {
        debug!(group_id, device_id, count = dps.len(), "publishing data points");
        let _: serde_json::Value = self
            .request(
                "tuya.m.device.dp.publish",
                Some(group_id),
                Some(&json!({ "devId": device_id, "dps": dps })),
            )
            .await?;
        Ok(())
    }
}
