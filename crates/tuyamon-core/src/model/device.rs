// ── Device instances ──

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::class::DeviceClass;
use super::datapoint::{Fields, Translator};
use crate::cloud::CloudApi;
use crate::error::CoreError;

/// One physical device bound to its class's translation tables.
pub struct Device {
    cloud: Arc<dyn CloudApi>,
    name: String,
    group_id: String,
    device_id: String,
    class: DeviceClass,
    translator: Translator,
}

impl Device {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        name: impl Into<String>,
        group_id: impl Into<String>,
        device_id: impl Into<String>,
        class: DeviceClass,
    ) -> Self {
        Self {
            cloud,
            name: name.into(),
            group_id: group_id.into(),
            device_id: device_id.into(),
            class,
            translator: Translator::new(class.data_points()),
        }
    }

    /// Display name as reported by the cloud (also the metric label).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    /// Fetch the device's current raw snapshot and translate it.
    pub async fn get(&self, add_unknown: bool) -> Result<Fields, CoreError> {
        let raw = self
            .cloud
            .get_data_points(&self.group_id, &self.device_id)
            .await?;
        Ok(self.translator.map_forward(&raw, add_unknown))
    }

    /// Write semantic fields to the device in one batch.
    ///
    /// Fields that are not settable are dropped. If nothing remains, no
    /// request is sent.
    pub async fn set(&self, fields: &Fields) -> Result<(), CoreError> {
        let raw = self.translator.map_reverse(fields);
        if raw.is_empty() {
            debug!(device = %self.name, "nothing settable in update");
            return Ok(());
        }

        debug!(device = %self.name, count = raw.len(), "publishing update");
        self.cloud
            .publish_data_points(&self.group_id, &self.device_id, &raw)
            .await
    }

    /// Switch the device on or off.
    pub async fn set_power(&self, on: bool) -> Result<(), CoreError> {
        let field = self
            .class
            .power_field()
            .ok_or_else(|| CoreError::Config {
                message: format!("device class '{}' has no power switch", self.class),
            })?;

        let mut fields = Fields::new();
        fields.insert(field.to_owned(), Value::Bool(on));
        self.set(&fields).await
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("group_id", &self.group_id)
            .field("device_id", &self.device_id)
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fake::FakeCloud;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn socket(cloud: &Arc<FakeCloud>) -> Device {
        Device::new(cloud.clone(), "Kitchen Plug", "g1", "dev1", DeviceClass::Socket)
    }

    fn fields(value: Value) -> Fields {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn get_translates_cloud_snapshot() {
        let cloud = Arc::new(FakeCloud::new());
        cloud.set_data_points("dev1", json!({ "1": true, "4": 500, "5": 100, "6": 2300, "9": 0 }));

        let device = socket(&cloud);
        let out = device.get(false).await.unwrap();
        assert_eq!(out.get("current"), Some(&json!(0.5)));
        assert_eq!(out.get("va"), Some(&json!(115.0)));
        assert!(!out.contains_key("unknown_9"));

        let out = device.get(true).await.unwrap();
        assert_eq!(out.get("unknown_9"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn set_forwards_only_settable_fields() {
        let cloud = Arc::new(FakeCloud::new());
        let device = socket(&cloud);

        device
            .set(&fields(json!({ "power_on": 1, "voltage": 12, "va": 3 })))
            .await
            .unwrap();

        let published = cloud.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].group_id, "g1");
        assert_eq!(published[0].device_id, "dev1");
        assert_eq!(published[0].dps, fields(json!({ "1": true })));
    }

    #[tokio::test]
    async fn set_without_settable_fields_sends_nothing() {
        let cloud = Arc::new(FakeCloud::new());
        socket(&cloud)
            .set(&fields(json!({ "unknown_9": 1, "pf": 1.0 })))
            .await
            .unwrap();
        assert!(cloud.published().is_empty());
    }

    #[tokio::test]
    async fn set_power_switches_off() {
        let cloud = Arc::new(FakeCloud::new());
        socket(&cloud).set_power(false).await.unwrap();
        assert_eq!(cloud.published()[0].dps, fields(json!({ "1": false })));
    }

    #[tokio::test]
    async fn cloud_errors_propagate() {
        let cloud = Arc::new(FakeCloud::new());
        cloud.fail_reads(true);
        cloud.fail_publish(true);
        let device = socket(&cloud);

        let err = tokio_test::assert_err!(device.get(false).await);
        assert!(matches!(err, CoreError::Api { .. }));
        let err = tokio_test::assert_err!(device.set_power(true).await);
        assert!(matches!(err, CoreError::Api { .. }));
    }
}
