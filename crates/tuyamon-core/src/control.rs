// ── Control requests ──
//
// Writes are acknowledged as soon as the target device is resolved. The
// update itself runs in a background task; its failures are logged and
// go nowhere else.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::model::Fields;
use crate::store::DeviceRegistry;

/// Result of submitting a control request.
#[derive(Debug)]
pub enum ControlOutcome {
    /// The device exists; the update is running in this task.
    Accepted(JoinHandle<()>),
    NotFound,
}

/// Routes semantic updates to devices by name.
#[derive(Clone)]
pub struct ControlEndpoint {
    registry: Arc<DeviceRegistry>,
}

impl ControlEndpoint {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }

    /// Whether `name` resolves to a live device.
    pub fn contains(&self, name: &str) -> bool {
        self.registry.lookup(name).is_some()
    }

    /// Resolve `name` and apply `fields` to it asynchronously.
    pub fn submit(&self, name: &str, fields: Fields) -> ControlOutcome {
        let Some(device) = self.registry.lookup(name) else {
            info!(device = name, "control request for unknown device");
            return ControlOutcome::NotFound;
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = device.set(&fields).await {
                warn!(device = %device.name(), error = %e, "control update failed");
            } else {
                info!(device = %device.name(), fields = fields.len(), "control update applied");
            }
        });
        ControlOutcome::Accepted(handle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fake::{FakeCloud, SOCKET_PRODUCT};
    use crate::store::GaugeRegistry;
    use serde_json::json;

    async fn setup() -> (Arc<FakeCloud>, ControlEndpoint) {
        let cloud = Arc::new(FakeCloud::new());
        cloud.add_device("g1", "d1", "Kitchen Plug", SOCKET_PRODUCT, None);
        let registry = Arc::new(DeviceRegistry::new(
            cloud.clone(),
            Arc::new(GaugeRegistry::new()),
            Duration::from_secs(1800),
        ));
        registry.refresh().await.unwrap();
        (cloud, ControlEndpoint::new(registry))
    }

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn accepted_request_publishes_settable_fields() {
        let (cloud, control) = setup().await;

        let ControlOutcome::Accepted(task) =
            control.submit("kitchen plug", fields(json!({ "power_on": 0, "power": 5 })))
        else {
            panic!("expected the request to be accepted");
        };
        task.await.unwrap();

        let published = cloud.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].dps, fields(json!({ "1": false })));
    }

    #[tokio::test]
    async fn unknown_device_is_not_found() {
        let (cloud, control) = setup().await;
        assert!(control.contains("Kitchen Plug"));
        assert!(!control.contains("garage"));
        let outcome = control.submit("garage", fields(json!({ "power_on": 1 })));
        assert!(matches!(outcome, ControlOutcome::NotFound));
        assert!(cloud.published().is_empty());
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let (cloud, control) = setup().await;
        cloud.fail_publish(true);

        let ControlOutcome::Accepted(task) = control.submit("Kitchen_Plug", fields(json!({ "power_on": 1 })))
        else {
            panic!("expected the request to be accepted");
        };
        task.await.unwrap();
        assert!(cloud.published().is_empty());
    }
}
