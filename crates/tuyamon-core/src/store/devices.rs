// ── Device registry ──
//
// The live device set, keyed by normalized name. A refresh lists every
// location and its devices, filters out stale and unsupported ones, and
// publishes the new set in one swap. Readers always see either the old
// set or the new one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use tuyamon_api::GroupDevice;

use super::gauges::GaugeRegistry;
use crate::cloud::CloudApi;
use crate::error::CoreError;
use crate::model::{Device, DeviceClass};

type DeviceMap = BTreeMap<String, Arc<Device>>;

/// Registry of live devices.
pub struct DeviceRegistry {
    cloud: Arc<dyn CloudApi>,
    gauges: Arc<GaugeRegistry>,
    devices: ArcSwap<DeviceMap>,
    refresh_lock: tokio::sync::Mutex<()>,
    last_refresh: Mutex<Option<Instant>>,
    inactive_timeout: Duration,
}

impl DeviceRegistry {
    pub fn new(
        cloud: Arc<dyn CloudApi>,
        gauges: Arc<GaugeRegistry>,
        inactive_timeout: Duration,
    ) -> Self {
        Self {
            cloud,
            gauges,
            devices: ArcSwap::from_pointee(DeviceMap::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            last_refresh: Mutex::new(None),
            inactive_timeout,
        }
    }

    pub fn gauges(&self) -> &Arc<GaugeRegistry> {
        &self.gauges
    }

    /// Whether the device list is older than `interval`, or was never built.
    pub fn refresh_due(&self, interval: Duration) -> bool {
        match *self.last_refresh.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            Some(at) => at.elapsed() > interval,
            None => true,
        }
    }

    /// Rebuild the device set from the cloud.
    ///
    /// Resets the gauge table first. On error the previous device set
    /// stays published and the error is returned.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let _guard = self.refresh_lock.lock().await;

        *self
            .last_refresh
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());
        self.gauges.reset();

        let cutoff_ms = inactivity_cutoff_ms(self.inactive_timeout);
        let mut next = DeviceMap::new();

        for location in self.cloud.list_locations().await? {
            let listed = self.cloud.list_devices(&location.group_id).await?;
            debug!(
                group_id = %location.group_id,
                location = %location.name,
                count = listed.len(),
                "listed devices"
            );

            for raw in listed {
                if is_inactive(&raw, cutoff_ms) {
                    debug!(device = %raw.name, last_seen = ?raw.dp_max_time, "skipping inactive device");
                    continue;
                }
                let Some(class) = DeviceClass::from_product_id(&raw.product_id) else {
                    debug!(device = %raw.name, product_id = %raw.product_id, "skipping unsupported product");
                    continue;
                };

                self.gauges.ensure(class.data_points())?;

                let key = normalize_name(&raw.name);
                let device = Device::new(
                    Arc::clone(&self.cloud),
                    raw.name,
                    location.group_id.clone(),
                    raw.dev_id,
                    class,
                );
                if let Some(previous) = next.insert(key.clone(), Arc::new(device)) {
                    warn!(
                        key = %key,
                        replaced = %previous.name(),
                        "device name collision, keeping the later device"
                    );
                }
            }
        }

        info!(count = next.len(), "device list refreshed");
        self.devices.store(Arc::new(next));
        Ok(())
    }

    /// Find a device by name. The name is normalized first.
    pub fn lookup(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.load().get(&normalize_name(name)).cloned()
    }

    /// Snapshot of all devices, sorted by normalized name.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.load().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.load().is_empty()
    }
}

fn inactivity_cutoff_ms(timeout: Duration) -> i64 {
    let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_sub(timeout_ms)
}

/// A device is inactive when it reports a last-seen time older than the
/// cutoff. Missing or zero timestamps count as active.
fn is_inactive(device: &GroupDevice, cutoff_ms: i64) -> bool {
    matches!(device.dp_max_time, Some(ts) if ts > 0 && ts < cutoff_ms)
}

/// Canonical registry key for a device name.
///
/// Lowercases and trims, collapses runs of whitespace and underscores to a
/// single `_`, then drops anything outside `[a-z0-9_]`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;

    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() || c == '_' {
            if !in_separator {
                out.push('_');
                in_separator = true;
            }
            continue;
        }
        in_separator = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        }
    }

    out
}
