// ── In-memory cloud ──
//
// A `CloudApi` that serves canned locations, devices, and data points and
// records every publish. Used by this crate's tests and, through the
// `testing` feature, by the binary's router tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use tuyamon_api::{DataPoints, GroupDevice, Location};

use crate::cloud::CloudApi;
use crate::error::CoreError;

/// Product id of the socket class.
pub const SOCKET_PRODUCT: &str = "pLrthS5AKLKbAQ77";

/// One recorded `publish_data_points` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub group_id: String,
    pub device_id: String,
    pub dps: DataPoints,
}

#[derive(Debug, Default)]
pub struct FakeCloud {
    locations: Mutex<Vec<Location>>,
    devices: Mutex<HashMap<String, Vec<GroupDevice>>>,
    data_points: Mutex<HashMap<String, DataPoints>>,
    published: Mutex<Vec<Published>>,
    delay: Mutex<Option<Duration>>,
    fail_login: AtomicBool,
    fail_listing: AtomicBool,
    fail_reads: AtomicBool,
    fail_publish: AtomicBool,
    logins: AtomicUsize,
    location_calls: AtomicUsize,
}

fn bad_request(what: &str) -> CoreError {
    CoreError::Api {
        message: format!("{what} failed"),
        code: Some("FAKE_FAILURE".into()),
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device to a location, creating the location on first use.
    pub fn add_device(
        &self,
        group_id: &str,
        device_id: &str,
        name: &str,
        product_id: &str,
        dp_max_time: Option<i64>,
    ) {
        let mut locations = self.locations.lock().expect("fake lock poisoned");
        if !locations.iter().any(|l| l.group_id == group_id) {
            locations.push(Location {
                group_id: group_id.to_owned(),
                name: format!("location {group_id}"),
                extra: serde_json::Map::new(),
            });
        }

        self.devices
            .lock()
            .expect("fake lock poisoned")
            .entry(group_id.to_owned())
            .or_default()
            .push(GroupDevice {
                dev_id: device_id.to_owned(),
                name: name.to_owned(),
                product_id: product_id.to_owned(),
                dp_max_time,
                extra: serde_json::Map::new(),
            });
    }

    /// Set the raw snapshot served for a device. `raw` must be a JSON object.
    pub fn set_data_points(&self, device_id: &str, raw: Value) {
        let dps = match raw {
            Value::Object(map) => map,
            other => panic!("data points must be an object, got {other}"),
        };
        self.data_points
            .lock()
            .expect("fake lock poisoned")
            .insert(device_id.to_owned(), dps);
    }

    /// Sleep this long inside every cloud call.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("fake lock poisoned") = Some(delay);
    }

    pub fn fail_login(&self, fail: bool) {
        self.fail_login.store(fail, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().expect("fake lock poisoned").clone()
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    /// How many times the location list was requested (one per refresh).
    pub fn refresh_count(&self) -> usize {
        self.location_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().expect("fake lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn login(&self) -> Result<(), CoreError> {
        self.pause().await;
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(CoreError::AuthenticationFailed {
                message: "bad password".into(),
            });
        }
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, CoreError> {
        self.pause().await;
        self.location_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(bad_request("list locations"));
        }
        Ok(self.locations.lock().expect("fake lock poisoned").clone())
    }

    async fn list_devices(&self, group_id: &str) -> Result<Vec<GroupDevice>, CoreError> {
        self.pause().await;
        Ok(self
            .devices
            .lock()
            .expect("fake lock poisoned")
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_data_points(
        &self,
        _group_id: &str,
        device_id: &str,
    ) -> Result<DataPoints, CoreError> {
        self.pause().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(bad_request("get data points"));
        }
        Ok(self
            .data_points
            .lock()
            .expect("fake lock poisoned")
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn publish_data_points(
        &self,
        group_id: &str,
        device_id: &str,
        dps: &DataPoints,
    ) -> Result<(), CoreError> {
        self.pause().await;
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(bad_request("publish"));
        }
        self.published
            .lock()
            .expect("fake lock poisoned")
            .push(Published {
                group_id: group_id.to_owned(),
                device_id: device_id.to_owned(),
                dps: dps.clone(),
            });
        Ok(())
    }
}
