// ── Cloud seam ──
//
// Everything the core asks of the cloud goes through `CloudApi`. The
// production implementation wraps `TuyaClient`; tests substitute an
// in-memory fake.

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::info;

use tuyamon_api::{AppCredentials, DataPoints, GroupDevice, Location, TransportConfig, TuyaClient};

use crate::config::CloudConfig;
use crate::error::CoreError;

/// Cloud operations used by the registry, devices, and poll loop.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Authenticate once; later calls reuse the session.
    async fn login(&self) -> Result<(), CoreError>;

    async fn list_locations(&self) -> Result<Vec<Location>, CoreError>;

    async fn list_devices(&self, group_id: &str) -> Result<Vec<GroupDevice>, CoreError>;

    async fn get_data_points(&self, group_id: &str, device_id: &str)
    -> Result<DataPoints, CoreError>;

    async fn publish_data_points(
        &self,
        group_id: &str,
        device_id: &str,
        dps: &DataPoints,
    ) -> Result<(), CoreError>;
}

/// `CloudApi` backed by the Tuya mobile API.
pub struct TuyaCloud {
    client: TuyaClient,
    email: String,
    password: SecretString,
}

impl TuyaCloud {
    pub fn new(config: &CloudConfig) -> Result<Self, CoreError> {
        let credentials = AppCredentials {
            key: config.app_key.clone(),
            secret: config.app_secret.clone(),
        };
        let transport = TransportConfig::default().with_timeout(config.timeout);

        let client = match &config.base_url {
            Some(url) => TuyaClient::with_client(transport.build_client()?, url.clone(), credentials),
            None => TuyaClient::new(config.region, credentials, &transport)?,
        };

        Ok(Self {
            client,
            email: config.email.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl CloudApi for TuyaCloud {
    async fn login(&self) -> Result<(), CoreError> {
        self.client.login(&self.email, &self.password).await?;
        info!(base_url = %self.client.base_url(), "logged in to cloud");
        Ok(())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, CoreError> {
        Ok(self.client.list_locations().await?)
    }

    async fn list_devices(&self, group_id: &str) -> Result<Vec<GroupDevice>, CoreError> {
        Ok(self.client.list_group_devices(group_id).await?)
    }

    async fn get_data_points(
        &self,
        group_id: &str,
        device_id: &str,
    ) -> Result<DataPoints, CoreError> {
        Ok(self.client.get_data_points(group_id, device_id).await?)
    }

    async fn publish_data_points(
        &self,
        group_id: &str,
        device_id: &str,
        dps: &DataPoints,
    ) -> Result<(), CoreError> {
        Ok(self
            .client
            .publish_data_points(group_id, device_id, dps)
            .await?)
    }
}
