// tuyamon-api: Async Rust client for the Tuya mobile cloud API
//
// Covers only the handful of actions the exporter needs: session login,
// location/device discovery, and data-point reads and writes.

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::{AppCredentials, Region};
pub use client::TuyaClient;
pub use error::Error;
pub use models::{DataPoints, GroupDevice, Location};
pub use transport::TransportConfig;
