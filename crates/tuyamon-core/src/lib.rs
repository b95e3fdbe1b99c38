//! Data-point translation and device lifecycle for the tuyamon exporter.
//!
//! This crate sits between `tuyamon-api` and the HTTP surface of the
//! binary:
//!
//! - **Domain model** ([`model`]) — Each [`DeviceClass`] carries a static
//!   [`DataPointMap`] describing its raw data points, their semantic names,
//!   and the transforms in both directions, plus a derivation step for
//!   virtual fields. A [`Device`] binds one physical device to its class
//!   and exposes [`get`](Device::get) / [`set`](Device::set).
//!
//! - **[`DeviceRegistry`]** — The live device set keyed by normalized name.
//!   Rebuilt wholesale on refresh, skipping inactive and unsupported
//!   devices.
//!
//! - **[`GaugeRegistry`]** — One Prometheus gauge per semantic field,
//!   labelled by device name and shared across devices.
//!
//! - **[`PollLoop`]** — Login, refresh, and collection cycles under
//!   watchdogs. Ends with a [`PollFailure`] on the first error; the caller
//!   owns the process.
//!
//! - **[`ControlEndpoint`]** — Resolves write requests by device name and
//!   applies them in the background.
//!
//! All cloud access goes through the [`CloudApi`] trait.

pub mod cloud;
pub mod config;
pub mod control;
pub mod error;
pub mod model;
pub mod poll;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod fake;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cloud::{CloudApi, TuyaCloud};
pub use config::{CloudConfig, ExporterConfig, PollTimings};
pub use control::{ControlEndpoint, ControlOutcome};
pub use error::CoreError;
pub use model::{DataPointMap, Device, DeviceClass, Fields, ValueKind};
pub use poll::{PollFailure, PollLoop, PollPhase, PollState};
pub use store::{DeviceRegistry, GaugeRegistry, normalize_name};
