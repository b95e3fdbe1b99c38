// ── Runtime state ──
//
// The live device set and the gauge table that backs the metrics page.

pub mod devices;
pub mod gauges;

pub use devices::{DeviceRegistry, normalize_name};
pub use gauges::{DEVICE_LABEL, GaugeRegistry};
