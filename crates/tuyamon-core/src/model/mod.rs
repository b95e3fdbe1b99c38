// ── Domain model ──
//
// Device classes, their data-point maps, and device instances.

pub mod class;
pub mod datapoint;
pub mod device;

pub use class::{DeviceClass, PRODUCT_TABLE};
pub use datapoint::{
    DataPoint, DataPointMap, Fields, Transform, Translator, UNKNOWN_PREFIX, ValueKind,
    VirtualField,
};
pub use device::Device;
