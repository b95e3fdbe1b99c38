// ── Gauge registry ──
//
// One `GaugeVec` per semantic field name, labelled by device name and
// shared by every device that reports the field. The table is rebuilt
// from scratch at the start of each device refresh.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::{DataPointMap, Fields};

/// Label carrying the device name on every gauge.
pub const DEVICE_LABEL: &str = "name";

#[derive(Default)]
struct GaugeTable {
    registry: Registry,
    gauges: HashMap<String, GaugeVec>,
}

/// Process-wide table of field gauges.
#[derive(Default)]
pub struct GaugeRegistry {
    table: Mutex<GaugeTable>,
}

impl GaugeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GaugeTable> {
        // A panic mid-update leaves at worst a partially registered class,
        // which the next refresh replaces.
        self.table
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Create gauges for every numeric and boolean field of a class.
    /// Existing gauges are kept.
    pub fn ensure(&self, map: &DataPointMap) -> Result<(), CoreError> {
        let mut table = self.lock();

        for (name, help) in map.gauged_fields() {
            if table.gauges.contains_key(name) {
                continue;
            }
            let gauge = GaugeVec::new(Opts::new(name, help), &[DEVICE_LABEL])?;
            table.registry.register(Box::new(gauge.clone()))?;
            table.gauges.insert(name.to_owned(), gauge);
            debug!(field = name, "registered gauge");
        }

        Ok(())
    }

    /// Write one device's fields to their gauges.
    ///
    /// Booleans are recorded as 1/0 and strings are skipped. A numeric
    /// field without a gauge is an error.
    pub fn record(&self, device: &str, fields: &Fields) -> Result<(), CoreError> {
        let table = self.lock();

        for (name, value) in fields {
            let sample = match value {
                Value::Bool(b) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => f,
                    None => continue,
                },
                _ => {
                    trace!(field = %name, "skipping non-numeric field");
                    continue;
                }
            };

            let gauge = table
                .gauges
                .get(name)
                .ok_or_else(|| CoreError::MissingGauge { field: name.clone() })?;
            gauge.with_label_values(&[device]).set(sample);
        }

        Ok(())
    }

    /// Drop every gauge definition and its recorded values.
    pub fn reset(&self) {
        *self.lock() = GaugeTable::default();
        debug!("gauge table reset");
    }

    /// Names of the registered gauges, sorted.
    pub fn fields(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().gauges.keys().cloned().collect();
        names.sort();
        names
    }

    /// Render all gauges in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, CoreError> {
        let families = self.lock().registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| CoreError::Metrics(e.to_string()))
    }
}
