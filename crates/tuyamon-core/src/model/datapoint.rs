// ── Data-point maps and translation ──
//
// A `DataPointMap` describes one device class: which raw data-point ids
// it reports, what they mean, and how to convert them. The `Translator`
// indexes a map once and then converts raw snapshots to semantic fields
// and back.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use tuyamon_api::DataPoints;

/// Semantic snapshot: field name -> value.
pub type Fields = serde_json::Map<String, Value>;

/// Value conversion applied in one direction of the mapping.
pub type Transform = fn(&Value) -> Value;

/// Prefix for raw data points that have no map entry.
pub const UNKNOWN_PREFIX: &str = "unknown_";

/// What kind of value a data point carries.
///
/// Only `Boolean` and `Number` points get gauges; strings are reported
/// but cannot be exported as metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Boolean,
    Number,
    String,
}

/// One raw data point of a device class.
#[derive(Debug)]
pub struct DataPoint {
    /// Raw data-point id as reported by the cloud (e.g. `"4"`).
    pub id: &'static str,
    /// Semantic field name; doubles as the metric name.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: ValueKind,
    pub settable: bool,
    /// Raw -> semantic. Identity when absent.
    pub forward: Option<Transform>,
    /// Semantic -> raw. Identity when absent.
    pub reverse: Option<Transform>,
}

impl DataPoint {
    pub fn is_gauged(&self) -> bool {
        self.kind != ValueKind::String
    }
}

/// A field computed from other semantic fields rather than read from a
/// data point. Listed so gauges exist for it; never writable.
#[derive(Debug)]
pub struct VirtualField {
    pub name: &'static str,
    pub help: &'static str,
}

/// Static descriptor of a device class.
///
/// `derive` runs after forward mapping and may add or overwrite fields
/// named in `virtual_fields`.
#[derive(Debug)]
pub struct DataPointMap {
    pub points: &'static [DataPoint],
    pub virtual_fields: &'static [VirtualField],
    pub derive: fn(&mut Fields),
}

impl DataPointMap {
    /// `(name, help)` of every field that should be backed by a gauge.
    pub fn gauged_fields(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.points
            .iter()
            .filter(|p| p.is_gauged())
            .map(|p| (p.name, p.help))
            .chain(self.virtual_fields.iter().map(|v| (v.name, v.help)))
    }
}

/// Indexed view of a `DataPointMap`.
///
/// Both indexes are built once and never change for the lifetime of the
/// owning device.
#[derive(Debug)]
pub struct Translator {
    map: &'static DataPointMap,
    by_id: HashMap<&'static str, &'static DataPoint>,
    by_name: HashMap<&'static str, &'static DataPoint>,
}

impl Translator {
    pub fn new(map: &'static DataPointMap) -> Self {
        let by_id = map.points.iter().map(|p| (p.id, p)).collect();
        let by_name = map.points.iter().map(|p| (p.name, p)).collect();
        Self { map, by_id, by_name }
    }

    /// Translate a raw snapshot into semantic fields, then derive the
    /// class's virtual fields.
    ///
    /// Unmapped data points are dropped unless `add_unknown` is set, in
    /// which case they surface untouched as `unknown_<id>`.
    pub fn map_forward(&self, raw: &DataPoints, add_unknown: bool) -> Fields {
        let mut fields = Fields::new();

        for (id, value) in raw {
            match self.by_id.get(id.as_str()) {
                Some(point) => {
                    let mapped = point.forward.map_or_else(|| value.clone(), |f| f(value));
                    fields.insert(point.name.to_owned(), mapped);
                }
                None if add_unknown => {
                    fields.insert(format!("{UNKNOWN_PREFIX}{id}"), value.clone());
                }
                None => trace!(id = %id, "skipping unmapped data point"),
            }
        }

        (self.map.derive)(&mut fields);
        fields
    }

    /// Translate semantic fields back into raw data points.
    ///
    /// Only settable points are emitted. Unknown, read-only, and virtual
    /// fields are dropped silently.
    pub fn map_reverse(&self, fields: &Fields) -> DataPoints {
        let mut raw = DataPoints::new();

        for (name, value) in fields {
            let Some(point) = self.by_name.get(name.as_str()).filter(|p| p.settable) else {
                trace!(field = %name, "dropping non-settable field");
                continue;
            };
            let unmapped = point.reverse.map_or_else(|| value.clone(), |f| f(value));
            raw.insert(point.id.to_owned(), unmapped);
        }

        raw
    }
}

// ── Shared transforms ────────────────────────────────────────────────

/// Divide a numeric value; non-numeric values pass through untouched.
fn scale(value: &Value, divisor: f64) -> Value {
    value
        .as_f64()
        .map_or_else(|| value.clone(), |n| Value::from(n / divisor))
}

/// Thousandths to units (mA -> A).
pub fn from_milli(value: &Value) -> Value {
    scale(value, 1000.0)
}

/// Tenths to units (dW -> W, dV -> V).
pub fn from_deci(value: &Value) -> Value {
    scale(value, 10.0)
}

/// Coerce any JSON value to a boolean the way a loosely typed caller
/// would expect: `0`, `false`, `""`, and `null` are off.
pub fn to_bool(value: &Value) -> Value {
    let on = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    };
    Value::Bool(on)
}

/// Read a numeric field, treating booleans as 1/0.
pub fn numeric(fields: &Fields, name: &str) -> Option<f64> {
    match fields.get(name)? {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}
