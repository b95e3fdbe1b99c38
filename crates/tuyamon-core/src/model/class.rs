// ── Device classes ──
//
// The closed set of supported device classes. Each class carries its
// data-point map and derivation step as static data; the cloud's product
// id selects the class through `PRODUCT_TABLE`.

use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

use super::datapoint::{
    DataPoint, DataPointMap, Fields, ValueKind, VirtualField, from_deci, from_milli, numeric,
    to_bool,
};

/// Supported device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceClass {
    /// Switchable power-metering socket.
    Socket,
}

/// Product id -> device class. Products not listed are ignored on refresh.
pub const PRODUCT_TABLE: &[(&str, DeviceClass)] = &[("pLrthS5AKLKbAQ77", DeviceClass::Socket)];

impl DeviceClass {
    /// Resolve the class for a cloud product id.
    pub fn from_product_id(product_id: &str) -> Option<Self> {
        PRODUCT_TABLE
            .iter()
            .find(|(id, _)| *id == product_id)
            .map(|(_, class)| *class)
    }

    pub fn data_points(self) -> &'static DataPointMap {
        match self {
            Self::Socket => &SOCKET,
        }
    }

    /// Name of the field that switches the device on and off, if any.
    pub fn power_field(self) -> Option<&'static str> {
        match self {
            Self::Socket => Some("power_on"),
        }
    }
}

// ── Socket ───────────────────────────────────────────────────────────

static SOCKET: DataPointMap = DataPointMap {
    points: &[
        DataPoint {
            id: "1",
            name: "power_on",
            help: "Switch state (1 = on)",
            kind: ValueKind::Boolean,
            settable: true,
            forward: None,
            reverse: Some(to_bool),
        },
        DataPoint {
            id: "4",
            name: "current",
            help: "Current in amperes",
            kind: ValueKind::Number,
            settable: false,
            forward: Some(from_milli),
            reverse: None,
        },
        DataPoint {
            id: "5",
            name: "power",
            help: "Active power in watts",
            kind: ValueKind::Number,
            settable: false,
            forward: Some(from_deci),
            reverse: None,
        },
        DataPoint {
            id: "6",
            name: "voltage",
            help: "Voltage in volts",
            kind: ValueKind::Number,
            settable: false,
            forward: Some(from_deci),
            reverse: None,
        },
    ],
    virtual_fields: &[
        VirtualField {
            name: "va",
            help: "Apparent power in volt-amperes",
        },
        VirtualField {
            name: "pf",
            help: "Power factor",
        },
    ],
    derive: derive_socket,
};

/// `va = current * voltage`, `pf = power / va` (1.0 when there is no load).
fn derive_socket(fields: &mut Fields) {
    let (Some(current), Some(voltage)) = (numeric(fields, "current"), numeric(fields, "voltage"))
    else {
        return;
    };

    let va = current * voltage;
    fields.insert("va".into(), Value::from(va));

    if va <= 0.0 {
        fields.insert("pf".into(), Value::from(1.0));
    } else if let Some(power) = numeric(fields, "power") {
        fields.insert("pf".into(), Value::from(power / va));
    }
}
