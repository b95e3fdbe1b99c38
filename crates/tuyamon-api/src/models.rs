// Cloud API response types
//
// All responses arrive in the `ApiResponse` envelope. Fields use
// `#[serde(default)]` liberally; the cloud omits empty values freely and
// flips some ids between strings and numbers depending on the account.

use serde::{Deserialize, Deserializer, Serialize};

/// Raw data-point snapshot: data-point id -> device-specific value.
pub type DataPoints = serde_json::Map<String, serde_json::Value>;

// ── Response Envelope ────────────────────────────────────────────────

/// Standard mobile API response envelope.
///
/// ```json
/// { "success": true, "result": ..., "t": 1700000000000 }
/// { "success": false, "errorCode": "USER_SESSION_INVALID", "errorMsg": "..." }
/// ```
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default, rename = "errorCode")]
    pub error_code: Option<String>,
    #[serde(default, rename = "errorMsg")]
    pub error_msg: Option<String>,
}

// ── Session ──────────────────────────────────────────────────────────

/// Result of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginSession {
    pub sid: String,
    #[serde(default)]
    pub uid: Option<String>,
}

// ── Locations & devices ──────────────────────────────────────────────

/// A location ("home") owning a group of devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "groupId", deserialize_with = "string_or_number")]
    pub group_id: String,
    #[serde(default)]
    pub name: String,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A device as listed inside a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDevice {
    #[serde(rename = "devId")]
    pub dev_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "productId")]
    pub product_id: String,
    /// Epoch milliseconds of the newest data point the cloud has seen.
    #[serde(default, rename = "dpMaxTime")]
    pub dp_max_time: Option<i64>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
