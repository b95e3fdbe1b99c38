// Mobile API HTTP client
//
// Wraps `reqwest::Client` with request signing, session tracking, and
// envelope unwrapping. Endpoint methods live in `devices.rs` and
// `session.rs` as inherent impls to keep this module on transport
// mechanics.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{AppCredentials, Region};
use crate::error::Error;
use crate::models::ApiResponse;
use crate::transport::TransportConfig;

const API_VERSION: &str = "1.0";
const API_PATH: &str = "api.json";

/// Error codes the cloud uses when the `sid` is no longer valid.
const SESSION_ERROR_CODES: &[&str] = &["USER_SESSION_INVALID", "USER_SESSION_LOSS"];

/// Raw HTTP client for the Tuya mobile cloud API.
///
/// Every call is a signed form `POST` to `{base}/api.json`; the action
/// name travels in the `a` parameter and the payload as JSON in
/// `postData`. Methods return the unwrapped `result` -- the envelope is
/// stripped before the caller sees it.
pub struct TuyaClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: AppCredentials,
    /// Session id returned by login. Sent as `sid` on every later call.
    session_id: RwLock<Option<String>>,
}

impl TuyaClient {
    /// Create a client for the given region.
    pub fn new(
        region: Region,
        credentials: AppCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, region.base_url(), credentials))
    }

    /// Create a client with a pre-built `reqwest::Client` and explicit
    /// base URL (tests point this at a mock server).
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: AppCredentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            session_id: RwLock::new(None),
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a login has stored a session id.
    pub fn has_session(&self) -> bool {
        self.session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn set_session(&self, sid: String) {
        debug!("storing session id");
        *self.session_id.write().unwrap_or_else(PoisonError::into_inner) = Some(sid);
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a signed action request and unwrap the envelope.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        action: &str,
        gid: Option<&str>,
        data: Option<&serde_json::Value>,
    ) -> Result<T, Error> {
        let url = self.base_url.join(API_PATH)?;
        let params = self.signed_params(action, gid, data)?;

        debug!(action, gid, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_envelope(resp).await
    }

    fn signed_params(
        &self,
        action: &str,
        gid: Option<&str>,
        data: Option<&serde_json::Value>,
    ) -> Result<BTreeMap<&'static str, String>, Error> {
        let mut params = BTreeMap::new();
        params.insert("a", action.to_owned());
        params.insert("clientId", self.credentials.key.clone());
        params.insert("lang", "en".to_owned());
        params.insert("os", "Linux".to_owned());
        params.insert("v", API_VERSION.to_owned());
        params.insert("time", Utc::now().timestamp().to_string());
        params.insert("requestId", uuid::Uuid::new_v4().to_string());

        let sid = self
            .session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sid) = sid {
            params.insert("sid", sid);
        }
        if let Some(gid) = gid {
            params.insert("gid", gid.to_owned());
        }
        if let Some(data) = data {
            let post_data =
                serde_json::to_string(data).map_err(|e| Error::Serialization(e.to_string()))?;
            params.insert("postData", post_data);
        }

        let signature = sign(&params, self.credentials.secret.expose_secret());
        params.insert("sign", signature);
        Ok(params)
    }
}

/// Compute the request signature.
///
/// Non-empty parameters are sorted by key, rendered as `key=value`,
/// joined with `||`, and authenticated with HMAC-SHA256 keyed by the app
/// secret. The digest is lowercase hex.
pub fn sign(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let payload = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("||");

    trace!(len = payload.len(), "signing request");

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// First 200 characters of a response body, for error messages.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Parse the `{ success, result, errorCode, errorMsg }` envelope.
async fn parse_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "cloud rejected the request signature or credentials".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            code: Some(status.as_u16().to_string()),
            message: format!("HTTP {status}: {}", preview(&body)),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;

    let envelope: ApiResponse = serde_json::from_str(&body).map_err(|e| {
        Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        }
    })?;

    if !envelope.success {
        let message = envelope
            .error_msg
            .unwrap_or_else(|| "request was not successful".into());
        return Err(match envelope.error_code {
            Some(code) if SESSION_ERROR_CODES.contains(&code.as_str()) => Error::SessionExpired,
            code => Error::Api { code, message },
        });
    }

    let result = envelope.result.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(result).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}
