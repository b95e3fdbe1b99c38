// Session login
//
// The login action returns a session id (`sid`) which the client stores
// and attaches to every subsequent signed request.

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::client::TuyaClient;
use crate::error::Error;
use crate::models::LoginSession;

const LOGIN_ACTION: &str = "tuya.m.user.email.password.login";

impl TuyaClient {
    /// Authenticate with account email and password.
    ///
    /// The password never leaves the process in the clear; the cloud
    /// receives its hex SHA-256 digest. On success the session id is
    /// stored for later calls.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        debug!(email, "logging in");

        let body = json!({
            "email": email,
            "passwd": password_digest(password),
        });

        let session: LoginSession = self
            .request(LOGIN_ACTION, None, Some(&body))
            .await
            .map_err(|e| match e {
                Error::Api { code, message } => Error::Authentication {
                    message: match code {
                        Some(code) => format!("{message} ({code})"),
                        None => message,
                    },
                },
                other => other,
            })?;

        self.set_session(session.sid);
        debug!("login successful");
        Ok(())
    }
}

fn password_digest(password: &SecretString) -> String {
    hex::encode(Sha256::digest(password.expose_secret().as_bytes()))
}
