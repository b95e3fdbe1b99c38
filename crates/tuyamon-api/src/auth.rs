use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use url::Url;

use crate::error::Error;

/// Application credentials issued by the Tuya developer platform.
///
/// `key` is sent in the clear as `clientId`; `secret` only ever feeds
/// the request signature.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub key: String,
    pub secret: SecretString,
}

/// Cloud data centre the account lives in.
///
/// Determines the API host. Accounts are not portable between regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Americas -- `a1.tuyaus.com`
    Us,
    /// Europe -- `a1.tuyaeu.com`
    Eu,
    /// China -- `a1.tuyacn.com`
    Cn,
    /// India -- `a1.tuyain.com`
    In,
}

impl Region {
    /// The short code used in configuration files.
    pub fn code(self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Eu => "eu",
            Self::Cn => "cn",
            Self::In => "in",
        }
    }

    /// API base URL for this region.
    pub fn base_url(self) -> Url {
        let raw = format!("https://a1.tuya{}.com/", self.code());
        Url::parse(&raw).expect("static region URL is valid")
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "us" | "az" => Ok(Self::Us),
            "eu" => Ok(Self::Eu),
            "cn" | "ay" => Ok(Self::Cn),
            "in" => Ok(Self::In),
            other => Err(Error::UnknownRegion(other.to_owned())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
