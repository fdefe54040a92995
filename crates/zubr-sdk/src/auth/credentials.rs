/*
[INPUT]:  API key and hex-encoded API secret
[OUTPUT]: Validated credentials or an anonymous session
[POS]:    Auth layer - credential storage
[UPDATE]: When the credential format changes
*/

use std::fmt;

use crate::error::{Result, ZubrError};

/// API credentials used for the login handshake
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: Vec<u8>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials from an API key and a hex-encoded secret
    pub fn new(api_key: impl Into<String>, api_secret_hex: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ZubrError::InvalidCredentials("empty API key".to_string()));
        }
        let api_secret = hex::decode(api_secret_hex.trim())
            .map_err(|err| ZubrError::InvalidCredentials(format!("API secret is not hex: {err}")))?;
        if api_secret.is_empty() {
            return Err(ZubrError::InvalidCredentials("empty API secret".to_string()));
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Missing or empty key or secret means an anonymous session
    pub fn from_parts(api_key: Option<&str>, api_secret_hex: Option<&str>) -> Result<Option<Self>> {
        match (api_key, api_secret_hex) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Self::new(key, secret).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &[u8] {
        &self.api_secret
    }
}
