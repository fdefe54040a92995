/*
[INPUT]:  Credentials and a unix timestamp
[OUTPUT]: HMAC-SHA256 login digest and the login RPC params
[POS]:    Auth layer - login handshake signing
[UPDATE]: When changing the canonical message or digest encoding
*/

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::Credentials;
use crate::error::{Result, ZubrError};
use crate::types::{LoginParams, LoginTime};

type HmacSha256 = Hmac<Sha256>;

pub const LOGIN_METHOD: &str = "loginSessionByApiToken";

/// Canonical form: `key=value` pairs sorted by key, joined with `;`
pub fn canonical_message(fields: &BTreeMap<&str, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Hex HMAC-SHA256 over `key={api_key};time={timestamp}`
pub fn sign_login(credentials: &Credentials, timestamp: i64) -> Result<String> {
    let fields = BTreeMap::from([
        ("key", credentials.api_key().to_string()),
        ("time", timestamp.to_string()),
    ]);
    let message = canonical_message(&fields);

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret())
        .map_err(|err| ZubrError::InvalidCredentials(err.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Params of the `loginSessionByApiToken` RPC
pub fn login_params(credentials: &Credentials, timestamp: i64) -> Result<LoginParams> {
    Ok(LoginParams {
        api_key: credentials.api_key().to_string(),
        time: LoginTime {
            seconds: timestamp,
            nanos: 0,
        },
        hmac_digest: sign_login(credentials, timestamp)?,
    })
}
