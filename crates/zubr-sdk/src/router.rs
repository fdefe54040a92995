/*
[INPUT]:  Decoded inbound JSON frames
[OUTPUT]: Closed set of inbound shapes, classified by fixed priority
[POS]:    Session layer - inbound message routing
[UPDATE]: When the server adds a new frame shape or the routing priority changes
*/

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::decimal;
use crate::error::{Result, ZubrError};

/// User handler for responses, pushes, and errors
pub type Callback = Arc<dyn Fn(Value) + Send + Sync>;

/// Wrap a closure as a [`Callback`]
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A callback paired with the payload it should receive.
///
/// Produced under the session lock and invoked after it is released.
pub struct Dispatch {
    pub callback: Callback,
    pub payload: Value,
}

impl Dispatch {
    pub fn new(callback: Callback, payload: Value) -> Self {
        Self { callback, payload }
    }

    pub fn invoke(self) {
        (self.callback)(self.payload);
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Inbound frame shapes, mutually exclusive
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Carries an `id`: response to one of our requests
    Correlated { id: u64, message: Value },
    /// Top-level `error` without an `id`
    UncorrelatedError { message: Value },
    /// `result.channel` push for a subscription
    SubscriptionPush { channel: String, data: Value },
    /// Anything else
    Unrecognized { message: Value },
}

impl Inbound {
    /// Parse a text frame, rewrite its decimals, and classify it
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|err| ZubrError::Protocol(format!("unparseable frame: {err}")))?;
        let message = decimal::rewrite(raw)?;
        Self::classify(message)
    }

    /// First match wins: id, then error, then result.channel, then fallback
    pub fn classify(message: Value) -> Result<Self> {
        if !message.is_object() {
            return Err(ZubrError::Protocol(format!(
                "expected a JSON object, got {message}"
            )));
        }

        if let Some(id) = message.get("id") {
            let id = id
                .as_u64()
                .ok_or_else(|| ZubrError::Protocol(format!("non-integer response id {id}")))?;
            return Ok(Inbound::Correlated { id, message });
        }

        if message.get("error").is_some() {
            return Ok(Inbound::UncorrelatedError { message });
        }

        let channel = message
            .get("result")
            .and_then(|result| result.get("channel"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(channel) = channel {
            let data = match message {
                Value::Object(mut map) => map
                    .remove("result")
                    .and_then(|mut result| result.get_mut("data").map(Value::take))
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
            return Ok(Inbound::SubscriptionPush { channel, data });
        }

        Ok(Inbound::Unrecognized { message })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Correlated { .. } => "correlated",
            Inbound::UncorrelatedError { .. } => "error",
            Inbound::SubscriptionPush { .. } => "push",
            Inbound::Unrecognized { .. } => "unrecognized",
        }
    }
}

/// Extract `(message, code)` from a server `error` object.
///
/// The message falls back to the code when absent.
pub fn server_error_details(message: &Value) -> (String, Option<String>) {
    let error = message.get("error");
    let code = error.and_then(|err| err.get("code")).and_then(code_to_string);
    let text = error
        .and_then(|err| err.get("message"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| code.clone())
        .unwrap_or_else(|| "unknown error".to_string());
    (text, code)
}

pub(crate) fn code_to_string(code: &Value) -> Option<String> {
    match code {
        Value::Null => None,
        Value::String(code) => Some(code.clone()),
        other => Some(other.to_string()),
    }
}
