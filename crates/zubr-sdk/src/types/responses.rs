/*
[INPUT]:  Correlated response payloads
[OUTPUT]: Typed views over tagged RPC results
[POS]:    Data layer - inbound wire shapes
[UPDATE]: When the server's result envelope changes
*/

use serde::Deserialize;
use serde_json::Value;

/// `{"tag": "ok" | "err", "value": ...}` carried in `result` of RPC responses
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaggedResult {
    pub tag: String,
    #[serde(default)]
    pub value: Value,
}

impl TaggedResult {
    pub fn is_err(&self) -> bool {
        self.tag == "err"
    }

    /// `value.code` of an error result
    pub fn error_code(&self) -> Option<String> {
        self.value
            .get("code")
            .and_then(crate::router::code_to_string)
    }
}
