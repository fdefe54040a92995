/*
[INPUT]:  Exchange protocol enumerations
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When the exchange adds order types or request kinds
*/

use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    PostOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    Session,
    Gtc,
    Ioc,
    Fok,
}

/// Request envelope kind, sent as its numeric code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Channel,
    Rpc,
}

impl Method {
    pub fn code(self) -> u8 {
        match self {
            Method::Channel => 1,
            Method::Rpc => 9,
        }
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&OrderType::PostOnly).unwrap(), "\"POST_ONLY\"");
        assert_eq!(serde_json::to_string(&TimeInForce::Session).unwrap(), "\"SESSION\"");
        assert_eq!(serde_json::to_string(&TimeInForce::Gtc).unwrap(), "\"GTC\"");
    }

    #[test]
    fn test_method_codes() {
        assert_eq!(serde_json::to_string(&Method::Channel).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Method::Rpc).unwrap(), "9");
    }
}
