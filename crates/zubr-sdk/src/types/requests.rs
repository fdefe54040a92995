/*
[INPUT]:  Request parameters from the public API
[OUTPUT]: Serializable request envelopes and RPC params
[POS]:    Data layer - outbound wire shapes
[UPDATE]: When RPC params or the envelope format change
*/

use serde::Serialize;
use serde_json::Value;

use super::enums::{Method, OrderType, Side, TimeInForce};
use crate::decimal::WireDecimal;

/// Outbound frame: `{"id", "method", "params"}`
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: u64,
    pub method: Method,
    pub params: Value,
}

impl Request {
    pub fn channel(id: u64, channel: &str) -> Self {
        Self {
            id,
            method: Method::Channel,
            params: serde_json::json!({ "channel": channel }),
        }
    }

    /// RPC envelope; `Value::Null` params are sent as `{}`
    pub fn rpc(id: u64, rpc_method: &str, params: Value) -> Self {
        let params = if params.is_null() {
            Value::Object(Default::default())
        } else {
            params
        };
        Self {
            id,
            method: Method::Rpc,
            params: serde_json::json!({
                "data": {
                    "method": rpc_method,
                    "params": params,
                }
            }),
        }
    }
}

/// Order to place
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub instrument_id: u64,
    pub price: WireDecimal,
    pub size: u64,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOrderParams {
    pub instrument: u64,
    pub price: WireDecimal,
    pub size: u64,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(rename = "timeInForce")]
    pub time_in_force: TimeInForce,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOrderParams {
    pub order_id: String,
    pub price: WireDecimal,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlesRangeParams {
    pub instrument_id: u64,
    pub resolution: String,
    pub from: i64,
    pub to: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoginTime {
    pub seconds: i64,
    pub nanos: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    pub api_key: String,
    pub time: LoginTime,
    pub hmac_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rpc_envelope_defaults_params() {
        let request = Request::rpc(4, "ping", Value::Null);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 4, "method": 9, "params": {"data": {"method": "ping", "params": {}}}})
        );
    }

    #[test]
    fn test_channel_envelope() {
        let request = Request::channel(1, "orders");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"id": 1, "method": 1, "params": {"channel": "orders"}})
        );
    }

    #[test]
    fn test_place_order_params_wire_names() {
        let params = PlaceOrderParams {
            instrument: 2,
            price: WireDecimal::encode("1003.8").unwrap(),
            size: 1,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            side: Side::Buy,
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "instrument": 2,
                "price": {"mantissa": 10038, "exponent": -1},
                "size": 1,
                "type": "LIMIT",
                "timeInForce": "GTC",
                "side": "BUY"
            })
        );
    }
}
