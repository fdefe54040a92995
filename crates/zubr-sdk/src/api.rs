/*
[INPUT]:  Order, cancel, replace, candle-range, and channel subscription calls
[OUTPUT]: Encoded requests handed to the session (sent now or queued)
[POS]:    API layer - exchange operations on top of the session
[UPDATE]: When adding RPCs/channels or changing their params
*/

use serde_json::Value;

use crate::decimal::{IntoWireDecimal, WireDecimal};
use crate::error::Result;
use crate::router::Callback;
use crate::session::Session;
use crate::types::{
    CandlesRangeParams, NewOrder, OrderType, PlaceOrderParams, ReplaceOrderParams, Side,
    TimeInForce,
};

pub const CHANNEL_ORDERS: &str = "orders";
pub const CHANNEL_ORDER_FILLS: &str = "orderFills";
pub const CHANNEL_INSTRUMENTS: &str = "instruments";
pub const CHANNEL_LAST_TRADES: &str = "lasttrades";
pub const CHANNEL_ORDERBOOK: &str = "orderbook";
pub const CHANNEL_BALANCE: &str = "balance";

/// Channel name for candles of one instrument at one resolution
pub fn candles_channel(instrument_id: u64, resolution: &str) -> String {
    format!("candles:{instrument_id}:{resolution}")
}

impl Session {
    /// Place an order. Requires credentials.
    ///
    /// RPC: `placeOrder`
    pub fn place_order(&mut self, order: NewOrder, callback: Option<Callback>) -> Result<u64> {
        self.require_login()?;
        let params = PlaceOrderParams {
            instrument: order.instrument_id,
            price: order.price,
            size: order.size,
            order_type: order.order_type,
            time_in_force: order.time_in_force,
            side: order.side,
        };
        self.rpc("placeOrder", serde_json::to_value(params)?, callback)
    }

    pub fn buy(
        &mut self,
        instrument_id: u64,
        price: impl IntoWireDecimal,
        size: u64,
        order_type: OrderType,
        time_in_force: TimeInForce,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.require_login()?;
        let order = NewOrder {
            instrument_id,
            price: price.into_wire_decimal()?,
            size,
            order_type,
            time_in_force,
            side: Side::Buy,
        };
        self.place_order(order, callback)
    }

    pub fn sell(
        &mut self,
        instrument_id: u64,
        price: impl IntoWireDecimal,
        size: u64,
        order_type: OrderType,
        time_in_force: TimeInForce,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.require_login()?;
        let order = NewOrder {
            instrument_id,
            price: price.into_wire_decimal()?,
            size,
            order_type,
            time_in_force,
            side: Side::Sell,
        };
        self.place_order(order, callback)
    }

    /// RPC: `replaceOrder`. Requires credentials.
    pub fn replace_order(
        &mut self,
        order_id: &str,
        price: impl IntoWireDecimal,
        size: u64,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.require_login()?;
        let params = ReplaceOrderParams {
            order_id: order_id.to_string(),
            price: WireDecimal::encode(price)?,
            size,
        };
        self.rpc("replaceOrder", serde_json::to_value(params)?, callback)
    }

    /// RPC: `cancelOrder`, params are the bare order id. Requires credentials.
    pub fn cancel_order(&mut self, order_id: &str, callback: Option<Callback>) -> Result<u64> {
        self.require_login()?;
        self.rpc("cancelOrder", Value::String(order_id.to_string()), callback)
    }

    /// RPC: `getCandlesRange`
    pub fn get_candles_range(
        &mut self,
        instrument_id: u64,
        resolution: &str,
        from: i64,
        to: i64,
        callback: Option<Callback>,
    ) -> Result<u64> {
        let params = CandlesRangeParams {
            instrument_id,
            resolution: resolution.to_string(),
            from,
            to,
        };
        self.rpc("getCandlesRange", serde_json::to_value(params)?, callback)
    }

    pub fn subscribe_orders(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_ORDERS, callback)
    }

    pub fn subscribe_order_fills(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_ORDER_FILLS, callback)
    }

    pub fn subscribe_instruments(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_INSTRUMENTS, callback)
    }

    pub fn subscribe_last_trades(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_LAST_TRADES, callback)
    }

    pub fn subscribe_orderbook(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_ORDERBOOK, callback)
    }

    pub fn subscribe_balance(&mut self, callback: Callback) -> Result<u64> {
        self.subscribe(CHANNEL_BALANCE, callback)
    }

    pub fn subscribe_candles(
        &mut self,
        instrument_id: u64,
        resolution: &str,
        callback: Callback,
    ) -> Result<u64> {
        self.subscribe(&candles_channel(instrument_id, resolution), callback)
    }

    /// Install the handler for uncorrelated server errors; sends nothing
    pub fn subscribe_errors(&mut self, callback: Callback) {
        self.error_callback = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::error::ZubrError;
    use crate::router::callback;
    use rust_decimal::Decimal;

    fn authed() -> Session {
        Session::new(Some(
            Credentials::new("key", "00112233445566778899aabbccddeeff").unwrap(),
        ))
    }

    #[test]
    fn test_order_management_requires_credentials() {
        let mut session = Session::new(None);
        assert!(matches!(
            session.buy(2, "1003.8", 1, OrderType::Limit, TimeInForce::Gtc, None),
            Err(ZubrError::AuthRequired)
        ));
        assert!(matches!(
            session.replace_order("1", 5, 1, None),
            Err(ZubrError::AuthRequired)
        ));
        assert!(matches!(
            session.cancel_order("1", None),
            Err(ZubrError::AuthRequired)
        ));
        assert_eq!(session.queued_len(), 0);
    }

    #[test]
    fn test_auth_check_precedes_price_parsing() {
        let mut session = Session::new(None);
        assert!(matches!(
            session.sell(2, "garbage", 1, OrderType::Limit, TimeInForce::Ioc, None),
            Err(ZubrError::AuthRequired)
        ));

        let mut session = authed();
        assert!(matches!(
            session.sell(2, "garbage", 1, OrderType::Limit, TimeInForce::Ioc, None),
            Err(ZubrError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn test_candles_range_allowed_anonymously() {
        let mut session = Session::new(None);
        let id = session.get_candles_range(1, "1", 100, 200, None).unwrap();
        assert_eq!(id, 1);
        assert_eq!(session.queued_len(), 1);
    }

    #[test]
    fn test_place_order_accepts_decimal() {
        let mut session = authed();
        let order = NewOrder {
            instrument_id: 2,
            price: WireDecimal::from(Decimal::new(10038, 1)),
            size: 1,
            order_type: OrderType::PostOnly,
            time_in_force: TimeInForce::Session,
            side: Side::Buy,
        };
        assert_eq!(session.place_order(order, None).unwrap(), 1);
    }

    #[test]
    fn test_candles_channel_name() {
        assert_eq!(candles_channel(1, "1m"), "candles:1:1m");
    }

    #[test]
    fn test_subscribe_errors_sends_nothing() {
        let mut session = Session::new(None);
        session.subscribe_errors(callback(|_| {}));
        assert_eq!(session.queued_len(), 0);
        assert_eq!(session.subscription_count(), 0);
    }

    #[test]
    fn test_wrappers_reject_duplicate_channels() {
        let mut session = Session::new(None);
        session.subscribe_candles(1, "1m", callback(|_| {})).unwrap();
        assert!(matches!(
            session.subscribe_candles(1, "1m", callback(|_| {})),
            Err(ZubrError::AlreadySubscribed { .. })
        ));
        session.subscribe_candles(1, "5m", callback(|_| {})).unwrap();
        assert_eq!(session.subscription_count(), 2);
    }
}
