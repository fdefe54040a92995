/*
[INPUT]:  Simulated transport events against a sans-IO session
[OUTPUT]: Test results for handshake, queueing, replay, and routing
[POS]:    Integration tests - session protocol behaviour
[UPDATE]: When session lifecycle or routing rules change
*/

mod common;

use std::collections::BTreeSet;

use common::{
    LOGIN_DIGEST, LOGIN_TIME, RecordingSink, TEST_API_KEY, collector, connect_and_login, deliver,
    login_ok, test_credentials,
};
use serde_json::{Value, json};
use tokio_test::assert_ok;
use zubr_sdk::{OrderType, Session, SessionState, TimeInForce, ZubrError, callback};

fn channel_of(frame: &Value) -> Option<&str> {
    frame["params"]["channel"].as_str()
}

#[test]
fn test_login_handshake_and_order_encoding() {
    let mut session = Session::new(Some(test_credentials()));
    let (on_buy, _) = collector();
    let buy_id = assert_ok!(session.buy(
        2,
        "1003.8",
        1,
        OrderType::Limit,
        TimeInForce::Gtc,
        Some(on_buy)
    ));
    assert_eq!(session.queued_len(), 1);

    let sink = RecordingSink::new();
    assert_ok!(session.on_open(sink.boxed(), LOGIN_TIME));
    assert_eq!(session.state(), SessionState::Authenticating);

    let sent = sink.take();
    assert_eq!(sent.len(), 1, "queued traffic waits for login");
    let login = &sent[0];
    assert_eq!(login["method"], 9);
    assert_eq!(login["params"]["data"]["method"], "loginSessionByApiToken");
    assert_eq!(
        login["params"]["data"]["params"],
        json!({
            "apiKey": TEST_API_KEY,
            "time": {"seconds": LOGIN_TIME, "nanos": 0},
            "hmacDigest": LOGIN_DIGEST,
        })
    );

    let login_id = login["id"].as_u64().unwrap();
    assert!(login_id > buy_id);
    deliver(&mut session, &login_ok(login_id));
    assert!(session.is_ready());

    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["id"], buy_id);
    assert_eq!(
        sent[0]["params"]["data"],
        json!({
            "method": "placeOrder",
            "params": {
                "instrument": 2,
                "price": {"mantissa": 10038, "exponent": -1},
                "size": 1,
                "type": "LIMIT",
                "timeInForce": "GTC",
                "side": "BUY"
            }
        })
    );

    let sell_id = assert_ok!(session.sell(
        2,
        "1003.8",
        123,
        OrderType::Limit,
        TimeInForce::Gtc,
        None
    ));
    let sent = sink.take();
    assert_eq!(sent.len(), 1, "ready session sends directly");
    assert_eq!(sent[0]["id"], sell_id);
    assert_eq!(sent[0]["params"]["data"]["params"]["side"], "SELL");
}

#[test]
fn test_resubscribe_replay_after_reconnect() {
    let mut session = Session::new(Some(test_credentials()));
    let (on_orders, orders_seen) = collector();
    let (on_book, book_seen) = collector();
    session.subscribe_orders(on_orders).unwrap();
    session.subscribe_orderbook(on_book).unwrap();

    let sink = RecordingSink::new();
    let first = connect_and_login(&mut session, &sink);
    let channels: Vec<&str> = first.iter().filter_map(channel_of).collect();
    assert_eq!(channels, vec!["orders", "orderbook"], "queued subscribes flushed once");

    session.on_close();
    assert_eq!(session.state(), SessionState::Disconnected);

    let sink = RecordingSink::new();
    session.on_open(sink.boxed(), LOGIN_TIME + 60).unwrap();
    let login = sink.take();
    let login_id = login[0]["id"].as_u64().unwrap();
    assert!(sink.take().is_empty());
    deliver(&mut session, &login_ok(login_id));

    let replay = sink.take();
    assert_eq!(replay.len(), 2);
    let replayed: BTreeSet<&str> = replay.iter().filter_map(channel_of).collect();
    assert_eq!(replayed, BTreeSet::from(["orderbook", "orders"]));
    for frame in &replay {
        assert_eq!(frame["method"], 1);
        assert!(frame["id"].as_u64().unwrap() > login_id, "replay uses fresh ids");
    }

    deliver(
        &mut session,
        &json!({"result": {"channel": "orders", "data": {"orderId": 1}}}).to_string(),
    );
    deliver(
        &mut session,
        &json!({"result": {"channel": "orderbook", "data": {"bids": []}}}).to_string(),
    );
    assert_eq!(*orders_seen.lock().unwrap(), vec![json!({"orderId": 1})]);
    assert_eq!(*book_seen.lock().unwrap(), vec![json!({"bids": []})]);
}

#[test]
fn test_queue_flushes_in_order_before_replay() {
    let mut session = Session::new(Some(test_credentials()));
    let sink = RecordingSink::new();
    connect_and_login(&mut session, &sink);
    session.subscribe_balance(callback(|_| {})).unwrap();
    assert_eq!(sink.take().len(), 1);

    session.on_close();
    let ids: Vec<u64> = ["first", "second", "third"]
        .iter()
        .map(|method| session.rpc(method, Value::Null, None).unwrap())
        .collect();
    assert_eq!(session.queued_len(), 3);

    let sent = connect_and_login(&mut session, &sink);
    assert_eq!(sent.len(), 4);
    let flushed: Vec<u64> = sent[..3].iter().map(|f| f["id"].as_u64().unwrap()).collect();
    assert_eq!(flushed, ids);
    let methods: Vec<&str> = sent[..3]
        .iter()
        .map(|f| f["params"]["data"]["method"].as_str().unwrap())
        .collect();
    assert_eq!(methods, vec!["first", "second", "third"]);
    assert_eq!(channel_of(&sent[3]), Some("balance"));
    assert_eq!(session.queued_len(), 0);
}

#[test]
fn test_subscribe_while_disconnected_is_not_doubled() {
    let mut session = Session::new(None);
    let sink = RecordingSink::new();
    session.on_open(sink.boxed(), 0).unwrap();
    session.subscribe_instruments(callback(|_| {})).unwrap();
    session.on_close();

    session.subscribe_last_trades(callback(|_| {})).unwrap();
    session.on_open(sink.boxed(), 0).unwrap();

    let frames = sink.take();
    let channels: Vec<&str> = frames.iter().filter_map(channel_of).collect();
    assert_eq!(channels, vec!["instruments", "lasttrades", "instruments"]);
}

#[test]
fn test_response_invokes_callback_at_most_once() {
    let mut session = Session::new(None);
    let (on_candles, seen) = collector();
    let id = session
        .get_candles_range(1, "1", 100, 200, Some(on_candles))
        .unwrap();
    session.on_open(RecordingSink::new().boxed(), 0).unwrap();

    let response = json!({"id": id, "result": {"tag": "ok", "value": []}}).to_string();
    deliver(&mut session, &response);
    deliver(&mut session, &response);

    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(session.pending_len(), 0);
}

#[test]
fn test_correlated_response_wins_over_channel_shape() {
    let mut session = Session::new(None);
    let (on_orders, channel_seen) = collector();
    let (on_rpc, rpc_seen) = collector();
    session.subscribe_orders(on_orders).unwrap();
    let id = session.rpc("echo", json!({}), Some(on_rpc)).unwrap();

    let frame = json!({"id": id, "result": {"channel": "orders", "data": {"x": 1}}});
    deliver(&mut session, &frame.to_string());

    assert_eq!(*rpc_seen.lock().unwrap(), vec![frame]);
    assert!(channel_seen.lock().unwrap().is_empty());
}

#[test]
fn test_duplicate_subscription_keeps_original_callback() {
    let mut session = Session::new(None);
    let (first, first_seen) = collector();
    let (second, second_seen) = collector();
    session.subscribe_candles(1, "1m", first).unwrap();

    let err = session.subscribe_candles(1, "1m", second).unwrap_err();
    assert!(matches!(err, ZubrError::AlreadySubscribed { ref channel } if channel == "candles:1:1m"));
    assert_eq!(session.queued_len(), 1, "rejected subscribe sends nothing");

    deliver(
        &mut session,
        &json!({"result": {"channel": "candles:1:1m", "data": {"close": 1}}}).to_string(),
    );
    assert_eq!(first_seen.lock().unwrap().len(), 1);
    assert!(second_seen.lock().unwrap().is_empty());
}

#[test]
fn test_error_and_default_callbacks() {
    let mut session = Session::new(None);
    let (on_error, errors) = collector();
    let (on_other, others) = collector();
    session.subscribe_errors(on_error);
    session.set_default_callback(on_other);

    let error = json!({"error": {"message": "rate limited", "code": 429}});
    deliver(&mut session, &error.to_string());
    let other = json!({"result": {"tag": "ok"}});
    deliver(&mut session, &other.to_string());
    deliver(
        &mut session,
        &json!({"result": {"channel": "unknown", "data": {}}}).to_string(),
    );

    assert_eq!(*errors.lock().unwrap(), vec![error]);
    assert_eq!(*others.lock().unwrap(), vec![other]);
}

#[test]
fn test_bad_frame_does_not_poison_session() {
    let mut session = Session::new(None);
    let (on_book, seen) = collector();
    session.subscribe_orderbook(on_book).unwrap();

    assert!(matches!(
        session.handle_text("{\"result\": "),
        Err(ZubrError::Protocol(_))
    ));
    assert!(matches!(
        session.handle_text(
            r#"{"result": {"channel": "orderbook", "data": {"mantissa": 1000000000000000000000000000000000000000000, "exponent": 0}}}"#
        ),
        Err(ZubrError::InvalidDecimal(_))
    ));

    deliver(
        &mut session,
        r#"{"result": {"channel": "orderbook", "data": {"mid": {"mantissa": 10038, "exponent": -1}}}}"#,
    );
    assert_eq!(*seen.lock().unwrap(), vec![json!({"mid": "1003.8"})]);
}

#[test]
fn test_decimals_beyond_native_ranges_reach_callbacks() {
    let mut session = Session::new(None);
    let (on_book, pushes) = collector();
    let (on_range, responses) = collector();
    session.subscribe_orderbook(on_book).unwrap();
    let id = session
        .get_candles_range(1, "1", 100, 200, Some(on_range))
        .unwrap();
    session.on_open(RecordingSink::new().boxed(), 0).unwrap();

    deliver(
        &mut session,
        r#"{"result": {"channel": "orderbook", "data": {"p": {"mantissa": 123456789012345678901234, "exponent": -2}}}}"#,
    );
    deliver(
        &mut session,
        &format!(
            r#"{{"id": {id}, "result": {{"tag": "ok", "value": {{"low": {{"mantissa": 100000000, "exponent": -30}}}}}}}}"#
        ),
    );

    assert_eq!(
        *pushes.lock().unwrap(),
        vec![json!({"p": "1234567890123456789012.34"})]
    );
    let responses = responses.lock().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0]["result"]["value"]["low"],
        "0.000000000000000000000100000000"
    );
    assert_eq!(session.pending_len(), 0);
}

#[test]
fn test_order_price_below_decimal_scale_is_encoded_exactly() {
    let mut session = Session::new(Some(test_credentials()));
    let sink = RecordingSink::new();
    connect_and_login(&mut session, &sink);

    session
        .sell(
            2,
            "0.00000000000000000000000000001",
            1,
            OrderType::PostOnly,
            TimeInForce::Fok,
            None,
        )
        .unwrap();
    let sent = sink.take();
    assert_eq!(
        sent[0]["params"]["data"]["params"]["price"],
        json!({"mantissa": 1, "exponent": -29})
    );
}

#[test]
fn test_uncaught_server_error_surfaces_code() {
    let mut session = Session::new(None);
    let err = session
        .handle_text(&json!({"error": {"message": "maintenance", "code": 503}}).to_string())
        .unwrap_err();
    match err {
        ZubrError::UncaughtServer { message, code, .. } => {
            assert_eq!(message, "maintenance");
            assert_eq!(code.as_deref(), Some("503"));
        }
        other => panic!("Expected UncaughtServer, got {other:?}"),
    }
}

#[test]
fn test_request_ids_survive_reconnects() {
    let mut session = Session::new(None);
    let mut last = 0;
    for _ in 0..3 {
        session.on_open(RecordingSink::new().boxed(), 0).unwrap();
        let id = session.rpc("ping", Value::Null, None).unwrap();
        assert!(id > last);
        last = id;
        session.on_close();
    }
    assert_eq!(last, 3);
}
