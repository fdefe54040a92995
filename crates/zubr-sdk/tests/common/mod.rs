/*
[INPUT]:  Test configuration and fixture requirements
[OUTPUT]: Shared test utilities, fixtures, and recording sinks
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for zubr-sdk tests

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use zubr_sdk::{Callback, Credentials, FrameSink, QueuedFrame, Session, callback};

pub const TEST_API_KEY: &str = "test-key";
pub const TEST_API_SECRET: &str = "00112233445566778899aabbccddeeff";
#[allow(dead_code)]
pub const LOGIN_TIME: i64 = 1_700_000_000;
/// HMAC-SHA256 of `key=test-key;time=1700000000` under `TEST_API_SECRET`
#[allow(dead_code)]
pub const LOGIN_DIGEST: &str = "c34a67306860f2941bf9f33c00a2d88e7509c084209569923ea0f9180899ec44";

/// Frame sink that records every sent frame as JSON
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Value>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn FrameSink> {
        Box::new(self.clone())
    }

    /// Drain frames recorded so far
    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&mut self, frame: &QueuedFrame) -> zubr_sdk::Result<()> {
        self.frames.lock().unwrap().push(serde_json::from_str(&frame.text)?);
        Ok(())
    }
}

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_API_KEY, TEST_API_SECRET).unwrap()
}

/// Callback that records its payloads
#[allow(dead_code)]
pub fn collector() -> (Callback, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (callback(move |payload| sink.lock().unwrap().push(payload)), seen)
}

#[allow(dead_code)]
pub fn login_ok(id: u64) -> String {
    json!({"id": id, "result": {"tag": "ok", "value": {}}}).to_string()
}

/// Route a frame and invoke its callback, as the client driver does
#[allow(dead_code)]
pub fn deliver(session: &mut Session, frame: &str) {
    if let Some(dispatch) = session.handle_text(frame).unwrap() {
        dispatch.invoke();
    }
}

/// Open a connection and complete the login; returns frames sent after login
#[allow(dead_code)]
pub fn connect_and_login(session: &mut Session, sink: &RecordingSink) -> Vec<Value> {
    session.on_open(sink.boxed(), LOGIN_TIME).unwrap();
    let login = sink.take();
    assert_eq!(login.len(), 1, "only the login request goes out before login");
    let id = login[0]["id"].as_u64().unwrap();
    deliver(session, &login_ok(id));
    sink.take()
}
