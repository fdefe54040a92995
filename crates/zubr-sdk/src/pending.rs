/*
[INPUT]:  Request ids with optional response callbacks
[OUTPUT]: Pop-once lookup of the handler for a correlated response
[POS]:    Session layer - request/response correlation
[UPDATE]: When adding internal RPC kinds or changing abandonment rules
*/

use std::collections::HashMap;
use std::fmt;

use crate::router::Callback;

/// Who is waiting on a response
#[derive(Clone)]
pub enum PendingCall {
    /// Internal login handshake
    Login,
    /// User RPC callback
    User(Callback),
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCall::Login => f.write_str("Login"),
            PendingCall::User(_) => f.write_str("User(..)"),
        }
    }
}

/// Request id -> waiting handler; each entry is resolved at most once
#[derive(Debug, Default)]
pub struct PendingCallRegistry {
    calls: HashMap<u64, PendingCall>,
}

impl PendingCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a user RPC; fire-and-forget calls (no callback) are not tracked
    pub fn register(&mut self, id: u64, callback: Option<Callback>) {
        if let Some(callback) = callback {
            self.calls.insert(id, PendingCall::User(callback));
        }
    }

    pub fn register_login(&mut self, id: u64) {
        self.calls.insert(id, PendingCall::Login);
    }

    /// Remove and return the handler for `id`
    pub fn resolve(&mut self, id: u64) -> Option<PendingCall> {
        self.calls.remove(&id)
    }

    /// Drop every outstanding call; returns how many were abandoned
    pub fn abandon_all(&mut self) -> usize {
        let abandoned = self.calls.len();
        self.calls.clear();
        abandoned
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
