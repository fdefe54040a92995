/*
[INPUT]:  Channel names and their callbacks
[OUTPUT]: Channel -> callback bindings for push dispatch and resubscribe replay
[POS]:    Session layer - subscription bookkeeping
[UPDATE]: When channel binding rules change
*/

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::error::{Result, ZubrError};
use crate::router::{Callback, Dispatch};

/// One callback per channel, kept for the lifetime of the client
#[derive(Default)]
pub struct SubscriptionRegistry {
    channels: BTreeMap<String, Callback>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `channel`; a second binding fails and keeps the first
    pub fn insert(&mut self, channel: &str, callback: Callback) -> Result<()> {
        if self.channels.contains_key(channel) {
            return Err(ZubrError::AlreadySubscribed {
                channel: channel.to_string(),
            });
        }
        self.channels.insert(channel.to_string(), callback);
        Ok(())
    }

    /// Registered channels, for replay after reconnect
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// Pair the channel's callback with a pushed payload; unknown channels yield `None`
    pub fn dispatch(&self, channel: &str, data: Value) -> Option<Dispatch> {
        self.channels
            .get(channel)
            .map(|callback| Dispatch::new(callback.clone(), data))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .finish()
    }
}
