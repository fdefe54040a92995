/*
[INPUT]:  Endpoint URL, credentials, keep-alive and reconnect settings
[OUTPUT]: Validated client configuration
[POS]:    Configuration layer - client construction options
[UPDATE]: When adding connection options or changing defaults
*/

use std::time::Duration;

use url::Url;

use crate::auth::Credentials;
use crate::error::{Result, ZubrError};

pub const DEFAULT_API_URL: &str = "wss://zubr.io/api/v1/ws";
pub const DEFAULT_USER_AGENT: &str = "ZubrSDK";
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);

/// What to do with a top-level server error when no error callback is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncaughtErrorPolicy {
    /// End the run loop with `UncaughtServer`
    #[default]
    Terminate,
    /// Log it and keep processing frames
    Report,
}

/// Exponential backoff between connection attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// `None` retries forever
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            max_retries: Some(10),
        }
    }
}

impl ReconnectConfig {
    /// Delay before attempt `retry_count` (1-based), doubling up to `max_backoff`
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exp = retry_count.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub credentials: Option<Credentials>,
    pub ping_interval: Duration,
    pub user_agent: String,
    pub uncaught_errors: UncaughtErrorPolicy,
    pub reconnect: Option<ReconnectConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials: None,
            ping_interval: DEFAULT_PING_INTERVAL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            uncaught_errors: UncaughtErrorPolicy::default(),
            reconnect: None,
        }
    }
}

impl ClientConfig {
    pub fn with_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = Some(reconnect);
        self
    }

    pub fn with_uncaught_errors(mut self, policy: UncaughtErrorPolicy) -> Self {
        self.uncaught_errors = policy;
        self
    }

    /// Parsed endpoint URL with any trailing `/` removed
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(self.api_url.trim_end_matches('/'))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ZubrError::Config(format!(
                "api_url must use ws:// or wss://, got {other}://"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        if self.ping_interval.is_zero() {
            return Err(ZubrError::Config("ping_interval must be non-zero".to_string()));
        }
        Ok(())
    }
}
