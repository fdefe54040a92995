/*
[INPUT]:  YAML configuration file, ZUBR_API_KEY / ZUBR_API_SECRET environment variables
[OUTPUT]: Parsed demo configuration and the SDK client configuration built from it
[POS]:    Configuration layer - demo setup
[UPDATE]: When adding new configuration options
*/

use std::time::Duration;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zubr_sdk::{
    ClientConfig, Credentials, OrderType, ReconnectConfig, Side, TimeInForce, UncaughtErrorPolicy,
};

pub const ENV_API_KEY: &str = "ZUBR_API_KEY";
pub const ENV_API_SECRET: &str = "ZUBR_API_SECRET";

/// Top-level configuration for the demo client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variables take precedence
    #[serde(default)]
    pub api_key: Option<String>,
    /// Hex encoded
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// "terminate" or "report"
    #[serde(default)]
    pub uncaught_errors: ErrorPolicyConfig,
    /// Omit to stop after the first disconnect
    #[serde(default)]
    pub reconnect: Option<ReconnectSettings>,
    /// Market data to watch
    #[serde(default)]
    pub market: MarketConfig,
    /// Orders placed once logged in
    #[serde(default)]
    pub orders: Vec<OrderConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicyConfig {
    #[default]
    Terminate,
    Report,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Omit to retry forever
    #[serde(default)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketConfig {
    #[serde(default = "default_instrument_id")]
    pub instrument_id: u64,
    #[serde(default = "default_resolution")]
    pub candle_resolution: String,
    /// Unix seconds range for the historical candles request
    #[serde(default)]
    pub candles_from: Option<i64>,
    #[serde(default)]
    pub candles_to: Option<i64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            instrument_id: default_instrument_id(),
            candle_resolution: default_resolution(),
            candles_from: None,
            candles_to: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderConfig {
    pub side: Side,
    pub price: Decimal,
    pub size: u64,
    #[serde(default = "default_order_type")]
    pub order_type: OrderType,
    #[serde(default = "default_time_in_force")]
    pub time_in_force: TimeInForce,
}

fn default_api_url() -> String {
    zubr_sdk::config::DEFAULT_API_URL.to_string()
}

fn default_ping_interval_secs() -> u64 {
    15
}

fn default_initial_backoff_secs() -> u64 {
    1
}

fn default_max_backoff_secs() -> u64 {
    30
}

fn default_instrument_id() -> u64 {
    1
}

fn default_resolution() -> String {
    "1".to_string()
}

fn default_order_type() -> OrderType {
    OrderType::Limit
}

fn default_time_in_force() -> TimeInForce {
    TimeInForce::Gtc
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            api_secret: None,
            ping_interval_secs: default_ping_interval_secs(),
            uncaught_errors: ErrorPolicyConfig::default(),
            reconnect: None,
            market: MarketConfig::default(),
            orders: Vec::new(),
        }
    }
}

impl DemoConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("read config file {path}"))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).context("parse config yaml")?;
        Ok(config)
    }

    /// Override credentials from the process environment
    pub fn apply_env(self) -> Self {
        self.with_env(|name| std::env::var(name).ok())
    }

    /// Override credentials when both variables are set and non-empty
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = lookup(ENV_API_KEY).filter(|value| !value.is_empty());
        let secret = lookup(ENV_API_SECRET).filter(|value| !value.is_empty());
        if let (Some(api_key), Some(api_secret)) = (key, secret) {
            self.api_key = Some(api_key);
            self.api_secret = Some(api_secret);
        }
        self
    }

    /// Both key and secret present and non-empty
    pub fn has_credentials(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.api_key) && present(&self.api_secret)
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::default().with_url(self.api_url.clone());
        config.ping_interval = Duration::from_secs(self.ping_interval_secs);
        config = config.with_uncaught_errors(match self.uncaught_errors {
            ErrorPolicyConfig::Terminate => UncaughtErrorPolicy::Terminate,
            ErrorPolicyConfig::Report => UncaughtErrorPolicy::Report,
        });

        let credentials =
            Credentials::from_parts(self.api_key.as_deref(), self.api_secret.as_deref())
                .context("invalid api credentials")?;
        if let Some(credentials) = credentials {
            config = config.with_credentials(credentials);
        }
        if let Some(reconnect) = &self.reconnect {
            config = config.with_reconnect(ReconnectConfig {
                initial_backoff: Duration::from_secs(reconnect.initial_backoff_secs),
                max_backoff: Duration::from_secs(reconnect.max_backoff_secs),
                max_retries: reconnect.max_retries,
            });
        }

        config.validate().context("invalid client config")?;
        Ok(config)
    }
}
