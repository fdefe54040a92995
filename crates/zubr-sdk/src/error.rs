/*
[INPUT]:  Error sources (local preconditions, server frames, decoding, transport)
[OUTPUT]: Structured error kinds with fatality hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or changing which errors end a session
*/

use thiserror::Error;

/// Main error type for the Zubr SDK
#[derive(Error, Debug)]
pub enum ZubrError {
    /// Order management was called on an anonymous session
    #[error("Login required to perform this operation")]
    AuthRequired,

    /// The channel already has a bound callback
    #[error("Already subscribed to channel {channel:?}")]
    AlreadySubscribed { channel: String },

    /// The server rejected the login request
    #[error("Login failed: {message} (code {})", .code.as_deref().unwrap_or("none"))]
    Login {
        message: String,
        code: Option<String>,
    },

    /// Inbound frame could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Server sent a top-level error and no error callback is installed
    #[error("Server sent error: {message}")]
    UncaughtServer {
        message: String,
        code: Option<String>,
        response: serde_json::Value,
    },

    /// Value cannot be represented as an exact decimal
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    /// API key or secret is malformed
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket handshake or framing error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Outbound frame could not be handed to the transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reconnect attempts exhausted
    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },
}

impl ZubrError {
    /// Check if the error ends the session run loop regardless of policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ZubrError::Login { .. } | ZubrError::ReconnectExhausted { .. }
        )
    }

    /// Check if the error is a synchronous precondition raised at the call site
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ZubrError::AuthRequired
                | ZubrError::AlreadySubscribed { .. }
                | ZubrError::InvalidDecimal(_)
        )
    }

    /// Server-supplied error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            ZubrError::Login { code, .. } | ZubrError::UncaughtServer { code, .. } => {
                code.as_deref()
            }
            _ => None,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ZubrError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ZubrError::WebSocket(err.to_string())
    }
}

/// Result type alias for Zubr operations
pub type Result<T> = std::result::Result<T, ZubrError>;
