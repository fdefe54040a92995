/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Zubr SDK crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod decimal;
pub mod error;
pub mod pending;
pub mod queue;
pub mod request_id;
pub mod router;
pub mod session;
pub mod subscription;
pub mod types;

pub use api::candles_channel;
pub use auth::Credentials;
pub use client::ZubrClient;
pub use config::{ClientConfig, ReconnectConfig, UncaughtErrorPolicy};
pub use decimal::{IntoWireDecimal, WireDecimal};
pub use error::{Result, ZubrError};
pub use queue::QueuedFrame;
pub use router::{Callback, Dispatch, Inbound, callback};
pub use session::{FrameSink, Session, SessionState};

// Re-export all types
pub use types::*;
