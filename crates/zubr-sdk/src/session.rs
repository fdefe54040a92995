/*
[INPUT]:  Transport lifecycle events (open/message/close) and outbound requests
[OUTPUT]: Frames for the transport, callback dispatches, session errors
[POS]:    Session layer - connection state machine, login handshake, queue flush, replay
[UPDATE]: When changing handshake order, queuing rules, or routing of inbound frames
*/

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{Credentials, LOGIN_METHOD, login_params};
use crate::config::UncaughtErrorPolicy;
use crate::error::{Result, ZubrError};
use crate::pending::{PendingCall, PendingCallRegistry};
use crate::queue::{OutboundQueue, QueuedFrame};
use crate::request_id::RequestIdAllocator;
use crate::router::{Callback, Dispatch, Inbound, server_error_details};
use crate::subscription::SubscriptionRegistry;
use crate::types::{Request, TaggedResult};

/// Write half of an open connection as seen by the session
pub trait FrameSink: Send {
    fn send_frame(&mut self, frame: &QueuedFrame) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Socket open, login request in flight
    Authenticating,
    /// Socket open and logged in (or anonymous); traffic flows directly
    Ready,
}

/// All mutable client state for one logical session.
///
/// Requests made before the session is `Ready` are queued and flushed in order once the
/// login completes, followed by a replay of every channel subscription.
pub struct Session {
    credentials: Option<Credentials>,
    uncaught_errors: UncaughtErrorPolicy,
    state: SessionState,
    ids: RequestIdAllocator,
    subscriptions: SubscriptionRegistry,
    pending: PendingCallRegistry,
    queue: OutboundQueue,
    /// Id of the login request on the current connection
    login_request: Option<u64>,
    sink: Option<Box<dyn FrameSink>>,
    pub(crate) error_callback: Option<Callback>,
    default_callback: Option<Callback>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("credentials", &self.credentials)
            .field("subscriptions", &self.subscriptions)
            .field("pending", &self.pending.len())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials,
            uncaught_errors: UncaughtErrorPolicy::default(),
            state: SessionState::Disconnected,
            ids: RequestIdAllocator::new(),
            subscriptions: SubscriptionRegistry::new(),
            pending: PendingCallRegistry::new(),
            queue: OutboundQueue::new(),
            login_request: None,
            sink: None,
            error_callback: None,
            default_callback: None,
        }
    }

    pub fn with_uncaught_errors(mut self, policy: UncaughtErrorPolicy) -> Self {
        self.uncaught_errors = policy;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Logged in, or open with no credentials configured
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn set_default_callback(&mut self, callback: Callback) {
        self.default_callback = Some(callback);
    }

    /// Whether `err` should end the run loop under this session's policy
    pub fn is_terminal(&self, err: &ZubrError) -> bool {
        err.is_fatal()
            || (matches!(err, ZubrError::UncaughtServer { .. })
                && self.uncaught_errors == UncaughtErrorPolicy::Terminate)
    }

    pub(crate) fn require_login(&self) -> Result<()> {
        if self.credentials.is_none() {
            return Err(ZubrError::AuthRequired);
        }
        Ok(())
    }

    pub fn on_connecting(&mut self) {
        self.state = SessionState::Connecting;
    }

    /// Attach a freshly opened connection and start the handshake.
    ///
    /// `unix_seconds` is the login timestamp signed into the HMAC digest.
    pub fn on_open(&mut self, sink: Box<dyn FrameSink>, unix_seconds: i64) -> Result<()> {
        self.sink = Some(sink);
        self.login_request = None;

        let Some(credentials) = self.credentials.as_ref() else {
            info!("connection open; anonymous session");
            self.become_ready();
            return Ok(());
        };

        self.state = SessionState::Authenticating;
        let params = serde_json::to_value(login_params(credentials, unix_seconds)?)?;
        let id = self.ids.next_id();
        self.pending.register_login(id);
        self.login_request = Some(id);

        let frame = QueuedFrame {
            id,
            text: serde_json::to_string(&Request::rpc(id, LOGIN_METHOD, params))?,
            channel: None,
        };
        info!(id, "connection open; sending login request");
        match self.sink.as_mut() {
            Some(sink) => sink.send_frame(&frame),
            None => Err(ZubrError::Transport("no open connection".to_string())),
        }
    }

    /// Detach the connection. Queued frames are kept; pending calls are abandoned.
    pub fn on_close(&mut self) {
        self.sink = None;
        self.state = SessionState::Disconnected;

        let abandoned = self.pending.abandon_all();
        if abandoned > 0 {
            warn!(abandoned, "abandoning pending calls on disconnect");
        }
        info!(queued = self.queue.len(), "session disconnected");
    }

    /// Put frames the closed connection never wrote back at the head of the queue.
    ///
    /// `frames` must be in send order; they go out ahead of anything queued since. The
    /// login request of the dead connection is dropped. Returns how many were requeued.
    pub fn requeue_unsent(&mut self, frames: Vec<QueuedFrame>) -> usize {
        let login_request = self.login_request;
        let mut requeued = 0;
        for frame in frames.into_iter().rev() {
            if Some(frame.id) == login_request {
                debug!(id = frame.id, "dropping unsent login request");
                continue;
            }
            self.queue.push_front(frame);
            requeued += 1;
        }
        if requeued > 0 {
            warn!(requeued, "requeued frames left unsent by the closed connection");
        }
        requeued
    }

    /// Parse, decode, and route one inbound text frame
    pub fn handle_text(&mut self, text: &str) -> Result<Option<Dispatch>> {
        let inbound = Inbound::parse(text)?;
        self.route(inbound)
    }

    pub fn route(&mut self, inbound: Inbound) -> Result<Option<Dispatch>> {
        debug!(kind = inbound.kind(), "routing inbound frame");
        match inbound {
            Inbound::Correlated { id, message } => match self.pending.resolve(id) {
                Some(PendingCall::Login) => {
                    self.complete_login(&message)?;
                    Ok(None)
                }
                Some(PendingCall::User(callback)) => Ok(Some(Dispatch::new(callback, message))),
                None => {
                    debug!(id, "dropping response without pending call");
                    Ok(None)
                }
            },
            Inbound::UncorrelatedError { message } => match &self.error_callback {
                Some(callback) => Ok(Some(Dispatch::new(callback.clone(), message))),
                None => {
                    let (text, code) = server_error_details(&message);
                    Err(ZubrError::UncaughtServer {
                        message: text,
                        code,
                        response: message,
                    })
                }
            },
            Inbound::SubscriptionPush { channel, data } => {
                let dispatch = self.subscriptions.dispatch(&channel, data);
                if dispatch.is_none() {
                    debug!(%channel, "dropping push for unknown channel");
                }
                Ok(dispatch)
            }
            Inbound::Unrecognized { message } => match &self.default_callback {
                Some(callback) => Ok(Some(Dispatch::new(callback.clone(), message))),
                None => {
                    debug!("dropping unrecognized frame");
                    Ok(None)
                }
            },
        }
    }

    /// Bind a channel callback and request the subscription
    pub fn subscribe(&mut self, channel: &str, callback: Callback) -> Result<u64> {
        self.subscriptions.insert(channel, callback)?;
        let id = self.ids.next_id();
        self.send_request(&Request::channel(id, channel), Some(channel))?;
        Ok(id)
    }

    /// Send an RPC; `callback` receives the full correlated response
    pub fn rpc(&mut self, method: &str, params: Value, callback: Option<Callback>) -> Result<u64> {
        let id = self.ids.next_id();
        self.pending.register(id, callback);
        self.send_request(&Request::rpc(id, method, params), None)?;
        Ok(id)
    }

    fn complete_login(&mut self, message: &Value) -> Result<()> {
        if message.get("error").is_some() {
            let (text, code) = server_error_details(message);
            return Err(ZubrError::Login {
                message: format!("An error occurred when logging in: {text}"),
                code,
            });
        }

        let result: TaggedResult =
            serde_json::from_value(message.get("result").cloned().unwrap_or(Value::Null))
                .map_err(|err| ZubrError::Protocol(format!("malformed login response: {err}")))?;
        if result.is_err() {
            return Err(ZubrError::Login {
                message: "Wrong credentials".to_string(),
                code: result.error_code(),
            });
        }

        info!("login succeeded");
        self.become_ready();
        Ok(())
    }

    fn become_ready(&mut self) {
        self.state = SessionState::Ready;
        let flushed_channels = self.flush_queue();
        let resubscribed = self.resubscribe_all(&flushed_channels);
        info!(
            flushed_channels = flushed_channels.len(),
            resubscribed,
            queued = self.queue.len(),
            "session ready"
        );
    }

    /// Transmit queued frames in FIFO order; returns the channels whose subscribe went out
    fn flush_queue(&mut self) -> HashSet<String> {
        let mut flushed_channels = HashSet::new();
        let Some(sink) = self.sink.as_mut() else {
            return flushed_channels;
        };

        while let Some(frame) = self.queue.pop() {
            if let Err(err) = sink.send_frame(&frame) {
                warn!(error = %err, queued = self.queue.len() + 1, "queue flush interrupted");
                self.queue.push_front(frame);
                break;
            }
            if let Some(channel) = frame.channel {
                flushed_channels.insert(channel);
            }
        }
        flushed_channels
    }

    /// Re-request every bound channel not already covered by the flush
    fn resubscribe_all(&mut self, already_sent: &HashSet<String>) -> usize {
        let channels: Vec<String> = self
            .subscriptions
            .channels()
            .filter(|channel| !already_sent.contains(*channel))
            .map(str::to_owned)
            .collect();

        for channel in &channels {
            let id = self.ids.next_id();
            if let Err(err) = self.send_request(&Request::channel(id, channel), Some(channel)) {
                warn!(%channel, error = %err, "failed to encode resubscribe request");
            }
        }
        channels.len()
    }

    fn send_request(&mut self, request: &Request, channel: Option<&str>) -> Result<()> {
        let frame = QueuedFrame {
            id: request.id,
            text: serde_json::to_string(request)?,
            channel: channel.map(str::to_owned),
        };

        if self.state == SessionState::Ready {
            if let Some(sink) = self.sink.as_mut() {
                match sink.send_frame(&frame) {
                    Ok(()) => {
                        debug!(id = request.id, "request sent");
                        return Ok(());
                    }
                    Err(err) => {
                        warn!(id = request.id, error = %err, "send failed; queueing request");
                    }
                }
            }
        }

        debug!(id = request.id, queued = self.queue.len() + 1, "request queued");
        self.queue.push(frame);
        Ok(())
    }
}
