/*
[INPUT]:  Client configuration, user calls, WebSocket frames
[OUTPUT]: Requests on the wire and callbacks invoked in frame arrival order
[POS]:    Transport layer - async driver around the sans-IO session
[UPDATE]: When changing connection handling, keep-alive, or reconnect supervision
*/

use std::sync::Arc;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::decimal::IntoWireDecimal;
use crate::error::{Result, ZubrError};
use crate::queue::QueuedFrame;
use crate::router::Callback;
use crate::session::{FrameSink, Session, SessionState};
use crate::types::{NewOrder, OrderType, TimeInForce};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct ChannelSink(mpsc::UnboundedSender<QueuedFrame>);

impl FrameSink for ChannelSink {
    fn send_frame(&mut self, frame: &QueuedFrame) -> Result<()> {
        self.0
            .send(frame.clone())
            .map_err(|_| ZubrError::Transport("WebSocket send channel closed".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionExit {
    /// Socket closed; `reached_ready` if the session logged in on it
    Closed { reached_ready: bool },
    Shutdown,
}

/// WebSocket client for the Zubr exchange.
///
/// Calls made before [`ZubrClient::run`] connects are queued and sent once the session is
/// logged in. Cloning is cheap; clones share one session.
#[derive(Debug, Clone)]
pub struct ZubrClient {
    config: Arc<ClientConfig>,
    session: Arc<Mutex<Session>>,
    shutdown: CancellationToken,
}

impl ZubrClient {
    /// Create a client; nothing is sent until [`ZubrClient::run`]
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let session =
            Session::new(config.credentials.clone()).with_uncaught_errors(config.uncaught_errors);
        Ok(Self {
            config: Arc::new(config),
            session: Arc::new(Mutex::new(session)),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state()
    }

    /// Token that stops [`ZubrClient::run`] gracefully when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Callback for uncorrelated server errors; without one they follow the configured policy
    pub async fn subscribe_errors(&self, callback: Callback) {
        self.session.lock().await.subscribe_errors(callback);
    }

    /// Callback for frames that match no other route
    pub async fn set_default_callback(&self, callback: Callback) {
        self.session.lock().await.set_default_callback(callback);
    }

    pub async fn subscribe(&self, channel: &str, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe(channel, callback)
    }

    pub async fn subscribe_orders(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_orders(callback)
    }

    pub async fn subscribe_order_fills(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_order_fills(callback)
    }

    pub async fn subscribe_instruments(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_instruments(callback)
    }

    pub async fn subscribe_last_trades(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_last_trades(callback)
    }

    pub async fn subscribe_orderbook(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_orderbook(callback)
    }

    pub async fn subscribe_balance(&self, callback: Callback) -> Result<u64> {
        self.session.lock().await.subscribe_balance(callback)
    }

    pub async fn subscribe_candles(
        &self,
        instrument_id: u64,
        resolution: &str,
        callback: Callback,
    ) -> Result<u64> {
        self.session
            .lock()
            .await
            .subscribe_candles(instrument_id, resolution, callback)
    }

    pub async fn place_order(&self, order: NewOrder, callback: Option<Callback>) -> Result<u64> {
        self.session.lock().await.place_order(order, callback)
    }

    pub async fn buy(
        &self,
        instrument_id: u64,
        price: impl IntoWireDecimal,
        size: u64,
        order_type: OrderType,
        time_in_force: TimeInForce,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.session
            .lock()
            .await
            .buy(instrument_id, price, size, order_type, time_in_force, callback)
    }

    pub async fn sell(
        &self,
        instrument_id: u64,
        price: impl IntoWireDecimal,
        size: u64,
        order_type: OrderType,
        time_in_force: TimeInForce,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.session
            .lock()
            .await
            .sell(instrument_id, price, size, order_type, time_in_force, callback)
    }

    pub async fn replace_order(
        &self,
        order_id: &str,
        price: impl IntoWireDecimal,
        size: u64,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.session
            .lock()
            .await
            .replace_order(order_id, price, size, callback)
    }

    pub async fn cancel_order(&self, order_id: &str, callback: Option<Callback>) -> Result<u64> {
        self.session.lock().await.cancel_order(order_id, callback)
    }

    pub async fn get_candles_range(
        &self,
        instrument_id: u64,
        resolution: &str,
        from: i64,
        to: i64,
        callback: Option<Callback>,
    ) -> Result<u64> {
        self.session
            .lock()
            .await
            .get_candles_range(instrument_id, resolution, from, to, callback)
    }

    /// Connect and process frames until the socket closes or shutdown is requested.
    ///
    /// With a reconnect policy configured, closed or failed connections are retried with
    /// backoff. The retry count resets only after a connection reaches `Ready`. Returns
    /// `Ok(())` on shutdown or on close without reconnect.
    pub async fn run(&self) -> Result<()> {
        let mut retry_count: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            let (reconnect, failure) = match self.connect_once().await {
                Ok(ConnectionExit::Shutdown) => {
                    info!("client shutdown complete");
                    return Ok(());
                }
                Ok(ConnectionExit::Closed { reached_ready }) => {
                    let Some(reconnect) = self.config.reconnect.as_ref() else {
                        info!("connection closed");
                        return Ok(());
                    };
                    if reached_ready {
                        retry_count = 0;
                    }
                    (reconnect, None)
                }
                Err(err) => {
                    if self.session.lock().await.is_terminal(&err) {
                        error!(error = %err, "session terminated");
                        return Err(err);
                    }
                    let Some(reconnect) = self.config.reconnect.as_ref() else {
                        return Err(err);
                    };
                    (reconnect, Some(err))
                }
            };

            retry_count = retry_count.saturating_add(1);
            if reconnect.max_retries.is_some_and(|max| retry_count > max) {
                warn!(retry_count, error = ?failure, "gave up reconnecting");
                return Err(ZubrError::ReconnectExhausted {
                    attempts: retry_count - 1,
                });
            }

            let backoff = reconnect.backoff(retry_count);
            match &failure {
                Some(err) => {
                    warn!(retry_count, ?backoff, error = %err, "connection failed; retrying with backoff")
                }
                None => info!(retry_count, ?backoff, "connection closed; reconnecting"),
            }
            if self.sleep_or_shutdown(backoff).await {
                return Ok(());
            }
        }
    }

    /// Returns true if shutdown was requested while waiting
    async fn sleep_or_shutdown(&self, delay: std::time::Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    async fn connect_once(&self) -> Result<ConnectionExit> {
        self.session.lock().await.on_connecting();

        let ws = match self.open_socket().await {
            Ok(ws) => ws,
            Err(err) => {
                self.session.lock().await.on_close();
                return Err(err);
            }
        };

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let opened = self
            .session
            .lock()
            .await
            .on_open(Box::new(ChannelSink(outbound_tx)), Utc::now().timestamp());
        if let Err(err) = opened {
            self.close_connection(Vec::new(), &mut outbound_rx).await;
            return Err(err);
        }

        let mut unwritten = Vec::new();
        let exit = self.stream_loop(ws, &mut outbound_rx, &mut unwritten).await;
        let reached_ready = self.close_connection(unwritten, &mut outbound_rx).await;
        match exit {
            Ok(ConnectionExit::Closed { .. }) => Ok(ConnectionExit::Closed { reached_ready }),
            other => other,
        }
    }

    /// Detach the session from a dead connection and hand back every frame it never wrote.
    ///
    /// `unwritten` holds frames already taken from the channel whose write failed. Returns
    /// whether the session was ready on this connection.
    async fn close_connection(
        &self,
        mut unwritten: Vec<QueuedFrame>,
        outbound_rx: &mut mpsc::UnboundedReceiver<QueuedFrame>,
    ) -> bool {
        outbound_rx.close();
        while let Ok(frame) = outbound_rx.try_recv() {
            unwritten.push(frame);
        }

        let mut session = self.session.lock().await;
        let reached_ready = session.is_ready();
        session.on_close();
        session.requeue_unsent(unwritten);
        reached_ready
    }

    async fn open_socket(&self) -> Result<WsStream> {
        let endpoint = self.config.endpoint()?;
        let mut request = endpoint.as_str().into_client_request()?;
        let user_agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|err| ZubrError::Config(format!("invalid user agent: {err}")))?;
        request.headers_mut().insert(USER_AGENT, user_agent);

        info!(url = %endpoint, "connecting to Zubr WebSocket");
        let (ws, response) = connect_async(request).await?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(ws)
    }

    async fn stream_loop(
        &self,
        ws: WsStream,
        outbound_rx: &mut mpsc::UnboundedReceiver<QueuedFrame>,
        unwritten: &mut Vec<QueuedFrame>,
    ) -> Result<ConnectionExit> {
        let closed = ConnectionExit::Closed {
            reached_ready: false,
        };
        let (mut write, mut read) = ws.split();
        let mut ping = tokio::time::interval(self.config.ping_interval);
        ping.reset();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("shutdown requested; closing connection");
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(ConnectionExit::Shutdown);
                }
                _ = ping.tick() => {
                    if let Err(err) = write.send(WsMessage::Ping(Default::default())).await {
                        warn!(error = %err, "keep-alive ping failed");
                        return Ok(closed);
                    }
                }
                outbound = outbound_rx.recv() => {
                    let Some(frame) = outbound else {
                        return Ok(closed);
                    };
                    if let Err(err) = write.send(WsMessage::Text(frame.text.clone().into())).await {
                        warn!(id = frame.id, error = %err, "WebSocket write failed");
                        unwritten.push(frame);
                        return Ok(closed);
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            self.handle_frame(text.as_str()).await?;
                        }
                        Some(Ok(WsMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                            Ok(text) => self.handle_frame(text).await?,
                            Err(err) => warn!(error = %err, "dropping non-utf8 binary frame"),
                        },
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(?frame, "server closed connection");
                            return Ok(closed);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(error = %err, "WebSocket read failed");
                            return Ok(closed);
                        }
                        None => return Ok(closed),
                    }
                }
            }
        }
    }

    /// Route one frame under the lock, then invoke its callback with the lock released
    async fn handle_frame(&self, text: &str) -> Result<()> {
        let (outcome, terminal) = {
            let mut session = self.session.lock().await;
            let outcome = session.handle_text(text);
            let terminal = matches!(&outcome, Err(err) if session.is_terminal(err));
            (outcome, terminal)
        };

        match outcome {
            Ok(Some(dispatch)) => dispatch.invoke(),
            Ok(None) => {}
            Err(err) if terminal => return Err(err),
            Err(err) => warn!(error = %err, "failed to handle inbound frame"),
        }
        Ok(())
    }
}
