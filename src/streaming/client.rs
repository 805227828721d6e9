//! WebSocket transport client
//!
//! [`TransportClient`] keeps one persistent connection to a terminal
//! streaming host. A single background task owns the socket; callers talk
//! to it through a command channel and observe it through a
//! [`watch`](tokio::sync::watch) channel carrying the [`ConnectionState`].
//!
//! The task loops `Connecting → Connected → Disconnected` until told to
//! stop. Any failure (handshake, send, receive, close by the host) leads to
//! a backoff sleep and another attempt; the attempt counter resets once a
//! connection is established. Every session subscribed at the time is
//! re-subscribed on each new connection.
//!
//! The handshake is bounded by `connect_timeout`. A connection that stays
//! silent for a full ping interval after a keepalive ping counts as
//! dropped.

use super::auth::{StaticToken, TokenProvider};
use super::config::TransportConfig;
use super::error::{Result, TransportError};
use super::protocol::{ClientMessage, ServerMessage};
use crate::buffer::{self, BufferSnapshot, DecodeError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Public types
// =============================================================================

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// Something that happened to a subscribed session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A decoded binary screen snapshot
    Snapshot(BufferSnapshot),
    /// Raw PTY output for the emulator path
    Output(String),
    /// The session's terminal was resized
    Resize { cols: u16, rows: u16 },
}

/// Callback receiving a session's events, in arrival order
pub type EventHandler = Arc<dyn Fn(SessionEvent) + Send + Sync>;

enum Command {
    Send(ClientMessage),
    Shutdown,
}

/// How a live connection ended
enum ConnectionEnd {
    Shutdown,
    Dropped(TransportError),
}

// =============================================================================
// Client
// =============================================================================

struct Inner {
    config: TransportConfig,
    token: Box<dyn TokenProvider>,
    state: watch::Sender<ConnectionState>,
    subscriptions: Mutex<HashMap<String, EventHandler>>,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Persistent, self-healing connection to a streaming host
pub struct TransportClient {
    inner: Arc<Inner>,
}

impl TransportClient {
    /// Create a client without authentication
    pub fn new(config: TransportConfig) -> Self {
        Self::with_token_provider(config, StaticToken::none())
    }

    pub fn with_token_provider(
        config: TransportConfig,
        token: impl TokenProvider + 'static,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                token: Box::new(token),
                state,
                subscriptions: Mutex::new(HashMap::new()),
                commands: Mutex::new(None),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    /// Start the connection task.
    ///
    /// Returns once the URL has been validated; the connection itself is
    /// established in the background. Calling this while a connection task
    /// is already running does nothing. Must be called within a tokio
    /// runtime.
    pub fn connect(&self) -> Result<()> {
        build_url(&self.inner.config.url, &self.inner.config.token_query_param, None)?;

        let mut task = self.inner.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("Connect requested while already running, ignoring");
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.commands.lock() = Some(tx);
        *task = Some(tokio::spawn(run(Arc::clone(&self.inner), rx)));
        Ok(())
    }

    /// Close the connection and cancel reconnect and ping timers.
    ///
    /// Subscriptions are kept, so a later [`connect`](Self::connect)
    /// resumes them.
    pub async fn disconnect(&self) {
        if let Some(tx) = self.inner.commands.lock().take() {
            let _ = tx.send(Command::Shutdown);
        }
        let task = self.inner.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Transport task failed: {}", e);
            }
        }
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Subscribe to a session's snapshots
    pub fn subscribe<F>(&self, session_id: impl Into<String>, handler: F)
    where
        F: Fn(BufferSnapshot) + Send + Sync + 'static,
    {
        self.subscribe_events(session_id, move |event| {
            if let SessionEvent::Snapshot(snapshot) = event {
                handler(snapshot);
            }
        });
    }

    /// Subscribe to every event of a session.
    ///
    /// Replaces any earlier handler for the same session.
    pub fn subscribe_events<F>(&self, session_id: impl Into<String>, handler: F)
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let session_id = session_id.into();
        tracing::info!(session = %session_id, "Subscribing");
        self.inner
            .subscriptions
            .lock()
            .insert(session_id.clone(), Arc::new(handler));
        self.inner
            .command(Command::Send(ClientMessage::subscribe(session_id)));
    }

    /// Stop receiving a session. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, session_id: &str) -> bool {
        if self.inner.subscriptions.lock().remove(session_id).is_none() {
            return false;
        }
        tracing::info!(session = %session_id, "Unsubscribing");
        self.inner
            .command(Command::Send(ClientMessage::unsubscribe(session_id)));
        true
    }

    /// Sessions currently subscribed
    pub fn subscriptions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.subscriptions.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Send a control message on the live connection
    pub fn send(&self, message: ClientMessage) -> Result<()> {
        if self.state() != ConnectionState::Connected {
            return Err(TransportError::NotConnected);
        }
        if self.inner.command(Command::Send(message)) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Observe connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Route an event as if it had arrived from the host
    #[cfg(test)]
    pub(crate) fn deliver(&self, session_id: &str, event: SessionEvent) {
        self.inner.dispatch(session_id, event);
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        // Closing the command channel stops the task
        self.inner.commands.lock().take();
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("subscriptions", &self.subscriptions())
            .finish()
    }
}

// =============================================================================
// Connection task
// =============================================================================

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!("Transport {} -> {}", previous, state);
        }
    }

    fn command(&self, command: Command) -> bool {
        match self.commands.lock().as_ref() {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    fn handler(&self, session_id: &str) -> Option<EventHandler> {
        self.subscriptions.lock().get(session_id).cloned()
    }

    fn dispatch(&self, session_id: &str, event: SessionEvent) {
        match self.handler(session_id) {
            Some(handler) => handler(event),
            None => tracing::debug!(session = %session_id, "Event for unsubscribed session dropped"),
        }
    }

    async fn open(&self) -> Result<WsStream> {
        let token = self
            .token
            .token()
            .map_err(|e| TransportError::Authentication(e.to_string()))?;
        let url = build_url(&self.config.url, &self.config.token_query_param, token.as_deref())?;

        let mut request = url.as_str().into_client_request()?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TransportError::Authentication(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    /// Serve one live connection until it drops or we are told to stop
    async fn drive(
        &self,
        ws: WsStream,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> ConnectionEnd {
        let (mut ws_tx, mut ws_rx) = ws.split();

        // Queued while offline; the subscription table below supersedes them
        while let Ok(command) = commands.try_recv() {
            if let Command::Shutdown = command {
                let _ = ws_tx.send(Message::Close(None)).await;
                return ConnectionEnd::Shutdown;
            }
        }

        let mut session_ids: Vec<String> = self.subscriptions.lock().keys().cloned().collect();
        session_ids.sort();
        for session_id in session_ids {
            tracing::debug!(session = %session_id, "Resubscribing");
            if let Err(e) = send_message(&mut ws_tx, &ClientMessage::subscribe(session_id)).await {
                return ConnectionEnd::Dropped(e);
            }
        }

        let period = self.config.ping_interval;
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Set when a ping goes out, cleared by any inbound frame
        let mut awaiting_reply = false;

        loop {
            tokio::select! {
                msg = ws_rx.next() => {
                    if matches!(msg, Some(Ok(_))) {
                        awaiting_reply = false;
                    }
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.handle_text(text.as_str()) {
                                if let Err(e) = send_message(&mut ws_tx, &reply).await {
                                    return ConnectionEnd::Dropped(e);
                                }
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if let Err(e) = self.handle_binary(&data) {
                                tracing::warn!("Dropping binary frame: {}", e);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                                return ConnectionEnd::Dropped(e.into());
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            tracing::trace!("Keepalive pong received");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!("Host closed connection: {:?}", frame);
                            return ConnectionEnd::Dropped(TransportError::ConnectionClosed);
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => return ConnectionEnd::Dropped(e.into()),
                        None => return ConnectionEnd::Dropped(TransportError::ConnectionClosed),
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(Command::Send(message)) => {
                            if let Err(e) = send_message(&mut ws_tx, &message).await {
                                return ConnectionEnd::Dropped(e);
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            return ConnectionEnd::Shutdown;
                        }
                    }
                }

                _ = keepalive.tick() => {
                    if awaiting_reply {
                        return ConnectionEnd::Dropped(TransportError::Timeout(format!(
                            "no reply to keepalive ping within {:?}",
                            period
                        )));
                    }
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new().into())).await {
                        tracing::warn!("Keepalive ping failed: {}", e);
                        return ConnectionEnd::Dropped(e.into());
                    }
                    awaiting_reply = true;
                }
            }
        }
    }

    /// Handle a control message; returns a reply to send, if any
    fn handle_text(&self, text: &str) -> Option<ClientMessage> {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("{}", e);
                return None;
            }
        };

        match message {
            ServerMessage::Ping => return Some(ClientMessage::pong()),
            ServerMessage::Pong => tracing::trace!("Pong received"),
            ServerMessage::Error { message, code } => {
                tracing::warn!(?code, "Host reported error: {}", message);
            }
            ServerMessage::Output { session_id, data } => {
                self.dispatch(&session_id, SessionEvent::Output(data));
            }
            ServerMessage::Resize {
                session_id,
                cols,
                rows,
            } => {
                self.dispatch(&session_id, SessionEvent::Resize { cols, rows });
            }
            ServerMessage::Unknown => {
                tracing::debug!("Ignoring unknown control message: {}", text);
            }
        }
        None
    }

    /// Route an enveloped snapshot to its session.
    ///
    /// Frames for sessions without a handler are skipped. Envelope and
    /// snapshot errors are returned for the caller to log.
    fn handle_binary(&self, data: &[u8]) -> std::result::Result<(), DecodeError> {
        let frame = buffer::decode_frame(data)?;
        let Some(handler) = self.handler(frame.session_id) else {
            tracing::debug!(session = %frame.session_id, "Snapshot for unsubscribed session dropped");
            return Ok(());
        };
        handler(SessionEvent::Snapshot(frame.snapshot()?));
        Ok(())
    }
}

async fn run(inner: Arc<Inner>, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut attempt: u32 = 0;

    loop {
        inner.set_state(ConnectionState::Connecting);
        let limit = inner.config.connect_timeout;
        let opened = {
            let open = tokio::time::timeout(limit, inner.open());
            tokio::pin!(open);
            loop {
                tokio::select! {
                    result = &mut open => break result,
                    command = commands.recv() => match command {
                        Some(Command::Send(_)) => continue,
                        Some(Command::Shutdown) | None => {
                            tracing::debug!("Shutdown during handshake");
                            inner.set_state(ConnectionState::Disconnected);
                            return;
                        }
                    },
                }
            }
        };
        let opened = opened.unwrap_or_else(|_| {
            Err(TransportError::Timeout(format!("handshake took longer than {:?}", limit)))
        });

        match opened {
            Ok(ws) => {
                attempt = 0;
                inner.set_state(ConnectionState::Connected);
                match inner.drive(ws, &mut commands).await {
                    ConnectionEnd::Shutdown => {
                        inner.set_state(ConnectionState::Disconnected);
                        return;
                    }
                    ConnectionEnd::Dropped(e) => tracing::warn!("Connection lost: {}", e),
                }
            }
            Err(e) => tracing::warn!("Connection attempt failed: {}", e),
        }

        inner.set_state(ConnectionState::Disconnected);
        let delay = inner.config.reconnect.delay_for(attempt);
        attempt = attempt.saturating_add(1);
        tracing::info!("Reconnecting in {:?} (attempt {})", delay, attempt);

        let wake = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => break,
                command = commands.recv() => match command {
                    // Subscriptions are replayed from the table on reconnect
                    Some(Command::Send(_)) => continue,
                    Some(Command::Shutdown) | None => {
                        tracing::debug!("Shutdown during backoff");
                        return;
                    }
                },
            }
        }
    }
}

async fn send_message<S>(ws_tx: &mut S, message: &ClientMessage) -> Result<()>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let json = message.to_json()?;
    ws_tx.send(Message::text(json)).await?;
    Ok(())
}

/// Validate the endpoint and attach the token as a query parameter
pub(crate) fn build_url(base: &str, token_param: &str, token: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(base)?;
    match url.scheme() {
        "ws" => {}
        "wss" => {
            return Err(TransportError::InvalidUrl(format!(
                "{}: TLS endpoints are not supported",
                base
            )))
        }
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                base, other
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(TransportError::InvalidUrl(format!("{}: missing host", base)));
    }
    if let Some(token) = token {
        url.query_pairs_mut().append_pair(token_param, token);
    }
    Ok(url)
}
