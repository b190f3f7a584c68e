//! Realtime chat connection.
//!
//! ARCHITECTURE
//! ============
//! [`RealtimeClient`] is an explicit state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Closed
//!                     ^                   |
//!                     +----- connect -----+
//! ```
//!
//! Each connection owns one I/O task fed by an unbounded channel. The task
//! writes queued frames and dispatches inbound text frames to the single
//! registered handler.
//!
//! INVARIANTS
//! ==========
//! - At most one live socket: `connect` closes the prior connection and joins
//!   its task before opening a new one.
//! - Every connection carries a generation number. A finishing task only
//!   moves the state to `Closed` if its generation is still current, so a
//!   stale task never clobbers a newer connection.
//! - No automatic reconnect.
//! - A pending handshake is bounded by the handshake timeout and aborted by
//!   `close`, so `close` never waits on a stalled peer.

#[cfg(test)]
#[path = "realtime_test.rs"]
mod realtime_test;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frames::{ChatFrame, decode_frame, encode_frame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::storage::lock;

pub const CONNECT_PATH: &str = "/api/v1/social/ws/connect";
/// `room_id` sent when the connection is not bound to a chat room.
pub const NO_ROOM: i64 = -1;
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Callback receiving every decoded inbound frame.
pub type MessageHandler = Arc<dyn Fn(ChatFrame) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error("invalid websocket url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
    #[error("websocket handshake aborted by close")]
    Aborted,
    #[error("timed out waiting for connection state {0:?}")]
    Timeout(ConnectionState),
}

enum Outbound {
    Text(String),
    Close,
}

struct ActiveSocket {
    generation: u64,
    tx: mpsc::UnboundedSender<Outbound>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    ws_base: String,
    handshake_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
    handler: Mutex<Option<MessageHandler>>,
    active: Mutex<Option<ActiveSocket>>,
    pending: Mutex<Option<CancellationToken>>,
    next_generation: AtomicU64,
    connect_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!(?previous, ?state, "realtime state changed");
        }
    }

    fn finish(&self, generation: u64) {
        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
            self.set_state(ConnectionState::Closed);
            tracing::info!(generation, "realtime connection closed");
        }
    }

    fn dispatch(&self, text: &str) {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(%error, "dropping undecodable chat frame");
                return;
            }
        };
        let handler = lock(&self.handler).clone();
        match handler {
            Some(handler) => handler(frame),
            None => tracing::debug!(kind = %frame.kind, "no message handler registered; dropping frame"),
        }
    }
}

/// Cloneable handle to one realtime connection slot.
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("ws_base", &self.shared.ws_base)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RealtimeClient {
    /// Client for the websocket gateway at `ws_base` (e.g. `"ws://localhost:8080"`).
    #[must_use]
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self::with_handshake_timeout(ws_base, DEFAULT_HANDSHAKE_TIMEOUT)
    }

    /// Like [`RealtimeClient::new`], giving up on a handshake after `handshake_timeout`.
    #[must_use]
    pub fn with_handshake_timeout(ws_base: impl Into<String>, handshake_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                ws_base: ws_base.into().trim_end_matches('/').to_owned(),
                handshake_timeout,
                state_tx,
                handler: Mutex::new(None),
                active: Mutex::new(None),
                pending: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                connect_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// `<ws base>/api/v1/social/ws/connect?token=..&room_id=..[&to_user=..]`
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::InvalidUrl`] when the base does not parse.
    pub fn connect_url(&self, token: &str, room_id: Option<i64>, to_user: Option<i64>) -> Result<Url, RealtimeError> {
        let mut url = Url::parse(&format!("{}{CONNECT_PATH}", self.shared.ws_base))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("token", token)
                .append_pair("room_id", &room_id.unwrap_or(NO_ROOM).to_string());
            if let Some(to_user) = to_user {
                query.append_pair("to_user", &to_user.to_string());
            }
        }
        Ok(url)
    }

    /// Open a connection, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Connect`] when the handshake fails,
    /// [`RealtimeError::HandshakeTimeout`] when it stalls and
    /// [`RealtimeError::Aborted`] when [`RealtimeClient::close`] interrupts it.
    /// The state is then `Closed`.
    pub async fn connect(&self, token: &str, room_id: Option<i64>, to_user: Option<i64>) -> Result<(), RealtimeError> {
        let _guard = self.shared.connect_lock.lock().await;
        self.shutdown_active().await;

        let url = self.connect_url(token, room_id, to_user)?;
        let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *lock(&self.shared.pending) = Some(cancel.clone());
        self.shared.set_state(ConnectionState::Connecting);
        tracing::info!(generation, room_id = room_id.unwrap_or(NO_ROOM), ?to_user, "connecting realtime socket");

        let handshake_timeout = self.shared.handshake_timeout;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RealtimeError::Aborted),
            result = tokio::time::timeout(handshake_timeout, connect_async(url.as_str())) => match result {
                Ok(Ok((stream, _))) => Ok(stream),
                Ok(Err(error)) => Err(RealtimeError::Connect(Box::new(error))),
                Err(_) => Err(RealtimeError::HandshakeTimeout(handshake_timeout)),
            },
        };
        lock(&self.shared.pending).take();

        let stream = match outcome {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(generation, %error, "realtime connect failed");
                self.shared.set_state(ConnectionState::Closed);
                return Err(error);
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut active = lock(&self.shared.active);
            *active = Some(ActiveSocket { generation, tx, task: None });
            self.shared.set_state(ConnectionState::Open);
        }
        tracing::info!(generation, "realtime connection open");

        let task = tokio::spawn(run_socket(Arc::clone(&self.shared), generation, stream, rx));
        if let Some(active) = lock(&self.shared.active)
            .as_mut()
            .filter(|a| a.generation == generation)
        {
            active.task = Some(task);
        }
        Ok(())
    }

    /// Queue `frame` on the open connection. Returns `false` (and logs) when
    /// there is none.
    pub fn send(&self, frame: &ChatFrame) -> bool {
        if self.state() != ConnectionState::Open {
            tracing::warn!(kind = %frame.kind, "websocket not connected; frame dropped");
            return false;
        }
        let text = match encode_frame(frame) {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(%error, "failed to encode chat frame");
                return false;
            }
        };
        let active = lock(&self.shared.active);
        match active.as_ref() {
            Some(active) => active.tx.send(Outbound::Text(text)).is_ok(),
            None => {
                tracing::warn!(kind = %frame.kind, "websocket not connected; frame dropped");
                false
            }
        }
    }

    /// `{ type: "private", to, content }`
    pub fn send_private_message(&self, to_user: i64, content: &str) -> bool {
        self.send(&ChatFrame::private(to_user, content))
    }

    /// `{ type: "chat", content }`
    pub fn send_chat_message(&self, content: &str) -> bool {
        self.send(&ChatFrame::chat(content))
    }

    /// Register the inbound frame handler; replaces any previous one.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(ChatFrame) + Send + Sync + 'static,
    {
        *lock(&self.shared.handler) = Some(Arc::new(handler));
    }

    pub fn clear_message_handler(&self) {
        *lock(&self.shared.handler) = None;
    }

    /// Close the current connection, aborting a pending handshake. Always
    /// ends in `Closed`. Idempotent.
    pub async fn close(&self) {
        let pending = lock(&self.shared.pending).take();
        if let Some(pending) = pending {
            tracing::info!("aborting pending realtime handshake");
            pending.cancel();
        }
        let _guard = self.shared.connect_lock.lock().await;
        self.shutdown_active().await;
        self.shared.set_state(ConnectionState::Closed);
    }

    /// Wait until the state equals `target`.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Timeout`] if `target` is not reached in time.
    pub async fn wait_for_state(&self, target: ConnectionState, timeout: Duration) -> Result<(), RealtimeError> {
        let mut rx = self.shared.state_tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|state| *state == target)).await {
            Ok(Ok(_)) => Ok(()),
            _ => Err(RealtimeError::Timeout(target)),
        }
    }

    async fn shutdown_active(&self) {
        let previous = lock(&self.shared.active).take();
        let Some(previous) = previous else {
            return;
        };
        tracing::info!(generation = previous.generation, "closing realtime connection");
        if previous.tx.send(Outbound::Close).is_err() {
            tracing::debug!(generation = previous.generation, "socket task already gone");
        }
        self.shared.set_state(ConnectionState::Closed);

        if let Some(mut task) = previous.task {
            match tokio::time::timeout(CLOSE_TIMEOUT, &mut task).await {
                Ok(Err(error)) => tracing::warn!(%error, "socket task failed"),
                Ok(Ok(())) => {}
                Err(_) => {
                    tracing::warn!(generation = previous.generation, "socket task did not stop; aborting");
                    task.abort();
                }
            }
        }
    }
}

async fn run_socket(
    shared: Arc<Shared>,
    generation: u64,
    stream: WsStream,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(Outbound::Text(text)) => {
                    if let Err(error) = write.send(Message::Text(text.into())).await {
                        tracing::warn!(generation, %error, "websocket write failed");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(error) = write.send(Message::Close(None)).await {
                        tracing::debug!(generation, %error, "close frame not delivered");
                    }
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => shared.dispatch(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(generation, ?frame, "server closed websocket");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(generation, %error, "websocket read failed");
                    break;
                }
                None => break,
            },
        }
    }
    rx.close();
    shared.finish(generation);
}
