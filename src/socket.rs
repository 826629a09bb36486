//! Auto-reconnecting socket with an observable connection state machine.
//!
//! [`ReconnectingSocket`] keeps a logical duplex connection alive over an
//! unreliable transport. Consumers observe an ordered stream of
//! [`SocketEvent`]s (state transitions interleaved with decoded frames, in
//! arrival order) plus a watch cell holding the current state for late
//! subscribers. The socket carries no protocol knowledge; frames are raw
//! JSON values.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use tungstenite::Message;

use crate::Result;

/// Delay between reconnect attempts after the first immediate retry.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the socket event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Lifecycle states of a [`ReconnectingSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Initializing,
    Connecting,
    Connected,
    Errored,
    Disconnected,
}

impl ConnectionState {
    /// Returns the wire-format state name shown to consumers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Initializing => "initializing",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "error",
            ConnectionState::Disconnected => "disconnected",
        }
    }
}

/// A state transition or decoded frame, in arrival order.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    State(ConnectionState),
    Frame(serde_json::Value),
}

/// Opens connections for a [`ReconnectingSocket`].
///
/// The production implementation speaks WebSocket; tests substitute a
/// scripted transport to drive the state machine deterministically.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>>;
}

/// One open duplex connection.
#[async_trait]
pub trait Connection: Send {
    /// Next text frame, or `None` once the peer has closed the connection.
    async fn next_frame(&mut self) -> Option<Result<String>>;

    /// Sends a text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;
}

/// Production transport speaking WebSocket over TCP or TLS.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>> {
        let (stream, _response) = connect_async(url).await?;
        debug!("WebSocket handshake completed");
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Ping(payload)) => {
                    if let Err(e) = self.stream.send(Message::Pong(payload)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => {} // Binary/Pong/Frame messages
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }
}

/// Why the reader loop exited.
enum Disconnect {
    /// The connection was lost or errored; retry through the error path.
    Error,
    /// The peer closed cleanly; retry without the error transition.
    Closed,
    /// The owner requested shutdown.
    Shutdown,
}

/// Maintains a logical always-available connection, reconnecting with a
/// fixed short delay.
///
/// The first reconnect after a drop is immediate; subsequent attempts wait
/// [`RECONNECT_DELAY`]. The attempt counter resets on every successful
/// connection.
pub struct ReconnectingSocket {
    events: broadcast::Sender<SocketEvent>,
    state: watch::Receiver<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
    attempts: Arc<AtomicU32>,
}

impl ReconnectingSocket {
    /// Spawns the connection task for `url` using the WebSocket transport.
    pub fn spawn(url: String) -> Self {
        Self::with_transport(url, Arc::new(WsTransport))
    }

    /// Spawns the connection task with a custom transport.
    pub fn with_transport(url: String, transport: Arc<dyn Transport>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Initializing);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let attempts = Arc::new(AtomicU32::new(0));

        tokio::spawn(run(
            url,
            transport,
            events.clone(),
            state_tx,
            outbound_rx,
            shutdown_rx,
            Arc::clone(&attempts),
        ));

        Self {
            events,
            state: state_rx,
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            attempts,
        }
    }

    /// Subscribes to the ordered event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.events.subscribe()
    }

    /// Watch cell holding the current connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Reconnect attempts consumed since the last successful connection.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Queues a text frame for delivery on the current connection.
    ///
    /// Frames queued while disconnected are delivered after reconnect.
    pub fn send_text(&self, text: String) {
        let _ = self.outbound.send(text);
    }

    /// Stops the connection task. The socket emits a final `Disconnected`
    /// transition and will not reconnect.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn run(
    url: String,
    transport: Arc<dyn Transport>,
    events: broadcast::Sender<SocketEvent>,
    state: watch::Sender<ConnectionState>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: watch::Receiver<bool>,
    attempts: Arc<AtomicU32>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        // The first retry after a drop goes out immediately; later ones
        // wait the fixed delay.
        if attempts.load(Ordering::Relaxed) > 0 {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
        attempts.fetch_add(1, Ordering::Relaxed);

        set_state(&events, &state, ConnectionState::Connecting);
        info!(url = %url, "Connecting");

        let mut conn = match transport.connect(&url).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(url = %url, error = %e, "Connection attempt failed");
                set_state(&events, &state, ConnectionState::Errored);
                set_state(&events, &state, ConnectionState::Disconnected);
                continue;
            }
        };

        attempts.store(0, Ordering::Relaxed);
        set_state(&events, &state, ConnectionState::Connected);
        info!(url = %url, "Connected");

        match read_loop(conn.as_mut(), &events, &mut outbound, &mut shutdown).await {
            Disconnect::Error => {
                set_state(&events, &state, ConnectionState::Errored);
                set_state(&events, &state, ConnectionState::Disconnected);
            }
            Disconnect::Closed => {
                set_state(&events, &state, ConnectionState::Disconnected);
            }
            Disconnect::Shutdown => {
                set_state(&events, &state, ConnectionState::Disconnected);
                info!("Socket shut down");
                return;
            }
        }
    }
}

/// Reads frames and relays queued outbound text until disconnection or
/// shutdown.
async fn read_loop(
    conn: &mut dyn Connection,
    events: &broadcast::Sender<SocketEvent>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> Disconnect {
    loop {
        // The select yields the next queued outbound frame; the write runs
        // after it so the connection is only borrowed by one future at a
        // time.
        let to_send = tokio::select! {
            frame = conn.next_frame() => {
                match frame {
                    Some(Ok(text)) => {
                        match serde_json::from_str(&text) {
                            Ok(value) => {
                                let _ = events.send(SocketEvent::Frame(value));
                            }
                            Err(e) => warn!(error = %e, "Dropping malformed frame"),
                        }
                        continue;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket read failed");
                        return Disconnect::Error;
                    }
                    None => {
                        debug!("Connection closed by peer");
                        return Disconnect::Closed;
                    }
                }
            }

            text = outbound.recv() => {
                match text {
                    Some(text) => text,
                    // Sender gone means the owner was dropped.
                    None => return Disconnect::Shutdown,
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return Disconnect::Shutdown;
                }
                continue;
            }
        };

        if let Err(e) = conn.send_text(to_send).await {
            warn!(error = %e, "WebSocket send failed");
            return Disconnect::Error;
        }
    }
}

fn set_state(
    events: &broadcast::Sender<SocketEvent>,
    state: &watch::Sender<ConnectionState>,
    next: ConnectionState,
) {
    debug!(state = next.as_str(), "Socket state");
    let _ = state.send(next);
    let _ = events.send(SocketEvent::State(next));
}
