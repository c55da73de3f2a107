//! WebSocket channel to the chat backend.
//!
//! Implements [`RoomChannel`] over a WebSocket connection. Events travel as
//! JSON text frames. A background reader task decodes inbound frames and
//! feeds them into an mpsc queue that [`RoomChannel::recv`] drains.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use roomchat_proto::codec;
use roomchat_proto::event::{ClientEvent, ServerEvent};
use roomchat_proto::room::RoomId;
use roomchat_proto::user::UserId;

use super::{ChannelError, Connector, RoomChannel};

/// Type alias for the write half of a WebSocket connection.
type WsSender = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default timeout for establishing the WebSocket connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the inbound event queue fed by the reader task.
const INBOUND_BUFFER: usize = 256;

/// Opens [`WsChannel`]s against a fixed WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// WebSocket URL of the chat backend (e.g. `ws://127.0.0.1:3000/ws`).
    socket_url: String,
}

impl WsConnector {
    /// Create a connector for the given WebSocket URL.
    pub fn new(socket_url: impl Into<String>) -> Self {
        Self {
            socket_url: socket_url.into(),
        }
    }

    /// The WebSocket URL this connector dials.
    #[must_use]
    pub fn socket_url(&self) -> &str {
        &self.socket_url
    }
}

impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn open(&self, room: &RoomId, user: &UserId) -> Result<WsChannel, ChannelError> {
        WsChannel::open(&self.socket_url, room, user).await
    }
}

/// WebSocket implementation of [`RoomChannel`].
///
/// Created via [`WsChannel::open`], which establishes the connection,
/// performs the join handshake, and spawns a background reader task.
pub struct WsChannel {
    /// The room this channel is joined to.
    room_id: RoomId,
    /// Write half of the WebSocket (shared for concurrent sends).
    ws_sender: Arc<Mutex<WsSender>>,
    /// Queue of decoded inbound events, fed by the reader task.
    incoming: Mutex<mpsc::Receiver<ServerEvent>>,
    /// Whether the connection is still live.
    open: Arc<AtomicBool>,
    /// Set exactly once by [`RoomChannel::close`] (directly or via `Drop`).
    closed: AtomicBool,
    /// Handle to the background reader task.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl WsChannel {
    /// Open a channel to `room` as `user`.
    ///
    /// Connects to `socket_url` (10s timeout), sends the `join` event, and
    /// spawns the reader task.
    ///
    /// # Errors
    ///
    /// - [`ChannelError::Timeout`] if the connection does not establish in time.
    /// - [`ChannelError::Io`] if the connection is refused or the join
    ///   handshake cannot be sent.
    pub async fn open(
        socket_url: &str,
        room: &RoomId,
        user: &UserId,
    ) -> Result<Self, ChannelError> {
        let (ws_stream, _response) =
            tokio::time::timeout(CONNECT_TIMEOUT, connect_async(socket_url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = socket_url, "channel connect timed out");
                    ChannelError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = socket_url, err = %e, "channel connect failed");
                    ChannelError::Io(std::io::Error::other(e))
                })?;

        let (mut ws_sender, ws_reader) = ws_stream.split();

        // Join handshake: the server registers this connection into the
        // room before any other traffic is accepted.
        let join = ClientEvent::Join {
            room_id: room.clone(),
            user_id: user.clone(),
        };
        let frame = codec::encode(&join)?;
        ws_sender
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send join event");
                ChannelError::Io(std::io::Error::other(e))
            })?;

        tracing::info!(room = %room, user = %user, "joined room channel");

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let open = Arc::new(AtomicBool::new(true));
        let reader_open = Arc::clone(&open);
        let reader_handle = tokio::spawn(reader_loop(ws_reader, tx, reader_open));

        Ok(Self {
            room_id: room.clone(),
            ws_sender: Arc::new(Mutex::new(ws_sender)),
            incoming: Mutex::new(rx),
            open,
            closed: AtomicBool::new(false),
            reader_handle,
        })
    }

    /// The room this channel is joined to.
    #[must_use]
    pub const fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

impl RoomChannel for WsChannel {
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }

        let frame = codec::encode(&event)?;
        let mut sender = self.ws_sender.lock().await;
        sender
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "channel send failed");
                self.open.store(false, Ordering::Relaxed);
                ChannelError::Closed
            })?;

        Ok(())
    }

    async fn recv(&self) -> Result<ServerEvent, ChannelError> {
        let mut rx = self.incoming.lock().await;
        rx.recv().await.ok_or(ChannelError::Closed)
    }

    fn try_recv(&self) -> Option<ServerEvent> {
        self.incoming
            .try_lock()
            .ok()
            .and_then(|mut rx| rx.try_recv().ok())
    }

    /// Release the channel. The first call wins; later calls (including the
    /// one from `Drop`) are no-ops.
    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.open.store(false, Ordering::SeqCst);
        self.reader_handle.abort();

        // Best-effort close frame so the server drops the room membership
        // promptly instead of waiting for a TCP timeout.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let sender = Arc::clone(&self.ws_sender);
            handle.spawn(async move {
                let mut ws = sender.lock().await;
                let _ = ws.send(Message::Close(None)).await;
            });
        }
        tracing::info!(room = %self.room_id, "room channel closed");
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Background task that decodes inbound WebSocket frames.
///
/// Malformed frames are logged and skipped — the task does not disconnect
/// on bad data. Sets `open` to `false` when the WebSocket closes or errors.
async fn reader_loop(
    mut ws_reader: WsReader,
    tx: mpsc::Sender<ServerEvent>,
    open: Arc<AtomicBool>,
) {
    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match codec::decode::<ServerEvent>(&text) {
                Ok(event) => {
                    if tx.send(event).await.is_err() {
                        // Receiver dropped — channel was dropped, exit.
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed channel frame, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("channel closed by server");
                break;
            }
            Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                // The protocol is text-only; ignore everything else.
            }
            Err(e) => {
                tracing::warn!(err = %e, "channel read error");
                break;
            }
        }
    }
    open.store(false, Ordering::Relaxed);
    tracing::debug!("channel reader task exiting");
}
