//! Loopback channel for testing.
//!
//! Uses in-process [`tokio::sync::mpsc`] channels to simulate a room
//! channel without a network. [`LoopbackChannel::create_pair`] returns the
//! client-side channel and a [`LoopbackHandle`] playing the server role:
//! the handle injects inbound [`ServerEvent`]s and observes outbound
//! [`ClientEvent`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};

use roomchat_proto::event::{ClientEvent, ServerEvent};
use roomchat_proto::room::RoomId;
use roomchat_proto::user::UserId;

use super::{ChannelError, Connector, RoomChannel};

/// In-process implementation of [`RoomChannel`] backed by mpsc queues.
pub struct LoopbackChannel {
    /// Sender for outbound events (delivers to the handle).
    tx: mpsc::Sender<ClientEvent>,
    /// Receiver for inbound events (fed by the handle).
    rx: Mutex<mpsc::Receiver<ServerEvent>>,
    /// Shared open flag; the handle observes it to detect close.
    open: Arc<AtomicBool>,
    /// Set exactly once by `close` (directly or via `Drop`).
    closed: AtomicBool,
}

/// Server-side endpoint of a loopback pair.
pub struct LoopbackHandle {
    /// Injects inbound events into the channel.
    tx: mpsc::Sender<ServerEvent>,
    /// Observes the channel's outbound events.
    rx: Mutex<mpsc::Receiver<ClientEvent>>,
    /// Shared open flag set to `false` when the channel closes.
    open: Arc<AtomicBool>,
}

impl LoopbackChannel {
    /// Create a connected channel/handle pair with the given queue capacity.
    #[must_use]
    pub fn create_pair(buffer: usize) -> (Self, LoopbackHandle) {
        let (client_tx, client_rx) = mpsc::channel(buffer);
        let (server_tx, server_rx) = mpsc::channel(buffer);
        let open = Arc::new(AtomicBool::new(true));

        let channel = Self {
            tx: client_tx,
            rx: Mutex::new(server_rx),
            open: Arc::clone(&open),
            closed: AtomicBool::new(false),
        };
        let handle = LoopbackHandle {
            tx: server_tx,
            rx: Mutex::new(client_rx),
            open,
        };
        (channel, handle)
    }
}

impl RoomChannel for LoopbackChannel {
    async fn send(&self, event: ClientEvent) -> Result<(), ChannelError> {
        if !self.open.load(Ordering::Relaxed) {
            return Err(ChannelError::Closed);
        }
        self.tx.send(event).await.map_err(|_| ChannelError::Closed)
    }

    async fn recv(&self) -> Result<ServerEvent, ChannelError> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(ChannelError::Closed)
    }

    fn try_recv(&self) -> Option<ServerEvent> {
        self.rx
            .try_lock()
            .ok()
            .and_then(|mut rx| rx.try_recv().ok())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed) && !self.tx.is_closed()
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl LoopbackHandle {
    /// Inject an inbound event, as if the server had pushed it.
    pub async fn emit(&self, event: ServerEvent) {
        let _ = self.tx.send(event).await;
    }

    /// Wait for the next outbound event from the channel.
    pub async fn next_outbound(&self) -> Option<ClientEvent> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Take the next outbound event if one is already queued.
    pub fn try_next_outbound(&self) -> Option<ClientEvent> {
        self.rx
            .try_lock()
            .ok()
            .and_then(|mut rx| rx.try_recv().ok())
    }

    /// Whether the paired channel is still open.
    #[must_use]
    pub fn channel_open(&self) -> bool {
        self.open.load(Ordering::Relaxed)
    }
}

/// Connector producing loopback channels for tests.
///
/// Each [`Connector::open`] call creates a fresh pair, emits the join
/// handshake into the outbound queue, and parks the [`LoopbackHandle`] for
/// the test to collect via [`LoopbackConnector::take_handle`].
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    handles: Arc<std::sync::Mutex<Vec<LoopbackHandle>>>,
}

impl LoopbackConnector {
    /// Create a connector with no pending handles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the handle for the most recently opened channel.
    #[must_use]
    pub fn take_handle(&self) -> Option<LoopbackHandle> {
        self.handles
            .lock()
            .ok()
            .and_then(|mut handles| handles.pop())
    }
}

impl Connector for LoopbackConnector {
    type Channel = LoopbackChannel;

    async fn open(&self, room: &RoomId, user: &UserId) -> Result<LoopbackChannel, ChannelError> {
        let (channel, handle) = LoopbackChannel::create_pair(64);
        channel
            .send(ClientEvent::Join {
                room_id: room.clone(),
                user_id: user.clone(),
            })
            .await?;
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(handle);
        }
        Ok(channel)
    }
}
