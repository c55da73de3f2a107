//! Transport channel layer for `RoomChat`.
//!
//! Defines the [`RoomChannel`] trait that all channel implementations must
//! satisfy, and the [`Connector`] that opens one. Concrete implementations:
//! - [`ws::WsChannel`] — WebSocket channel to the chat backend
//! - [`loopback::LoopbackChannel`] — in-process channel for testing
//!
//! A channel is scoped to a single room visit: it is opened on room entry
//! (performing the join handshake) and closed on room exit. There is no
//! reconnect path; re-entering the room opens a fresh channel.

pub mod loopback;
pub mod ws;

use roomchat_proto::codec::CodecError;
use roomchat_proto::event::{ClientEvent, ServerEvent};
use roomchat_proto::room::RoomId;
use roomchat_proto::user::UserId;

/// Errors that can occur during channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel has been closed (locally or by the server).
    #[error("channel closed")]
    Closed,

    /// The operation timed out before completing.
    #[error("channel operation timed out")]
    Timeout,

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// An underlying I/O error occurred.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bidirectional real-time channel to a single chat room.
///
/// # Invariant
///
/// Exactly one close occurs per open. [`RoomChannel::close`] is idempotent
/// and implementations also close from `Drop`, so abrupt teardown of the
/// owning session cannot leak a live channel on the server.
pub trait RoomChannel: Send + Sync {
    /// Send a structured event to the server.
    ///
    /// Returns `Ok(())` when the event has been handed off to the
    /// underlying transport.
    fn send(
        &self,
        event: ClientEvent,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Receive the next inbound event, waiting until one arrives.
    ///
    /// Events are delivered in transport order, which is the server's send
    /// order for the room.
    fn recv(&self) -> impl std::future::Future<Output = Result<ServerEvent, ChannelError>> + Send;

    /// Take the next inbound event if one is already queued.
    fn try_recv(&self) -> Option<ServerEvent>;

    /// Release the channel unconditionally. Idempotent.
    fn close(&self);

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;
}

/// Opens a [`RoomChannel`] for a room visit.
///
/// Opening performs the join handshake: the `join` event carrying the room
/// and user identifiers is emitted before the channel is handed back.
pub trait Connector: Send + Sync {
    /// The channel type this connector produces.
    type Channel: RoomChannel + 'static;

    /// Open a channel to the given room as the given user.
    fn open(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Self::Channel, ChannelError>> + Send;
}
