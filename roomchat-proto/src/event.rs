//! Channel event types for the real-time room protocol.
//!
//! Events travel as JSON text frames tagged by an `event` field with the
//! payload under `data`. Client-to-server and server-to-client directions
//! have distinct enums — the sets are not symmetric.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::room::RoomId;
use crate::user::{User, UserId};

/// Events sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Join handshake, sent once immediately after the channel opens.
    Join {
        /// The room being joined.
        room_id: RoomId,
        /// The joining user.
        user_id: UserId,
    },
    /// A composed message. The server assigns the authoritative id and
    /// timestamp and echoes the result back to every member.
    Message {
        /// Plain-text content.
        content: String,
        /// Who composed it.
        sender: User,
        /// Target room.
        chatroom: RoomId,
    },
    /// The local user started composing.
    StartTyping {
        /// The room the signal is scoped to.
        room_id: RoomId,
    },
    /// The local user stopped composing.
    StopTyping {
        /// The room the signal is scoped to.
        room_id: RoomId,
    },
}

/// Events sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// An authoritative message, including the echo of self-sent messages.
    Message(Message),
    /// Authoritative snapshot of who is currently typing in the room.
    /// Replaces (never merges with) the previous snapshot.
    Typing {
        /// Display names of currently-typing users, possibly including
        /// the receiver's own.
        typing_users: Vec<String>,
    },
}
