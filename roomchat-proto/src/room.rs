//! Room types and the history-fetch response shape.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::user::User;

/// Unique identifier for a chat room.
///
/// Rooms are addressed by name in the HTTP API, so this wraps the opaque
/// identifier the backend reports rather than deriving one locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new room identifier from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this room ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat room with its participant set.
///
/// Immutable once loaded for a visit — re-entering a room replaces the
/// whole value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Unique room identifier.
    pub id: RoomId,
    /// Human-readable room name (also the HTTP lookup key).
    pub name: String,
    /// Users who belong to this room.
    pub participants: Vec<User>,
}

/// Response body of `GET /chat-rooms/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomHistory {
    /// The room's metadata.
    pub chat_room: Room,
    /// Message history in server order, oldest first.
    pub messages: Vec<Message>,
}
