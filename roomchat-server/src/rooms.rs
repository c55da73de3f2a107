//! Room directory: rooms, their histories, and typing sets.
//!
//! Pure data layer behind the server. Connection bookkeeping and fan-out
//! live in [`crate::server`]; this module only answers questions about
//! rooms and records what happened in them.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;
use uuid::Uuid;

use roomchat_proto::message::{Message, MessageId, Timestamp};
use roomchat_proto::room::{Room, RoomHistory, RoomId};
use roomchat_proto::user::{User, UserId};

/// Errors that can occur during room directory operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// A room with the same name already exists.
    #[error("a room named '{0}' already exists")]
    DuplicateName(String),
}

/// One room's record: metadata, message log, and who is typing.
struct RoomEntry {
    room: Room,
    messages: Vec<Message>,
    /// Display names of currently-typing users. A `BTreeSet` keeps
    /// snapshot order deterministic.
    typing: BTreeSet<String>,
}

/// Registry of rooms, keyed by room name (the HTTP lookup key).
#[derive(Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<String, RoomEntry>>,
}

impl RoomDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room with the given name and participant set.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::DuplicateName`] if a room with the same name
    /// already exists.
    pub async fn create_room(
        &self,
        name: &str,
        participants: Vec<User>,
    ) -> Result<Room, RoomError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(name) {
            return Err(RoomError::DuplicateName(name.to_string()));
        }

        let room = Room {
            id: RoomId::new(Uuid::now_v7().to_string()),
            name: name.to_string(),
            participants,
        };
        rooms.insert(
            name.to_string(),
            RoomEntry {
                room: room.clone(),
                messages: Vec::new(),
                typing: BTreeSet::new(),
            },
        );
        tracing::info!(room = name, id = %room.id, "room created");
        Ok(room)
    }

    /// All rooms, for `GET /chat-rooms`.
    pub async fn list(&self) -> Vec<Room> {
        let rooms = self.rooms.read().await;
        let mut list: Vec<Room> = rooms.values().map(|entry| entry.room.clone()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// One room's metadata and history, for `GET /chat-rooms/{name}`.
    pub async fn history(&self, name: &str) -> Option<RoomHistory> {
        let rooms = self.rooms.read().await;
        rooms.get(name).map(|entry| RoomHistory {
            chat_room: entry.room.clone(),
            messages: entry.messages.clone(),
        })
    }

    /// Whether a room with this id exists.
    pub async fn contains_id(&self, room_id: &RoomId) -> bool {
        let rooms = self.rooms.read().await;
        rooms.values().any(|entry| entry.room.id == *room_id)
    }

    /// Record a composed message: assign the authoritative id and
    /// timestamp, append to the room log, and return the stored copy.
    ///
    /// Returns `None` when the room does not exist.
    pub async fn append_message(
        &self,
        room_id: &RoomId,
        content: String,
        sender: User,
    ) -> Option<Message> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.values_mut().find(|entry| entry.room.id == *room_id)?;
        let message = Message {
            id: MessageId::new(),
            author: sender,
            content,
            room_id: room_id.clone(),
            created_at: Timestamp::now(),
        };
        entry.messages.push(message.clone());
        Some(message)
    }

    /// Update a user's typing membership and return the room's new
    /// authoritative snapshot (sorted display names).
    ///
    /// Returns `None` when the room does not exist or the snapshot did not
    /// change.
    pub async fn set_typing(
        &self,
        room_id: &RoomId,
        display_name: &str,
        is_typing: bool,
    ) -> Option<Vec<String>> {
        let mut rooms = self.rooms.write().await;
        let entry = rooms.values_mut().find(|entry| entry.room.id == *room_id)?;
        let changed = if is_typing {
            entry.typing.insert(display_name.to_string())
        } else {
            entry.typing.remove(display_name)
        };
        changed.then(|| entry.typing.iter().cloned().collect())
    }

    /// Resolve a user's display name within a room.
    ///
    /// Checks the participant set first, then message authors (a user who
    /// has spoken resolves even if the participant list is stale), and
    /// falls back to the raw identifier.
    pub async fn display_name(&self, room_id: &RoomId, user_id: &UserId) -> String {
        let rooms = self.rooms.read().await;
        let Some(entry) = rooms.values().find(|entry| entry.room.id == *room_id) else {
            return user_id.as_str().to_string();
        };
        entry
            .room
            .participants
            .iter()
            .find(|user| user.id == *user_id)
            .or_else(|| {
                entry
                    .messages
                    .iter()
                    .rev()
                    .map(|message| &message.author)
                    .find(|author| author.id == *user_id)
            })
            .map_or_else(|| user_id.as_str().to_string(), |user| user.name.clone())
    }
}
