//! Chat message types.
//!
//! A [`Message`] is immutable once created. Its identifier is a UUID v7 so
//! ids generated on one node are time-ordered, but display order is always
//! the order of arrival — consumers must never re-sort by timestamp.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::RoomId;
use crate::user::User;

/// Maximum allowed message content size in bytes (16 KB).
pub const MAX_CONTENT_SIZE: usize = 16 * 1024;

/// Unique identifier for a message, based on UUID v7.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new time-ordered message identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `MessageId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Errors produced by [`Message::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Message content is empty or whitespace-only.
    #[error("message content cannot be empty")]
    Empty,

    /// Message content exceeds [`MAX_CONTENT_SIZE`].
    #[error("message content too large: {size} bytes (max {MAX_CONTENT_SIZE} bytes)")]
    TooLarge {
        /// Actual size in bytes.
        size: usize,
    },
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier for this message.
    pub id: MessageId,
    /// Who composed the message.
    pub author: User,
    /// Plain-text content.
    pub content: String,
    /// The room this message belongs to.
    pub room_id: RoomId,
    /// When the message was created (server-assigned for authoritative copies).
    pub created_at: Timestamp,
}

impl Message {
    /// Validate the message content.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the content is empty (after trimming)
    /// or exceeds [`MAX_CONTENT_SIZE`] bytes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::Empty);
        }
        if self.content.len() > MAX_CONTENT_SIZE {
            return Err(ValidationError::TooLarge {
                size: self.content.len(),
            });
        }
        Ok(())
    }
}
