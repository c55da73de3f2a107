//! Ordered, deduplicated message sequence for the active room.
//!
//! The store is the single place where local echo, history fetch, and
//! inbound events merge. Ordering is strictly insertion order — messages
//! are never re-sorted by timestamp, so the view stays monotonic even
//! under clock skew between participants.

use std::collections::HashSet;

use roomchat_proto::message::{Message, MessageId, Timestamp};
use roomchat_proto::room::RoomId;
use roomchat_proto::user::User;

/// Ordered, deduplicated sequence of messages for one room visit.
#[derive(Debug, Default)]
pub struct MessageStore {
    /// Messages in first-seen order.
    messages: Vec<Message>,
    /// Ids of every message currently in `messages`.
    seen: HashSet<MessageId>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the store's content wholesale with fetched history.
    ///
    /// Duplicate ids inside `history` keep only their first occurrence.
    pub fn seed(&mut self, history: Vec<Message>) {
        self.messages.clear();
        self.seen.clear();
        for message in history {
            self.append(message);
        }
    }

    /// Insert a message at the tail if its id has not been seen.
    ///
    /// Returns `true` if the message was inserted, `false` if it was a
    /// duplicate delivery (e.g. the echo of a message already applied).
    pub fn append(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id.clone()) {
            tracing::debug!(id = %message.id, "duplicate message dropped");
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Build the provisional outbound message for a locally composed text.
    ///
    /// The draft is NOT inserted into the store: the channel is the single
    /// source of truth, so the message becomes visible only when the
    /// server's authoritative copy arrives back through [`append`](Self::append).
    #[must_use]
    pub fn compose(content: &str, author: &User, room: &RoomId) -> Message {
        Message {
            id: MessageId::new(),
            author: author.clone(),
            content: content.to_string(),
            room_id: room.clone(),
            created_at: Timestamp::now(),
        }
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }

    /// Number of messages currently visible.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The messages in first-seen order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
