//! User identity types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a user, as issued by the backing store.
///
/// Opaque string — the client never parses it, only compares and
/// forwards it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new user identifier from a string representation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the string representation of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat participant's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backing-store identifier.
    pub id: UserId,
    /// Display name shown next to messages and typing indicators.
    pub name: String,
    /// Account email.
    pub email: String,
}

impl User {
    /// Convenience constructor used widely in tests and fixtures.
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            email: email.into(),
        }
    }
}
