//! HTTP collaborator: room metadata and message history.
//!
//! The chat backend is reached through the [`RoomApi`] trait so the session
//! controller can be driven by a stub in tests. [`HttpRoomApi`] is the real
//! implementation. All responses funnel through one interception point
//! where auth failures (HTTP 401) clear the persisted identity wholesale
//! before surfacing [`ApiError::Unauthorized`].

use serde::de::DeserializeOwned;

use roomchat_proto::room::{Room, RoomHistory};

use crate::identity::IdentityStore;

/// Errors that can occur when talking to the chat backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The session is no longer valid (HTTP 401). The persisted identity
    /// has already been cleared by the time this surfaces.
    #[error("session expired")]
    Unauthorized,

    /// The requested room does not exist (HTTP 404).
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Any other non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// Connection, DNS, or body-decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Read access to room metadata and history.
pub trait RoomApi: Send + Sync {
    /// Fetch the list of available rooms.
    fn list_rooms(&self) -> impl std::future::Future<Output = Result<Vec<Room>, ApiError>> + Send;

    /// Fetch one room's metadata and full message history by name.
    fn fetch_room(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<RoomHistory, ApiError>> + Send;
}

/// `reqwest`-backed implementation of [`RoomApi`].
pub struct HttpRoomApi {
    client: reqwest::Client,
    base_url: String,
    identity: Option<IdentityStore>,
}

impl HttpRoomApi {
    /// Create a client against the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            identity: None,
        }
    }

    /// Attach the identity store that a 401 response wipes.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityStore) -> Self {
        self.identity = Some(identity);
        self
    }

    /// The base URL requests are issued against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared response interception point: every request goes through here
    /// so the 401 handling cannot be forgotten on a new endpoint.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "session rejected, clearing stored identity");
            if let Some(identity) = &self.identity {
                if let Err(e) = identity.clear() {
                    tracing::warn!(err = %e, "failed to clear stored identity");
                }
            }
            return Err(ApiError::Unauthorized);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::RoomNotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

impl RoomApi for HttpRoomApi {
    async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        self.get_json("/chat-rooms").await
    }

    async fn fetch_room(&self, name: &str) -> Result<RoomHistory, ApiError> {
        match self.get_json(&format!("/chat-rooms/{name}")).await {
            Err(ApiError::RoomNotFound(_)) => Err(ApiError::RoomNotFound(name.to_string())),
            other => other,
        }
    }
}
