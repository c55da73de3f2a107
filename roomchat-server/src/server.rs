//! Server core: HTTP routes, WebSocket handling, and room fan-out.
//!
//! Exposes the two collaborator surfaces the client expects:
//! - `GET /chat-rooms` and `GET /chat-rooms/{name}` for metadata/history,
//! - `GET /ws` for the room channel.
//!
//! A WebSocket connection's lifecycle:
//! 1. Wait for the `join` event.
//! 2. Register the connection into the room's fan-out set.
//! 3. Route inbound events: messages are assigned authoritative ids and
//!    echoed to every member (the sender included); typing updates
//!    broadcast the room's authoritative snapshot.
//! 4. On disconnect, unregister and drop the user from the typing set.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Json;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{RwLock, mpsc};

use roomchat_proto::codec;
use roomchat_proto::event::{ClientEvent, ServerEvent};
use roomchat_proto::room::{Room, RoomHistory, RoomId};
use roomchat_proto::user::UserId;

use crate::rooms::RoomDirectory;

/// A registered WebSocket connection.
struct Connection {
    room_id: RoomId,
    user_id: UserId,
    sender: mpsc::UnboundedSender<Message>,
}

/// Shared server state: the room directory plus live connections.
#[derive(Default)]
pub struct ServerState {
    /// Rooms, histories, and typing sets.
    pub rooms: RoomDirectory,
    /// Live connections keyed by connection id.
    connections: RwLock<HashMap<u64, Connection>>,
    /// Connection id source.
    next_conn_id: AtomicU64,
}

impl ServerState {
    /// Creates state with an empty room directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning its id.
    async fn register(
        &self,
        room_id: RoomId,
        user_id: UserId,
        sender: mpsc::UnboundedSender<Message>,
    ) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.write().await;
        connections.insert(
            conn_id,
            Connection {
                room_id,
                user_id,
                sender,
            },
        );
        conn_id
    }

    /// Remove a connection, returning its room and user if it existed.
    async fn unregister(&self, conn_id: u64) -> Option<(RoomId, UserId)> {
        let mut connections = self.connections.write().await;
        connections
            .remove(&conn_id)
            .map(|conn| (conn.room_id, conn.user_id))
    }

    /// Send an event to every member of a room, the sender included.
    async fn broadcast(&self, room_id: &RoomId, event: &ServerEvent) {
        let frame = match codec::encode(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(err = %e, "failed to encode broadcast event");
                return;
            }
        };
        let connections = self.connections.read().await;
        for conn in connections.values() {
            if conn.room_id == *room_id {
                let _ = conn.sender.send(Message::Text(frame.clone().into()));
            }
        }
    }
}

/// Build the axum router over shared state.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    axum::Router::new()
        .route("/chat-rooms", get(list_rooms))
        .route("/chat-rooms/{name}", get(get_room))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Start the server on `addr` (use port 0 for an OS-assigned port).
///
/// Returns the bound address and the serve task's join handle.
///
/// # Errors
///
/// Returns an I/O error when the listener cannot bind.
pub async fn start_server(
    addr: &str,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Start the server with externally prepared state (tests seed rooms
/// through it).
///
/// # Errors
///
/// Returns an I/O error when the listener cannot bind.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;
    let app = router(state);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(err = %e, "server task failed");
        }
    });

    Ok((bound_addr, handle))
}

/// `GET /chat-rooms`
async fn list_rooms(State(state): State<Arc<ServerState>>) -> Json<Vec<Room>> {
    Json(state.rooms.list().await)
}

/// `GET /chat-rooms/{name}`
async fn get_room(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Result<Json<RoomHistory>, StatusCode> {
    state
        .rooms
        .history(&name)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `GET /ws` — upgrade to the room channel protocol.
async fn ws_upgrade(
    State(state): State<Arc<ServerState>>,
    upgrade: WebSocketUpgrade,
) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection through its lifecycle.
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Step 1: the first frame must be the join handshake.
    let Some((room_id, user_id)) = wait_for_join(&mut ws_receiver).await else {
        tracing::warn!("connection closed before join");
        return;
    };
    if !state.rooms.contains_id(&room_id).await {
        tracing::warn!(room = %room_id, "join for unknown room, closing");
        let _ = ws_sender.send(Message::Close(None)).await;
        return;
    }

    tracing::info!(room = %room_id, user = %user_id, "user joined room");

    // Step 2: register for fan-out.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = state.register(room_id.clone(), user_id.clone(), tx).await;

    // Writer task: forward queued broadcasts to the socket.
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Reader task: route inbound events.
    let reader_state = Arc::clone(&state);
    let reader_room = room_id.clone();
    let reader_user = user_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_event(&reader_state, &reader_room, &reader_user, &text).await;
                }
                Message::Close(_) => break,
                _ => {
                    // Ignore binary, ping, pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    // Step 4: clean up — unregister and clear any typing state.
    if let Some((room_id, user_id)) = state.unregister(conn_id).await {
        let name = state.rooms.display_name(&room_id, &user_id).await;
        if let Some(snapshot) = state.rooms.set_typing(&room_id, &name, false).await {
            state
                .broadcast(
                    &room_id,
                    &ServerEvent::Typing {
                        typing_users: snapshot,
                    },
                )
                .await;
        }
        tracing::info!(room = %room_id, user = %user_id, "user left room");
    }
}

/// Wait for the first frame, expecting a `join` event.
async fn wait_for_join(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<(RoomId, UserId)> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match codec::decode::<ClientEvent>(&text) {
                Ok(ClientEvent::Join { room_id, user_id }) => return Some((room_id, user_id)),
                Ok(other) => {
                    tracing::warn!(event = ?other, "expected join, got different event");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(err = %e, "failed to decode join event");
                    return None;
                }
            },
            Message::Close(_) => return None,
            _ => {
                // Skip non-text frames during the handshake.
            }
        }
    }
    None
}

/// Route one decoded client event.
async fn handle_client_event(
    state: &Arc<ServerState>,
    room_id: &RoomId,
    user_id: &UserId,
    text: &str,
) {
    let event = match codec::decode::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(user = %user_id, err = %e, "malformed frame, skipping");
            return;
        }
    };

    match event {
        ClientEvent::Message {
            content,
            sender,
            chatroom,
        } => {
            // The connection's joined room wins over the frame's claim.
            if chatroom != *room_id {
                tracing::warn!(
                    user = %user_id,
                    claimed = %chatroom,
                    joined = %room_id,
                    "message for a different room, dropping"
                );
                return;
            }
            let Some(message) = state
                .rooms
                .append_message(room_id, content, sender)
                .await
            else {
                return;
            };
            tracing::debug!(room = %room_id, id = %message.id, "message stored, echoing");
            state
                .broadcast(room_id, &ServerEvent::Message(message))
                .await;
        }
        ClientEvent::StartTyping { room_id: claimed } | ClientEvent::StopTyping { room_id: claimed }
            if claimed != *room_id =>
        {
            tracing::warn!(user = %user_id, "typing signal for a different room, dropping");
        }
        ClientEvent::StartTyping { .. } => {
            typing_update(state, room_id, user_id, true).await;
        }
        ClientEvent::StopTyping { .. } => {
            typing_update(state, room_id, user_id, false).await;
        }
        ClientEvent::Join { .. } => {
            tracing::warn!(user = %user_id, "duplicate join ignored");
        }
    }
}

/// Apply a typing transition and broadcast the new snapshot if it changed.
async fn typing_update(state: &Arc<ServerState>, room_id: &RoomId, user_id: &UserId, on: bool) {
    let name = state.rooms.display_name(room_id, user_id).await;
    if let Some(snapshot) = state.rooms.set_typing(room_id, &name, on).await {
        state
            .broadcast(
                room_id,
                &ServerEvent::Typing {
                    typing_users: snapshot,
                },
            )
            .await;
    }
}
