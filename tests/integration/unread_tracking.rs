//! Viewport gating through the session controller: auto-scroll while the
//! reader is at the bottom, unread affordance while scrolled away.
//!
//! Uses the loopback channel so inbound events can be injected without
//! network timing.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use roomchat::api::{ApiError, RoomApi};
use roomchat::channel::loopback::{LoopbackConnector, LoopbackHandle};
use roomchat::session::{SessionConfig, SessionController, SessionEvent};
use roomchat_proto::event::ServerEvent;
use roomchat_proto::message::{Message, MessageId, Timestamp};
use roomchat_proto::room::{Room, RoomHistory, RoomId};
use roomchat_proto::user::User;
use tokio::sync::mpsc;

type Client = SessionController<FixtureApi, LoopbackConnector>;

/// Fixed-content `RoomApi` for viewport scenarios.
struct FixtureApi {
    rooms: HashMap<String, RoomHistory>,
}

impl RoomApi for FixtureApi {
    async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        Ok(self.rooms.values().map(|h| h.chat_room.clone()).collect())
    }

    async fn fetch_room(&self, name: &str) -> Result<RoomHistory, ApiError> {
        self.rooms
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::RoomNotFound(name.to_string()))
    }
}

fn local_user() -> User {
    User::new("u-me", "me", "me@example.com")
}

fn remote_user() -> User {
    User::new("u-peer", "peer", "peer@example.com")
}

fn message(id: u128, author: User, content: &str) -> Message {
    Message {
        id: MessageId::from_uuid(uuid::Uuid::from_u128(id)),
        author,
        content: content.to_string(),
        room_id: RoomId::new("general"),
        created_at: Timestamp::from_millis(0),
    }
}

/// Controller in a 30-message room, mounted on a 10-row viewport, settled
/// at the bottom.
async fn settled_client() -> (Client, LoopbackHandle, mpsc::Receiver<SessionEvent>) {
    let history: Vec<Message> = (1..=30)
        .map(|i| message(i, remote_user(), &format!("line {i}")))
        .collect();
    let api = FixtureApi {
        rooms: HashMap::from([(
            "general".to_string(),
            RoomHistory {
                chat_room: Room {
                    id: RoomId::new("general"),
                    name: "general".to_string(),
                    participants: vec![local_user(), remote_user()],
                },
                messages: history,
            },
        )]),
    };
    let connector = LoopbackConnector::new();
    let (client, events) = SessionController::new(
        api,
        connector.clone(),
        local_user(),
        SessionConfig::default(),
    );

    client.mount_viewport(10).await;
    client.enter_room("general").await.unwrap();
    // Fire the post-entry settle scroll.
    client.tick(Instant::now() + Duration::from_millis(200)).await;

    let handle = connector.take_handle().unwrap();
    let _join = handle.next_outbound().await;
    (client, handle, events)
}

#[tokio::test]
async fn settle_scroll_lands_at_the_bottom() {
    let (client, _handle, _events) = settled_client().await;
    let view = client.view().await;
    assert_eq!(view.scroll_offset, 20);
    assert!(!view.unread);
}

#[tokio::test]
async fn new_content_at_bottom_follows() {
    let (client, handle, _events) = settled_client().await;

    handle
        .emit(ServerEvent::Message(message(100, remote_user(), "new")))
        .await;
    client.try_pump().await;

    let view = client.view().await;
    assert_eq!(view.messages.len(), 31);
    assert_eq!(view.scroll_offset, 21);
    assert!(!view.unread);
}

#[tokio::test]
async fn new_content_while_scrolled_up_raises_unread() {
    let (client, handle, _events) = settled_client().await;
    client.scroll_by(-15).await;
    let offset_before = client.view().await.scroll_offset;

    handle
        .emit(ServerEvent::Message(message(100, remote_user(), "below")))
        .await;
    client.try_pump().await;

    let view = client.view().await;
    assert!(view.unread);
    assert_eq!(view.scroll_offset, offset_before);
}

#[tokio::test]
async fn activating_the_affordance_jumps_and_clears() {
    let (client, handle, _events) = settled_client().await;
    client.scroll_by(-15).await;
    handle
        .emit(ServerEvent::Message(message(100, remote_user(), "below")))
        .await;
    client.try_pump().await;
    assert!(client.view().await.unread);

    client.jump_to_latest().await;

    let view = client.view().await;
    assert!(!view.unread);
    assert_eq!(view.scroll_offset, 21);
}

#[tokio::test]
async fn scrolling_back_to_the_bottom_clears_unread() {
    let (client, handle, _events) = settled_client().await;
    client.scroll_by(-15).await;
    handle
        .emit(ServerEvent::Message(message(100, remote_user(), "below")))
        .await;
    client.try_pump().await;
    assert!(client.view().await.unread);

    // Scroll down past the end: lands exactly at the bottom edge.
    client.scroll_by(100).await;

    let view = client.view().await;
    assert!(!view.unread);
    assert_eq!(view.scroll_offset, 21);
}

#[tokio::test]
async fn own_echo_forces_the_scroll() {
    let (client, handle, _events) = settled_client().await;
    client.scroll_by(-15).await;

    handle
        .emit(ServerEvent::Message(message(100, local_user(), "mine")))
        .await;
    client.try_pump().await;

    let view = client.view().await;
    assert!(!view.unread);
    assert_eq!(view.scroll_offset, 21);
}

#[tokio::test]
async fn sending_snaps_to_the_bottom_before_the_echo() {
    let (client, _handle, _events) = settled_client().await;
    client.scroll_by(-15).await;

    client.send_message("outbound").await.unwrap();

    let view = client.view().await;
    assert_eq!(view.scroll_offset, 20);
    assert!(!view.unread);
}

#[tokio::test]
async fn unread_resets_on_room_exit() {
    let (client, handle, _events) = settled_client().await;
    client.scroll_by(-15).await;
    handle
        .emit(ServerEvent::Message(message(100, remote_user(), "below")))
        .await;
    client.try_pump().await;
    assert!(client.view().await.unread);

    client.leave_room().await;
    assert!(!client.view().await.unread);
}
