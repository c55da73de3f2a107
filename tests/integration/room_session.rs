//! Room session lifecycle over an in-process server.
//!
//! Verifies:
//! 1. Entry seeds pre-existing history; exit clears the session and closes
//!    the channel.
//! 2. Switching rooms tears the old visit down before the new one opens.
//! 3. A failed history fetch leaves the session unseeded with a notice.
//! 4. Re-entry replaces the room wholesale, with accumulated history.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use roomchat::api::HttpRoomApi;
use roomchat::channel::ws::WsConnector;
use roomchat::session::{SessionConfig, SessionController, SessionError, SessionEvent, ViewState};
use roomchat_proto::user::User;
use roomchat_server::server::{ServerState, start_server_with_state};

type Client = SessionController<HttpRoomApi, WsConnector>;

fn alice() -> User {
    User::new("u-alice", "alice", "alice@example.com")
}

fn bob() -> User {
    User::new("u-bob", "bob", "bob@example.com")
}

async fn start_server(rooms: &[&str]) -> (Arc<ServerState>, std::net::SocketAddr) {
    let state = Arc::new(ServerState::new());
    for room in rooms {
        state
            .rooms
            .create_room(room, vec![alice(), bob()])
            .await
            .unwrap();
    }
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    (state, addr)
}

fn client(addr: std::net::SocketAddr, user: User) -> (Client, mpsc::Receiver<SessionEvent>) {
    SessionController::new(
        HttpRoomApi::new(format!("http://{addr}")),
        WsConnector::new(format!("ws://{addr}/ws")),
        user,
        SessionConfig::default(),
    )
}

async fn wait_for_view(client: &Client, predicate: impl Fn(&ViewState) -> bool) -> ViewState {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        client.try_pump().await;
        let view = client.view().await;
        if predicate(&view) {
            return view;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for view condition"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn entry_seeds_preexisting_history() {
    let (state, addr) = start_server(&["general"]).await;
    let room = state.rooms.list().await.remove(0);
    for i in 0..3 {
        state
            .rooms
            .append_message(&room.id, format!("old {i}"), bob())
            .await
            .unwrap();
    }

    let (client, _events) = client(addr, alice());
    client.enter_room("general").await.unwrap();

    let view = client.view().await;
    assert_eq!(view.messages.len(), 3);
    assert_eq!(view.messages[0].content, "old 0");
    assert_eq!(view.messages[2].content, "old 2");
}

#[tokio::test]
async fn exit_clears_session_and_navigates_back() {
    let (_state, addr) = start_server(&["general"]).await;
    let (client, mut events) = client(addr, alice());

    client.enter_room("general").await.unwrap();
    let _ = events.try_recv();

    client.leave_room().await;

    let view = client.view().await;
    assert!(view.room.is_none());
    assert!(view.messages.is_empty());
    assert!(!view.connected);
    assert_eq!(events.try_recv(), Ok(SessionEvent::RoomLeft));
}

#[tokio::test]
async fn switching_rooms_replaces_the_session_wholesale() {
    let (state, addr) = start_server(&["general", "random"]).await;
    let rooms = state.rooms.list().await;
    let general = rooms.iter().find(|r| r.name == "general").unwrap();
    state
        .rooms
        .append_message(&general.id, "only in general".to_string(), bob())
        .await
        .unwrap();

    let (client, _events) = client(addr, alice());
    client.enter_room("general").await.unwrap();
    assert_eq!(client.view().await.messages.len(), 1);

    client.enter_room("random").await.unwrap();

    let view = client.view().await;
    assert_eq!(view.room.as_ref().map(|r| r.name.as_str()), Some("random"));
    assert!(view.messages.is_empty());

    // The new visit is live: traffic in "random" arrives.
    client.send_message("fresh room").await.unwrap();
    let view = wait_for_view(&client, |view| !view.messages.is_empty()).await;
    assert_eq!(view.messages[0].content, "fresh room");
}

#[tokio::test]
async fn unknown_room_leaves_session_unseeded_with_notice() {
    let (_state, addr) = start_server(&["general"]).await;
    let (client, mut events) = client(addr, alice());

    let result = client.enter_room("does-not-exist").await;
    assert!(matches!(result, Err(SessionError::Api(_))));
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Notice(_))));

    let view = client.view().await;
    assert!(view.room.is_none());
    assert!(view.messages.is_empty());
}

#[tokio::test]
async fn failed_entry_keeps_the_previous_room() {
    let (_state, addr) = start_server(&["general"]).await;
    let (client, _events) = client(addr, alice());

    client.enter_room("general").await.unwrap();
    let result = client.enter_room("does-not-exist").await;
    assert!(result.is_err());

    // The failed fetch never touched the active session.
    let view = client.view().await;
    assert_eq!(view.room.as_ref().map(|r| r.name.as_str()), Some("general"));
    assert!(view.connected);
}

#[tokio::test]
async fn reentry_picks_up_accumulated_history() {
    let (_state, addr) = start_server(&["general"]).await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    alice_client.send_message("first visit").await.unwrap();
    wait_for_view(&alice_client, |view| !view.messages.is_empty()).await;
    alice_client.leave_room().await;

    // Traffic continues while alice is away.
    bob_client.enter_room("general").await.unwrap();
    bob_client.send_message("while you were gone").await.unwrap();
    wait_for_view(&bob_client, |view| view.messages.len() == 2).await;

    // Re-entry fetches the full history, including the missed message.
    alice_client.enter_room("general").await.unwrap();
    let view = alice_client.view().await;
    let contents: Vec<&str> = view.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["first visit", "while you were gone"]);
}

#[tokio::test]
async fn send_after_exit_is_rejected() {
    let (_state, addr) = start_server(&["general"]).await;
    let (client, _events) = client(addr, alice());

    client.enter_room("general").await.unwrap();
    client.leave_room().await;

    let result = client.send_message("into the void").await;
    assert!(matches!(result, Err(SessionError::NotInRoom)));
}
