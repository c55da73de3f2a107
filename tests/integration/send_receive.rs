//! End-to-end send/receive over an in-process server.
//!
//! Verifies:
//! 1. Entering a room joins the channel and seeds history.
//! 2. A sent message becomes visible only via the server echo, exactly once.
//! 3. Delivery order is preserved across participants.
//! 4. Later visitors see earlier traffic in the fetched history.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use roomchat::api::HttpRoomApi;
use roomchat::channel::ws::WsConnector;
use roomchat::session::{SessionConfig, SessionController, SessionEvent, ViewState};
use roomchat_proto::user::User;
use roomchat_server::server::{ServerState, start_server_with_state};

type Client = SessionController<HttpRoomApi, WsConnector>;

/// Start a server seeded with one "general" room whose participants are
/// the given users. Returns the server state and its base address.
async fn start_seeded_server(participants: Vec<User>) -> (Arc<ServerState>, std::net::SocketAddr) {
    let state = Arc::new(ServerState::new());
    state
        .rooms
        .create_room("general", participants)
        .await
        .unwrap();
    let (addr, _handle) = start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .unwrap();
    (state, addr)
}

/// Build a session controller for `user` against the server at `addr`.
fn client(addr: std::net::SocketAddr, user: User) -> (Client, mpsc::Receiver<SessionEvent>) {
    SessionController::new(
        HttpRoomApi::new(format!("http://{addr}")),
        WsConnector::new(format!("ws://{addr}/ws")),
        user,
        SessionConfig::default(),
    )
}

fn alice() -> User {
    User::new("u-alice", "alice", "alice@example.com")
}

fn bob() -> User {
    User::new("u-bob", "bob", "bob@example.com")
}

/// Pump the controller until the predicate holds or five seconds pass.
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
async fn enter_room_connects_and_seeds_empty_history() {
    let (_state, addr) = start_seeded_server(vec![alice()]).await;
    let (client, mut events) = client(addr, alice());

    client.enter_room("general").await.unwrap();

    let view = client.view().await;
    assert_eq!(view.room.as_ref().map(|r| r.name.as_str()), Some("general"));
    assert!(view.messages.is_empty());
    assert!(view.connected);
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::RoomEntered { message_count: 0, .. })
    ));
}

#[tokio::test]
async fn sent_message_becomes_visible_via_echo_exactly_once() {
    let (_state, addr) = start_seeded_server(vec![alice()]).await;
    let (client, _events) = client(addr, alice());
    client.enter_room("general").await.unwrap();

    client.send_message("hi").await.unwrap();

    // Not visible at send time; visible once the echo lands.
    let view = wait_for_view(&client, |view| !view.messages.is_empty()).await;
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].content, "hi");
    assert_eq!(view.messages[0].author, alice());

    // No second copy ever shows up.
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.try_pump().await;
    assert_eq!(client.view().await.messages.len(), 1);
}

#[tokio::test]
async fn both_participants_see_the_same_order() {
    let (_state, addr) = start_seeded_server(vec![alice(), bob()]).await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    for i in 0..5 {
        alice_client
            .send_message(&format!("message {i}"))
            .await
            .unwrap();
        // Wait until the echo lands before sending the next, so the test
        // asserts order end to end rather than racing its own sends.
        wait_for_view(&alice_client, |view| view.messages.len() == i + 1).await;
    }

    let bob_view = wait_for_view(&bob_client, |view| view.messages.len() == 5).await;
    let contents: Vec<&str> = bob_view
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(
        contents,
        ["message 0", "message 1", "message 2", "message 3", "message 4"]
    );
}

#[tokio::test]
async fn later_visitor_receives_history() {
    let (_state, addr) = start_seeded_server(vec![alice(), bob()]).await;
    let (alice_client, _alice_events) = client(addr, alice());

    alice_client.enter_room("general").await.unwrap();
    alice_client.send_message("for the record").await.unwrap();
    wait_for_view(&alice_client, |view| !view.messages.is_empty()).await;

    // Bob enters after the fact and gets the message from history.
    let (bob_client, mut bob_events) = client(addr, bob());
    bob_client.enter_room("general").await.unwrap();

    let view = bob_client.view().await;
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].content, "for the record");
    assert!(matches!(
        bob_events.try_recv(),
        Ok(SessionEvent::RoomEntered { message_count: 1, .. })
    ));
}

#[tokio::test]
async fn cross_participant_delivery() {
    let (_state, addr) = start_seeded_server(vec![alice(), bob()]).await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    alice_client.send_message("hello bob").await.unwrap();
    let bob_view = wait_for_view(&bob_client, |view| !view.messages.is_empty()).await;
    assert_eq!(bob_view.messages[0].content, "hello bob");
    assert_eq!(bob_view.messages[0].author.name, "alice");

    bob_client.send_message("hello alice").await.unwrap();
    let alice_view = wait_for_view(&alice_client, |view| view.messages.len() == 2).await;
    assert_eq!(alice_view.messages[1].content, "hello alice");
    assert_eq!(alice_view.messages[1].author.name, "bob");
}
