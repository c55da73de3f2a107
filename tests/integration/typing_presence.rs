//! Typing presence end to end: debounced local signal, authoritative
//! remote snapshots, self-exclusion.
//!
//! The debounce window is shortened via [`SessionConfig`] so the idle
//! timeout can elapse in real time without slowing the suite down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use roomchat::api::HttpRoomApi;
use roomchat::channel::ws::WsConnector;
use roomchat::session::{SessionConfig, SessionController, SessionEvent, ViewState};
use roomchat_proto::user::User;
use roomchat_server::server::{ServerState, start_server_with_state};

type Client = SessionController<HttpRoomApi, WsConnector>;

/// Short debounce so stop-typing can be observed quickly.
const TEST_IDLE: Duration = Duration::from_millis(200);

fn alice() -> User {
    User::new("u-alice", "alice", "alice@example.com")
}

fn bob() -> User {
    User::new("u-bob", "bob", "bob@example.com")
}

fn carol() -> User {
    User::new("u-carol", "carol", "carol@example.com")
}

async fn start_server() -> (Arc<ServerState>, std::net::SocketAddr) {
    let state = Arc::new(ServerState::new());
    state
        .rooms
        .create_room("general", vec![alice(), bob(), carol()])
        .await
        .unwrap();
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
        SessionConfig {
            typing_idle: TEST_IDLE,
            ..SessionConfig::default()
        },
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
async fn typist_appears_in_the_other_participants_indicator() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    alice_client.keystroke(Instant::now()).await;

    let view = wait_for_view(&bob_client, |view| view.typing_indicator.is_some()).await;
    assert_eq!(view.typing_indicator.as_deref(), Some("alice is typing…"));
}

#[tokio::test]
async fn typist_never_sees_themselves() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    alice_client.keystroke(Instant::now()).await;

    // Bob sees alice typing; alice's own indicator stays empty even though
    // the server's snapshot includes her.
    wait_for_view(&bob_client, |view| view.typing_indicator.is_some()).await;
    alice_client.try_pump().await;
    assert_eq!(alice_client.view().await.typing_indicator, None);
}

#[tokio::test]
async fn indicator_clears_after_the_idle_timeout() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    alice_client.keystroke(Instant::now()).await;
    wait_for_view(&bob_client, |view| view.typing_indicator.is_some()).await;

    // No further keystrokes: after the idle window the stop signal goes
    // out and bob's indicator clears.
    tokio::time::sleep(TEST_IDLE + Duration::from_millis(50)).await;
    alice_client.tick(Instant::now()).await;

    wait_for_view(&bob_client, |view| view.typing_indicator.is_none()).await;
}

#[tokio::test]
async fn continued_typing_keeps_the_indicator_alive() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    // Keystrokes spaced inside the idle window: one start, no stop.
    alice_client.keystroke(Instant::now()).await;
    for _ in 0..3 {
        tokio::time::sleep(TEST_IDLE / 2).await;
        alice_client.tick(Instant::now()).await;
        alice_client.keystroke(Instant::now()).await;
    }

    let view = wait_for_view(&bob_client, |view| view.typing_indicator.is_some()).await;
    assert_eq!(view.typing_indicator.as_deref(), Some("alice is typing…"));
}

#[tokio::test]
async fn two_typists_render_in_plural_form() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());
    let (carol_client, _carol_events) = client(addr, carol());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();
    carol_client.enter_room("general").await.unwrap();

    alice_client.keystroke(Instant::now()).await;
    carol_client.keystroke(Instant::now()).await;

    let view = wait_for_view(&bob_client, |view| {
        view.typing_indicator
            .as_deref()
            .is_some_and(|s| s.contains("are typing"))
    })
    .await;
    // Server snapshots are sorted, so the order is deterministic.
    assert_eq!(
        view.typing_indicator.as_deref(),
        Some("alice, carol are typing…")
    );
}

#[tokio::test]
async fn leaving_the_room_drops_the_typist_from_snapshots() {
    let (_state, addr) = start_server().await;
    let (alice_client, _alice_events) = client(addr, alice());
    let (bob_client, _bob_events) = client(addr, bob());

    alice_client.enter_room("general").await.unwrap();
    bob_client.enter_room("general").await.unwrap();

    alice_client.keystroke(Instant::now()).await;
    wait_for_view(&bob_client, |view| view.typing_indicator.is_some()).await;

    // Alice leaves mid-episode; the server clears her from the typing set
    // and bob's indicator goes away without her ever sending stopTyping.
    alice_client.leave_room().await;
    wait_for_view(&bob_client, |view| view.typing_indicator.is_none()).await;
}
