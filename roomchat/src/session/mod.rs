//! Room session engine.
//!
//! Contains the [`SessionController`] which orchestrates one room visit at
//! a time: fetch history over HTTP, seed the [`MessageStore`], open the
//! room channel (join handshake), apply inbound events in delivery order,
//! gate auto-scroll through the [`ViewportTracker`], and drive the typing
//! debounce machine. All session state is owned here; other components
//! read and mutate only through the controller.
//!
//! Execution is single-threaded and cooperative: handlers run to
//! completion, suspension happens only at network I/O and timers, and the
//! state mutex is never held across a suspension point. A visit-generation
//! counter re-validated after every await keeps late-arriving responses
//! for an abandoned room from touching the new session.

pub mod store;
pub mod typing;
pub mod viewport;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use roomchat_proto::event::{ClientEvent, ServerEvent};
use roomchat_proto::message::{Message, ValidationError};
use roomchat_proto::room::Room;
use roomchat_proto::user::User;

use crate::api::{ApiError, RoomApi};
use crate::channel::{ChannelError, Connector, RoomChannel};

use store::MessageStore;
use typing::{Transition, TypingRoster, TypingSignal};
use viewport::ViewportTracker;

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The history fetch failed; the room was left unseeded.
    #[error("history fetch failed: {0}")]
    Api(#[from] ApiError),

    /// The room channel failed to open or send.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The composed message failed validation.
    #[error("invalid message: {0}")]
    Validation(#[from] ValidationError),

    /// The operation requires an active room.
    #[error("not in a room")]
    NotInRoom,
}

/// Events pushed to the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A room was entered and its history seeded.
    RoomEntered {
        /// The room that became active.
        room: Room,
        /// Number of history messages seeded.
        message_count: usize,
    },
    /// The active room was exited; the surface should navigate back to the
    /// room list.
    RoomLeft,
    /// An authoritative message became visible.
    MessageAppended {
        /// The appended message.
        message: Message,
    },
    /// The remote typing display set changed.
    TypingChanged {
        /// The new display set (self already excluded).
        users: Vec<String>,
    },
    /// The room channel died; the room shows stale content until re-entry.
    ConnectionLost,
    /// A transient, non-fatal notification.
    Notice(String),
}

/// Tunable parameters for the session engine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity window of the typing debounce machine.
    pub typing_idle: Duration,
    /// Delay between room entry and the one forced scroll that settles the
    /// initial layout.
    pub scroll_settle: Duration,
    /// Buffer size of the [`SessionEvent`] channel.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_idle: typing::TYPING_IDLE_TIMEOUT,
            scroll_settle: Duration::from_millis(100),
            event_buffer: 64,
        }
    }
}

/// Composed view-state snapshot for the rendering surface.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// The active room, if any.
    pub room: Option<Room>,
    /// Visible messages in insertion order.
    pub messages: Vec<Message>,
    /// Formatted typing indicator line, if anyone is typing.
    pub typing_indicator: Option<String>,
    /// Whether content has arrived below the fold.
    pub unread: bool,
    /// Whether the room channel is live.
    pub connected: bool,
    /// First visible row of the message list.
    pub scroll_offset: usize,
}

/// Mutable session state, guarded by the controller's mutex.
struct SessionState<Ch> {
    room: Option<Room>,
    channel: Option<Arc<Ch>>,
    store: MessageStore,
    typing: TypingSignal,
    roster: TypingRoster,
    viewport: ViewportTracker,
    settle_scroll_at: Option<Instant>,
    connected: bool,
}

impl<Ch> SessionState<Ch> {
    fn new(typing_idle: Duration) -> Self {
        Self {
            room: None,
            channel: None,
            store: MessageStore::new(),
            typing: TypingSignal::new(typing_idle),
            roster: TypingRoster::new(),
            viewport: ViewportTracker::new(),
            settle_scroll_at: None,
            connected: false,
        }
    }

    /// Forget the current visit. The channel must already be closed:
    /// callers take it out and close it before clearing (close before
    /// clear, clear before any new open).
    fn clear_visit(&mut self) {
        self.room = None;
        self.store.clear();
        self.roster.clear();
        self.typing.cancel();
        self.viewport.reset();
        self.settle_scroll_at = None;
        self.connected = false;
    }
}

/// Orchestrates room visits and owns the [`SessionState`].
///
/// Generic over the HTTP collaborator and the channel connector so tests
/// drive it with stubs. The resolved user identity is injected at
/// construction — nothing reads it from ambient process state.
pub struct SessionController<A: RoomApi, C: Connector> {
    api: A,
    connector: C,
    user: User,
    state: Mutex<SessionState<C::Channel>>,
    /// Visit generation; bumped by every entry and exit. Async work
    /// captures the value up front and discards its result if the counter
    /// moved while it was suspended.
    generation: AtomicU64,
    event_tx: mpsc::Sender<SessionEvent>,
    config: SessionConfig,
}

impl<A: RoomApi, C: Connector> SessionController<A, C> {
    /// Create a controller and the receiver for its [`SessionEvent`]s.
    pub fn new(
        api: A,
        connector: C,
        user: User,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
        let controller = Self {
            api,
            connector,
            user,
            state: Mutex::new(SessionState::new(config.typing_idle)),
            generation: AtomicU64::new(0),
            event_tx,
            config,
        };
        (controller, event_rx)
    }

    /// The identity this session acts as.
    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    /// Fetch the list of available rooms from the HTTP collaborator.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Api`] when the request fails.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, SessionError> {
        Ok(self.api.list_rooms().await?)
    }

    /// Enter a room: fetch history, seed the store, open the channel.
    ///
    /// Tear-down of the previous visit follows the required write order:
    /// transport close, then state clear, then the new transport open. If
    /// the visit is superseded while suspended (the user left or entered
    /// another room), the late result is discarded without touching the
    /// new session.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Api`]: history fetch failed; the previous room (if
    ///   any) is left untouched and a [`SessionEvent::Notice`] is emitted.
    /// - [`SessionError::Channel`]: the channel failed to open; the session
    ///   is left cleared, showing no content until re-entry.
    pub async fn enter_room(&self, name: &str) -> Result<(), SessionError> {
        let visit = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(room = name, "entering room");

        let history = match self.api.fetch_room(name).await {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(room = name, err = %e, "history fetch failed");
                self.notify(SessionEvent::Notice(format!("could not load '{name}': {e}")));
                return Err(e.into());
            }
        };
        if self.is_stale(visit) {
            tracing::debug!(room = name, "history fetch superseded, discarding");
            return Ok(());
        }

        // Tear down the previous visit: close before clear.
        let previous = {
            let mut state = self.state.lock().await;
            let previous = state.channel.take();
            state.clear_visit();
            previous
        };
        if let Some(channel) = previous {
            channel.close();
        }

        let room = history.chat_room.clone();
        let channel = match self.connector.open(&room.id, &self.user.id).await {
            Ok(channel) => Arc::new(channel),
            Err(e) => {
                tracing::warn!(room = name, err = %e, "channel open failed");
                self.notify(SessionEvent::Notice(format!("could not join '{name}': {e}")));
                return Err(e.into());
            }
        };

        let mut state = self.state.lock().await;
        if self.is_stale(visit) {
            // Another entry won the race while we were connecting; this
            // channel was opened for a visit that no longer exists.
            drop(state);
            channel.close();
            return Ok(());
        }
        state.store.seed(history.messages);
        state.room = Some(room.clone());
        state.channel = Some(channel);
        state.connected = true;
        // One forced scroll shortly after the first render, so layout has
        // settled before the viewport is measured.
        state.settle_scroll_at = Some(Instant::now() + self.config.scroll_settle);
        let message_count = state.store.len();
        drop(state);

        self.notify(SessionEvent::RoomEntered {
            room,
            message_count,
        });
        Ok(())
    }

    /// Exit the active room: close the channel, clear the session, tell the
    /// surface to navigate back to the room list. A no-op when no room is
    /// active, except that in-flight entries are still cancelled.
    pub async fn leave_room(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        if let Some(channel) = state.channel.take() {
            channel.close();
        }
        let was_in_room = state.room.is_some();
        state.clear_visit();
        drop(state);

        if was_in_room {
            tracing::info!("left room");
            self.notify(SessionEvent::RoomLeft);
        }
    }

    /// Compose and transmit a message.
    ///
    /// The provisional copy is never inserted locally — the message becomes
    /// visible when the server echoes the authoritative copy back through
    /// the channel. The view does snap to the bottom immediately, so the
    /// echo lands in sight.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotInRoom`] without an active room.
    /// - [`SessionError::Validation`] for empty or oversized content.
    /// - [`SessionError::Channel`] when the transmit fails; the store is
    ///   left untouched.
    pub async fn send_message(&self, content: &str) -> Result<(), SessionError> {
        let (channel, event) = {
            let state = self.state.lock().await;
            let room = state.room.as_ref().ok_or(SessionError::NotInRoom)?;
            let draft = MessageStore::compose(content, &self.user, &room.id);
            draft.validate()?;
            let channel = state.channel.clone().ok_or(SessionError::NotInRoom)?;
            let event = ClientEvent::Message {
                content: draft.content,
                sender: self.user.clone(),
                chatroom: draft.room_id,
            };
            (channel, event)
        };
        channel.send(event).await?;

        let mut state = self.state.lock().await;
        let height = state.store.len();
        state.viewport.notify_new_content(height, true);
        Ok(())
    }

    /// Record keystroke activity in the message input at `now`.
    ///
    /// Drives the typing debounce machine; the `Idle -> Typing` edge sends
    /// one `startTyping` over the channel. Send failures are logged and
    /// swallowed, typing signals are fire-and-forget.
    pub async fn keystroke(&self, now: Instant) {
        let action = {
            let mut state = self.state.lock().await;
            if state.room.is_none() {
                return;
            }
            let transition = state.typing.keystroke(now);
            transition.and_then(|t| Self::typing_event(&state, t))
        };
        self.send_typing(action).await;
    }

    /// Advance timers to `now`: the typing-idle deadline and the one
    /// post-entry settle scroll.
    pub async fn tick(&self, now: Instant) {
        let action = {
            let mut state = self.state.lock().await;
            if state.settle_scroll_at.is_some_and(|at| now >= at) {
                state.settle_scroll_at = None;
                let height = state.store.len();
                state.viewport.notify_new_content(height, true);
            }
            let transition = state.typing.tick(now);
            transition.and_then(|t| Self::typing_event(&state, t))
        };
        self.send_typing(action).await;
    }

    /// Drain all queued inbound events from the channel and apply them in
    /// delivery order. Returns how many events were applied.
    pub async fn try_pump(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut applied = 0;
        while let Some(event) = state.channel.as_ref().and_then(|c| c.try_recv()) {
            self.apply(&mut state, event);
            applied += 1;
        }
        if state.connected && state.channel.as_ref().is_some_and(|c| !c.is_open()) {
            state.connected = false;
            tracing::warn!("room channel lost");
            self.notify(SessionEvent::ConnectionLost);
        }
        applied
    }

    /// Attach (or re-measure) the rendering surface.
    pub async fn mount_viewport(&self, height: usize) {
        let mut state = self.state.lock().await;
        state.viewport.mount(height);
    }

    /// Manual scroll from the surface.
    pub async fn scroll_by(&self, delta: isize) {
        let mut state = self.state.lock().await;
        state.viewport.scroll_by(delta);
    }

    /// Activate the unread affordance: jump to the latest message.
    pub async fn jump_to_latest(&self) {
        let mut state = self.state.lock().await;
        let height = state.store.len();
        state.viewport.notify_new_content(height, true);
    }

    /// Snapshot the composed view-state for rendering.
    pub async fn view(&self) -> ViewState {
        let state = self.state.lock().await;
        ViewState {
            room: state.room.clone(),
            messages: state.store.messages().to_vec(),
            typing_indicator: state.roster.indicator(),
            unread: state.viewport.has_unread(),
            connected: state.connected,
            scroll_offset: state.viewport.offset(),
        }
    }

    /// Apply one inbound event to the session.
    ///
    /// Events are filtered to the active room: a stale event for a room the
    /// user has since left is dropped silently.
    fn apply(&self, state: &mut SessionState<C::Channel>, event: ServerEvent) {
        match event {
            ServerEvent::Message(message) => {
                let Some(room) = state.room.as_ref() else {
                    return;
                };
                if message.room_id != room.id {
                    tracing::debug!(
                        id = %message.id,
                        room = %message.room_id,
                        "message for inactive room dropped"
                    );
                    return;
                }
                if !state.store.append(message.clone()) {
                    return;
                }
                // The echo of a self-sent message always forces the scroll.
                let own = message.author.id == self.user.id;
                let height = state.store.len();
                state.viewport.notify_new_content(height, own);
                self.notify(SessionEvent::MessageAppended { message });
            }
            ServerEvent::Typing { typing_users } => {
                if state.room.is_none() {
                    return;
                }
                state.roster.replace(typing_users, &self.user.name);
                self.notify(SessionEvent::TypingChanged {
                    users: state.roster.users().to_vec(),
                });
            }
        }
    }

    fn typing_event(
        state: &SessionState<C::Channel>,
        transition: Transition,
    ) -> Option<(Arc<C::Channel>, ClientEvent)> {
        let room = state.room.as_ref()?;
        let channel = state.channel.clone()?;
        let event = match transition {
            Transition::Start => ClientEvent::StartTyping {
                room_id: room.id.clone(),
            },
            Transition::Stop => ClientEvent::StopTyping {
                room_id: room.id.clone(),
            },
        };
        Some((channel, event))
    }

    async fn send_typing(&self, action: Option<(Arc<C::Channel>, ClientEvent)>) {
        if let Some((channel, event)) = action {
            if let Err(e) = channel.send(event).await {
                tracing::debug!(err = %e, "typing signal send failed");
            }
        }
    }

    fn is_stale(&self, visit: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != visit
    }

    /// Best-effort event emission; a full or dropped receiver never blocks
    /// the engine.
    fn notify(&self, event: SessionEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
