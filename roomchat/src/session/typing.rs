//! Typing presence: the local debounce machine and the remote roster.
//!
//! The local side is an `Idle -> Typing -> Idle` state machine. The first
//! keystroke after becoming idle yields a start transition; every further
//! keystroke only pushes the inactivity deadline out. When the deadline
//! passes, the machine yields a stop transition. Each episode produces
//! exactly one start and one stop.
//!
//! Instants are injected by the caller, so the machine itself never reads
//! a clock and tests can drive it deterministically.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

/// Inactivity window after the last keystroke before typing stops.
pub const TYPING_IDLE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Edge transition of the local typing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `Idle -> Typing`: emit one `startTyping`.
    Start,
    /// `Typing -> Idle`: emit one `stopTyping`.
    Stop,
}

/// Local typing state with a pending-expiry deadline.
#[derive(Debug)]
pub struct TypingSignal {
    /// Inactivity window; [`TYPING_IDLE_TIMEOUT`] unless configured.
    idle_timeout: Duration,
    /// `Some(deadline)` while in the `Typing` state.
    deadline: Option<Instant>,
}

impl TypingSignal {
    /// Create an idle machine with the given inactivity window.
    #[must_use]
    pub const fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            deadline: None,
        }
    }

    /// Record keystroke activity at `now`.
    ///
    /// Returns [`Transition::Start`] on the first keystroke while idle;
    /// `None` for keystrokes while already typing (the deadline is reset
    /// either way).
    pub fn keystroke(&mut self, now: Instant) -> Option<Transition> {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(now + self.idle_timeout);
        was_idle.then_some(Transition::Start)
    }

    /// Advance the clock to `now`.
    ///
    /// Returns [`Transition::Stop`] exactly once when the inactivity
    /// deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<Transition> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(Transition::Stop)
            }
            _ => None,
        }
    }

    /// Cancel a pending episode without emitting a stop.
    ///
    /// Used on room exit: the timer belonged to the old room's channel,
    /// which is being torn down anyway.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether the machine is currently in the `Typing` state.
    #[must_use]
    pub const fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }
}

impl Default for TypingSignal {
    fn default() -> Self {
        Self::new(TYPING_IDLE_TIMEOUT)
    }
}

/// Remote typing display set, replaced wholesale on every snapshot.
#[derive(Debug, Default)]
pub struct TypingRoster {
    users: Vec<String>,
}

impl TypingRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the display set with an inbound snapshot.
    ///
    /// The snapshot is deduplicated and the local user is removed — the
    /// reader never sees themselves listed as typing.
    pub fn replace(&mut self, users: Vec<String>, local_name: &str) {
        let mut seen = HashSet::new();
        self.users = users
            .into_iter()
            .filter(|user| user != local_name && seen.insert(user.clone()))
            .collect();
    }

    /// Forget everyone (room exit).
    pub fn clear(&mut self) {
        self.users.clear();
    }

    /// The currently displayed set, in snapshot order.
    #[must_use]
    pub fn users(&self) -> &[String] {
        &self.users
    }

    /// Human-readable indicator line, or `None` when nobody is typing.
    #[must_use]
    pub fn indicator(&self) -> Option<String> {
        match self.users.as_slice() {
            [] => None,
            [one] => Some(format!("{one} is typing…")),
            many => Some(format!("{} are typing…", many.join(", "))),
        }
    }
}
