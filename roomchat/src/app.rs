//! Application state and event handling for the terminal front-end.
//!
//! [`App`] owns only presentation state: which screen is showing, the room
//! list selection, the input line, and the latest view-state snapshot from
//! the session engine. Key handling translates raw input into [`Action`]s
//! that the main loop dispatches to the [`crate::session::SessionController`] —
//! bindings are declared once here, not re-attached per render pass.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use roomchat_proto::room::Room;

use crate::session::ViewState;

/// Which screen is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Room list (the entry screen).
    RoomList,
    /// Active room conversation.
    Chat,
}

/// A user intention for the main loop to dispatch to the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Re-fetch the room list.
    FetchRooms,
    /// Enter the named room.
    EnterRoom(String),
    /// Exit the active room.
    LeaveRoom,
    /// Send the composed message.
    SendMessage(String),
    /// Keystroke activity in the message input (drives typing presence).
    Keystroke,
    /// Manual scroll of the message list by signed rows.
    ScrollBy(isize),
    /// Activate the unread affordance: jump to the latest message.
    JumpToLatest,
    /// Quit the application.
    Quit,
}

/// Rows of chrome around the chat message area: status bar, typing line,
/// input box, and the message block's borders.
const CHAT_CHROME_ROWS: u16 = 7;

/// Presentation state for the terminal front-end.
pub struct App {
    /// Which screen is showing.
    pub screen: Screen,
    /// Rooms fetched from the HTTP collaborator.
    pub rooms: Vec<Room>,
    /// Selected index into `rooms`.
    pub selected_room: usize,
    /// Current text input.
    pub input: String,
    /// Cursor position in input (byte index).
    pub cursor_position: usize,
    /// Latest view-state snapshot from the session engine.
    pub view: ViewState,
    /// Latest transient notice, shown in the status bar.
    pub notice: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Timestamp display format (chrono).
    pub timestamp_format: String,
}

impl App {
    /// Create an app showing the room list.
    #[must_use]
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            screen: Screen::RoomList,
            rooms: Vec::new(),
            selected_room: 0,
            input: String::new(),
            cursor_position: 0,
            view: ViewState::default(),
            notice: None,
            should_quit: false,
            timestamp_format: timestamp_format.into(),
        }
    }

    /// Rows available to the message list given the terminal height.
    #[must_use]
    pub const fn chat_viewport_height(terminal_rows: u16) -> usize {
        terminal_rows.saturating_sub(CHAT_CHROME_ROWS) as usize
    }

    /// Replace the room list, keeping the selection in range.
    pub fn on_rooms_loaded(&mut self, rooms: Vec<Room>) {
        self.rooms = rooms;
        if self.selected_room >= self.rooms.len() {
            self.selected_room = self.rooms.len().saturating_sub(1);
        }
    }

    /// Replace the engine view-state snapshot.
    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
    }

    /// Show a transient notice in the status bar.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Handle a key event, returning the action to dispatch (if any).
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            self.should_quit = true;
            return Some(Action::Quit);
        }

        match self.screen {
            Screen::RoomList => self.handle_room_list_key(key),
            Screen::Chat => self.handle_chat_key(key),
        }
    }

    /// Key handling on the room list screen.
    fn handle_room_list_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_room = self.selected_room.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_room + 1 < self.rooms.len() {
                    self.selected_room += 1;
                }
                None
            }
            KeyCode::Enter => self
                .rooms
                .get(self.selected_room)
                .map(|room| Action::EnterRoom(room.name.clone())),
            KeyCode::Char('r') => Some(Action::FetchRooms),
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                Some(Action::Quit)
            }
            _ => None,
        }
    }

    /// Key handling on the chat screen.
    fn handle_chat_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => Some(Action::LeaveRoom),
            KeyCode::Enter => self.submit_message(),
            KeyCode::Char(c) => {
                self.input.insert(self.cursor_position, c);
                self.cursor_position += c.len_utf8();
                Some(Action::Keystroke)
            }
            KeyCode::Backspace => {
                self.delete_char();
                Some(Action::Keystroke)
            }
            KeyCode::Left => {
                self.move_cursor_left();
                None
            }
            KeyCode::Right => {
                self.move_cursor_right();
                None
            }
            KeyCode::Home => {
                self.cursor_position = 0;
                None
            }
            KeyCode::End => {
                self.cursor_position = self.input.len();
                None
            }
            KeyCode::Up => Some(Action::ScrollBy(-1)),
            KeyCode::Down => Some(Action::ScrollBy(1)),
            KeyCode::PageUp => Some(Action::ScrollBy(-10)),
            KeyCode::PageDown => Some(Action::ScrollBy(10)),
            KeyCode::Tab => Some(Action::JumpToLatest),
            _ => None,
        }
    }

    /// Submit the current input as a message.
    fn submit_message(&mut self) -> Option<Action> {
        if self.input.trim().is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.cursor_position = 0;
        Some(Action::SendMessage(text))
    }

    /// Delete the character before the cursor.
    fn delete_char(&mut self) {
        if self.cursor_position == 0 {
            return;
        }
        let prev = self.input[..self.cursor_position]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i);
        self.input.remove(prev);
        self.cursor_position = prev;
    }

    /// Move cursor one character left.
    fn move_cursor_left(&mut self) {
        self.cursor_position = self.input[..self.cursor_position]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i);
    }

    /// Move cursor one character right.
    fn move_cursor_right(&mut self) {
        self.cursor_position = self.input[self.cursor_position..]
            .chars()
            .next()
            .map_or(self.cursor_position, |c| {
                self.cursor_position + c.len_utf8()
            });
    }
}

/// Format an epoch-millisecond timestamp for display.
#[must_use]
pub fn format_timestamp_ms(ms: u64, format: &str) -> String {
    use chrono::{Local, TimeZone};
    let secs = i64::try_from(ms / 1000).unwrap_or(0);
    let nsecs = u32::try_from((ms % 1000) * 1_000_000).unwrap_or(0);
    match Local.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format(format).to_string(),
        _ => "??:??".to_string(),
    }
}
