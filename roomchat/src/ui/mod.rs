//! Terminal UI rendering.

pub mod chat_panel;
pub mod room_list;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    // Content above, one-row status bar below.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    match app.screen {
        Screen::RoomList => room_list::render(frame, chunks[0], app),
        Screen::Chat => chat_panel::render(frame, chunks[0], app),
    }

    status_bar::render(frame, chunks[1], app);
}
