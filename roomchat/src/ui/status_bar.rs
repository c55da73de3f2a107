//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.screen {
        Screen::RoomList => "Enter: open room | r: refresh | q: quit",
        Screen::Chat => "Enter: send | ↑↓/PgUp/PgDn: scroll | Tab: latest | Esc: back",
    };

    let (dot_color, status_text) = match app.screen {
        Screen::Chat if app.view.connected => (theme::SUCCESS, "Connected"),
        Screen::Chat => (theme::OFFLINE, "Disconnected"),
        Screen::RoomList => (theme::OFFLINE, "Room list"),
    };

    let mut spans = vec![
        Span::styled("RoomChat v0.1.0", theme::bold()),
        Span::raw(" | "),
        Span::styled("●", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(" | "),
        Span::styled(help_text, theme::dimmed()),
    ];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(notice.clone(), theme::unread_badge()));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
