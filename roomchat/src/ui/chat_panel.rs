//! Chat panel rendering (message list + typing line + input box).

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, format_timestamp_ms};

/// Render the chat screen: messages, typing indicator, input box.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // messages
            Constraint::Length(1), // typing indicator
            Constraint::Length(3), // input box
        ])
        .split(area);

    render_messages(frame, chunks[0], app);
    render_typing(frame, chunks[1], app);
    render_input(frame, chunks[2], app);
}

/// Render the visible window of the message list.
fn render_messages(frame: &mut Frame, area: Rect, app: &App) {
    let visible_rows = area.height.saturating_sub(2) as usize;
    let offset = app.view.scroll_offset;

    let items: Vec<ListItem> = app
        .view
        .messages
        .iter()
        .skip(offset)
        .take(visible_rows)
        .map(|msg| {
            let line = Line::from(vec![
                Span::styled(
                    format_timestamp_ms(msg.created_at.as_millis(), &app.timestamp_format),
                    theme::dimmed(),
                ),
                Span::raw(" "),
                Span::styled(
                    msg.author.name.clone(),
                    theme::normal().fg(theme::sender_color(&msg.author.name)),
                ),
                Span::raw(": "),
                Span::styled(msg.content.clone(), theme::normal()),
            ]);
            ListItem::new(line)
        })
        .collect();

    let title = app
        .view
        .room
        .as_ref()
        .map_or_else(|| "Chat".to_string(), |room| format!("# {}", room.name));

    let mut block = Block::default()
        .title(Span::styled(title, theme::bold()))
        .borders(Borders::ALL);
    if app.view.unread {
        block = block.title_bottom(Line::from(Span::styled(
            " new messages below — Tab to jump ",
            theme::unread_badge(),
        )));
    }

    frame.render_widget(List::new(items).block(block), area);
}

/// Render the typing indicator line.
fn render_typing(frame: &mut Frame, area: Rect, app: &App) {
    let line = app.view.typing_indicator.as_ref().map_or_else(
        || Line::from(Span::raw("")),
        |indicator| Line::from(Span::styled(indicator.clone(), theme::typing_indicator())),
    );
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the input box.
fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let mut display_text = app.input.clone();
    if app.cursor_position >= display_text.len() {
        display_text.push('█');
    } else {
        display_text.insert(app.cursor_position, '█');
    }

    let block = Block::default()
        .title(Span::styled("Message", theme::bold()))
        .borders(Borders::ALL);

    let paragraph = Paragraph::new(Line::from(Span::styled(display_text, theme::normal())))
        .block(block);
    frame.render_widget(paragraph, area);
}
