//! Room list rendering (the entry screen).

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use super::theme;
use crate::app::App;

/// Render the room list.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .rooms
        .iter()
        .enumerate()
        .map(|(index, room)| {
            let style = if index == app.selected_room {
                theme::selected()
            } else {
                theme::normal()
            };
            let line = Line::from(vec![
                Span::styled(format!("# {}", room.name), style),
                Span::raw(" "),
                Span::styled(
                    format!("({} members)", room.participants.len()),
                    theme::dimmed(),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let block = Block::default()
        .title(Span::styled("Rooms", theme::bold()))
        .borders(Borders::ALL);

    if items.is_empty() {
        let empty = List::new([ListItem::new(Line::from(Span::styled(
            "No rooms available — press 'r' to refresh",
            theme::dimmed(),
        )))])
        .block(block);
        frame.render_widget(empty, area);
    } else {
        frame.render_widget(List::new(items).block(block), area);
    }
}
