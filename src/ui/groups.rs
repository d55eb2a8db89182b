use crate::app::{App, LoadState};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

/// Render the group tab row with per-group unread counts
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Grouped by {}", app.group_label));

    if app.visible.is_empty() {
        let text = match app.load_state {
            LoadState::Loading => "Loading...",
            _ => "No unread groups",
        };
        let paragraph = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let titles: Vec<Line> = app
        .visible
        .iter()
        .map(|(name, items)| {
            Line::from(vec![
                Span::raw(name.as_str()),
                Span::styled(
                    format!(" ({})", items.len()),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();

    let selected = app
        .selection
        .active_group()
        .and_then(|active| app.visible.keys().position(|name| name == active));

    let tabs = Tabs::new(titles)
        .block(block)
        .select(selected.unwrap_or(0))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("|");

    f.render_widget(tabs, area);
}
