//! Settings view: backend sources, notification routes and receivers.

use crate::api::{ConfigDocument, RouteSummary};
use crate::app::{App, LoadState};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Render the settings view
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_header(f, app, chunks[0]);

    let Some(doc) = app.settings.current() else {
        let (text, style) = match &app.settings.load_state {
            LoadState::Failed(error) => (
                format!("Failed to load configuration: {}\n\nPress r to retry", error),
                Style::default().fg(Color::Red),
            ),
            _ => ("Loading configuration...".to_string(), Style::default()),
        };
        let paragraph = Paragraph::new(text)
            .style(style)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Configuration"));
        f.render_widget(paragraph, chunks[1]);
        return;
    };

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_sources(f, app, doc, panels[0]);
    render_notifications(f, doc, panels[1]);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        format!("Backend {}", app.client.base_url()),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(site) = &app.config.site_url {
        spans.push(Span::styled(
            format!("  {}", site),
            Style::default().fg(Color::Blue),
        ));
    }

    let state = if app.settings.applying {
        Some(("applying...", Color::Yellow))
    } else if app.settings.is_dirty() {
        Some(("unapplied changes", Color::Yellow))
    } else if app.settings.load_state == LoadState::Loading {
        Some(("loading...", Color::DarkGray))
    } else {
        None
    };
    if let Some((label, color)) = state {
        spans.push(Span::styled(
            format!("  [{}]", label),
            Style::default().fg(color),
        ));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Settings"));
    f.render_widget(paragraph, area);
}

fn render_sources(f: &mut Frame, app: &App, doc: &ConfigDocument, area: Rect) {
    let sources = doc.sources();
    let items: Vec<ListItem> = sources
        .iter()
        .map(|source| {
            let mut lines = vec![Line::from(Span::styled(
                source.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            if let Some(url) = &source.rss_url {
                lines.push(Line::from(Span::styled(
                    format!("  {}", url),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            if !source.labels.is_empty() {
                let labels: Vec<String> = source
                    .labels
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                lines.push(Line::from(Span::styled(
                    format!("  {}", labels.join(" ")),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!("Sources ({})", sources.len()));

    if items.is_empty() {
        let paragraph = Paragraph::new("No sources configured. Press a to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let selected = app.settings.selected_source.min(items.len() - 1);
    let mut state = ListState::default().with_selected(Some(selected));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_notifications(f: &mut Frame, doc: &ConfigDocument, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        "Receivers",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    let receivers = doc.receivers();
    if receivers.is_empty() {
        lines.push(Line::from("  (none)"));
    }
    lines.extend(receivers.iter().map(|r| Line::from(format!("  {}", r))));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Routes",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    let routes = doc.notification_routes();
    if routes.is_empty() {
        lines.push(Line::from("  (none)"));
    }
    lines.extend(routes.iter().map(route_line));

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Notifications"));
    f.render_widget(paragraph, area);
}

fn route_line(route: &RouteSummary) -> Line<'static> {
    let mut text = format!("{}-> {}", "  ".repeat(route.depth + 1), route.receivers.join(", "));
    if !route.matchers.is_empty() {
        text.push_str(&format!("  when {}", route.matchers.join(" && ")));
    }
    if !route.group_by.is_empty() {
        text.push_str(&format!("  by {}", route.group_by.join(",")));
    }
    Line::from(text)
}
