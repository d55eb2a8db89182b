use crate::app::App;
use crate::model::FeedItem;
use crate::util::{html_to_text, strip_control_chars, truncate_to_width};
use chrono::{DateTime, FixedOffset, Utc};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Format timestamp as relative time
pub fn format_relative_time(timestamp: Option<DateTime<FixedOffset>>) -> String {
    let Some(ts) = timestamp else {
        return String::new();
    };

    let diff = Utc::now().timestamp() - ts.timestamp();

    // Clock skew between backend and terminal
    if diff < 0 {
        return "now".to_string();
    }

    if diff < 3600 {
        return format!("{}m", diff / 60);
    }

    if diff < 86400 {
        return format!("{}h", diff / 3600);
    }

    if diff < 604800 {
        return format!("{}d", diff / 86400);
    }

    ts.format("%b %d").to_string()
}

/// Render the unread item list of the active group
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let items = app.active_items();
    let selected = app.selection.selected_index(&app.visible);

    let list_items: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let time_str = format_relative_time(item.parsed_time());

            let title_style = if Some(i) == selected {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };

            // Leave room for borders and the time column
            let max_title = area.width.saturating_sub(10) as usize;
            let title = strip_control_chars(item.title());
            let title = truncate_to_width(&title, max_title).into_owned();

            let mut spans = vec![Span::styled(title, title_style)];
            if !time_str.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", time_str),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = match app.selection.active_group() {
        Some(group) => format!("{} ({})", group, items.len()),
        None => "Items".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);

    if list_items.is_empty() {
        let paragraph = Paragraph::new(empty_message(app))
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(List::new(list_items).block(block), area, &mut state);
}

fn empty_message(app: &App) -> &'static str {
    if app.response.feeds.is_empty() {
        "No items in this time range"
    } else {
        "All caught up"
    }
}

/// Render the preview of the selected item
pub fn render_preview(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let block = Block::default().borders(Borders::ALL).title("Preview");
    let Some(item) = app.selection.selected_item() else {
        f.render_widget(block, area);
        return;
    };

    let paragraph = Paragraph::new(preview_lines(item))
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn preview_lines(item: &FeedItem) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        strip_control_chars(item.title()).into_owned(),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    // Non-content labels as "key: value" metadata
    for (key, value) in item.labels.iter() {
        if crate::grouping::EXCLUDED_GROUP_LABELS.contains(&key) {
            continue;
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{}: ", key), Style::default().fg(Color::DarkGray)),
            Span::raw(strip_control_chars(value).into_owned()),
        ]));
    }
    if let Some(link) = item.link() {
        lines.push(Line::from(Span::styled(
            strip_control_chars(link).into_owned(),
            Style::default().fg(Color::Blue),
        )));
    }

    if let Some(snippet) = item.summary_snippet() {
        lines.push(Line::from(""));
        lines.extend(
            html_to_text(&strip_control_chars(snippet))
                .lines()
                .map(|l| Line::from(l.to_string())),
        );
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Labels;
    use chrono::Duration;

    fn at(offset: Duration) -> Option<DateTime<FixedOffset>> {
        Some((Utc::now() - offset).fixed_offset())
    }

    #[test]
    fn test_format_relative_time_buckets() {
        assert_eq!(format_relative_time(None), "");
        assert_eq!(format_relative_time(at(Duration::minutes(-5))), "now");
        assert_eq!(format_relative_time(at(Duration::minutes(5))), "5m");
        assert_eq!(format_relative_time(at(Duration::hours(3))), "3h");
        assert_eq!(format_relative_time(at(Duration::days(2))), "2d");
    }

    #[test]
    fn test_preview_skips_content_labels() {
        let item = FeedItem::new(
            [
                ("title", "Hello"),
                ("source", "hn"),
                ("content", "<p>long body</p>"),
                ("summary_html_snippet", "<b>Short</b> &amp; sweet"),
            ]
            .into_iter()
            .collect::<Labels>(),
            "2024-05-01T10:00:00Z",
        );
        let text: Vec<String> = preview_lines(&item)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["Hello", "source: hn", "", "Short & sweet"]);
    }
}
