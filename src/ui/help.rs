//! Help overlay: keybinding table grouped by view.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

/// (section, [(keys, description)])
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Browse",
        &[
            ("Tab / l / h", "Next / previous group"),
            ("j / k", "Move through items"),
            ("Enter", "Read selected item"),
            ("m", "Mark selected item read"),
            ("M", "Mark whole group read"),
            ("g", "Group by next label"),
            ("t", "Cycle time range"),
            ("/", "Search"),
            ("r", "Refresh / retry"),
            ("S", "Show summary"),
            ("o", "Open link in browser"),
            ("s", "Settings"),
            ("q", "Quit"),
        ],
    ),
    (
        "Reader",
        &[
            ("b / Esc", "Back to list"),
            ("n / Right", "Next unread in group"),
            ("j / k", "Scroll"),
            ("Ctrl+d / Ctrl+u", "Half page"),
            ("o", "Open link in browser"),
        ],
    ),
    (
        "Settings",
        &[
            ("a", "Add RSS source"),
            ("e", "Edit raw configuration"),
            ("w", "Apply draft"),
            ("u", "Discard draft"),
            ("r", "Reload from backend"),
            ("b / Esc", "Back"),
        ],
    ),
];

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (i, (section, bindings)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            rows.push(Row::new(vec![String::new(), String::new()]));
        }
        rows.push(Row::new(vec![
            Line::from(Span::styled(
                format!("-- {} --", section),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ]));
        for (keys, description) in bindings.iter() {
            rows.push(Row::new(vec![
                format!("  {}", keys),
                description.to_string(),
            ]));
        }
    }

    let widths = [Constraint::Length(18), Constraint::Min(20)];
    let table = Table::new(rows, widths).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help (? to close) "),
    );

    f.render_widget(table, overlay);
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
