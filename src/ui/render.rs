//! Render functions for the TUI.
//!
//! This module handles all rendering logic, dispatching to the appropriate
//! view based on application state.

use crate::app::{App, LoadState, Prompt, View};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{groups, help, items, reader, settings, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
///
/// Routes to the appropriate view renderer based on current application state.
/// Handles terminal size validation before rendering.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    match app.view {
        View::Browse => render_browse(f, app),
        View::Reader => render_reader(f, app),
        View::Settings => render_settings(f, app),
    }

    if app.show_summary {
        render_summary_overlay(f, app);
    }

    if let Some(prompt) = &app.prompt {
        render_prompt_overlay(f, prompt);
    }

    if app.show_help {
        help::render(f);
    }
}

/// Render the browse view (group tabs, item list and preview).
fn render_browse(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    groups::render(f, app, chunks[0]);

    if let LoadState::Failed(error) = &app.load_state {
        render_query_error(f, error, chunks[1]);
    } else {
        let panels = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        items::render(f, app, panels[0]);
        items::render_preview(f, app, panels[1]);
    }

    status::render(f, app, chunks[2]);
}

/// Inline error for a failed query, shown in place of the list.
fn render_query_error(f: &mut Frame, error: &str, area: Rect) {
    let text = vec![
        Line::from("Could not load items:"),
        Line::from(""),
        Line::from(error.to_string()),
        Line::from(""),
        Line::from("Press r to retry."),
    ];
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Error"));
    f.render_widget(paragraph, area);
}

/// Render the reader view (item content + status bar).
fn render_reader(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    reader::render(f, app, chunks[0]);
    status::render(f, app, chunks[1]);
}

fn render_settings(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    settings::render(f, app, chunks[0]);
    status::render(f, app, chunks[1]);
}

/// Render the backend's summary of the current result set.
fn render_summary_overlay(f: &mut Frame, app: &App) {
    let overlay = help::centered_rect(80, 80, f.area());
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(app.summary_lines.clone())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Summary (S to close) "),
        );
    f.render_widget(paragraph, overlay);
}

/// Render a single-line input prompt centered on screen.
fn render_prompt_overlay(f: &mut Frame, prompt: &Prompt) {
    let area = f.area();

    let (title, label, input) = match prompt {
        Prompt::Search { input } => (" Search ", "Query:".to_string(), input),
        Prompt::AddSourceName { input } => (" Add Source ", "Source name:".to_string(), input),
        Prompt::AddSourceUrl { name, input } => {
            (" Add Source ", format!("RSS URL for {}:", name), input)
        }
    };
    let text = format!("{}\n\n> {}_\n\n(Enter) Confirm  (Esc) Cancel", label, input);

    let width = 60u16.min(area.width.saturating_sub(4));
    let height = 7u16.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);

    let paragraph = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title),
    );

    f.render_widget(paragraph, overlay);
}
