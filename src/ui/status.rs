use crate::app::{App, LoadState, Prompt, View};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else if let Some(prompt) = &app.prompt {
        Cow::Borrowed(prompt_hint(prompt))
    } else {
        match app.view {
            View::Browse => match app.load_state {
                LoadState::Loading => Cow::Borrowed("Loading..."),
                LoadState::Failed(_) => Cow::Borrowed("[r]etry [t]ime range [s]ettings [q]uit"),
                _ => Cow::Borrowed(
                    "[Tab]group [j/k]move [Enter]read [m]ark [M]ark group [g]roup by [t]ime [/]search [S]ummary [?]help",
                ),
            },
            View::Reader => Cow::Borrowed("[b]ack [n]ext [j/k]scroll [Ctrl+d/u]page [o]pen"),
            View::Settings => {
                Cow::Borrowed("[a]dd source [e]dit [w]rite [u]ndo [r]eload [b]ack")
            }
        }
    };

    let counters = counters(app);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(counters.chars().count() as u16),
        ])
        .split(area);

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), chunks[0]);
    f.render_widget(
        Paragraph::new(counters).style(style.fg(Color::Cyan)),
        chunks[1],
    );
}

fn prompt_hint(prompt: &Prompt) -> &'static str {
    match prompt {
        Prompt::Search { .. } => "Type to search | ESC cancel | ENTER confirm",
        Prompt::AddSourceName { .. } => "Source name | ESC cancel | ENTER next",
        Prompt::AddSourceUrl { .. } => "RSS URL | ESC cancel | ENTER add",
    }
}

/// Right-aligned counters: unread items, items read today, lookback window.
fn counters(app: &App) -> String {
    let mut out = format!(
        " {} unread | {} read today | {}",
        app.unread,
        app.read_state.today_count(),
        app.params.lookback.label()
    );
    if !app.params.query.is_empty() {
        out.push_str(" | filtered");
    }
    out.push(' ');
    out
}
