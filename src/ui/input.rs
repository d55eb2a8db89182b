//! Input handling for the TUI.
//!
//! This module processes keyboard input and dispatches to the appropriate
//! handler based on current view and overlay.

use crate::app::{App, AppEvent, Prompt, View};
use crate::util::validate_url_for_open;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

use super::reader::render_markdown;
use super::tasks::{run_query, spawn_config_apply, spawn_config_load, spawn_query};
use super::Action;

/// Error message when the selected item has no link.
const ERR_ITEM_NO_LINK: &str = "Item has no link";

/// Main input dispatch function.
///
/// Overlays capture all keys while visible: help first, then an open prompt,
/// then the summary panel. Otherwise keys go to the current view.
pub(super) async fn handle_input(
    app: &mut App,
    key: KeyEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Ok(Action::Quit);
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            app.show_help = false;
        }
        return Ok(Action::Continue);
    }

    if app.prompt.is_some() {
        handle_prompt_input(app, key.code, event_tx).await;
        return Ok(Action::Continue);
    }

    if app.show_summary {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('S')) {
            app.show_summary = false;
        }
        return Ok(Action::Continue);
    }

    match app.view {
        View::Browse => handle_browse_input(app, key.code, event_tx).await,
        View::Reader => handle_reader_input(app, key, event_tx).await,
        View::Settings => Ok(handle_settings_input(app, key.code, event_tx)),
    }
}

/// Handle input in the browse view (group tabs + item list).
async fn handle_browse_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => app.step_item(true),
        KeyCode::Char('k') | KeyCode::Up => app.step_item(false),
        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => app.cycle_group(true).await,
        KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => app.cycle_group(false).await,
        KeyCode::Enter => {
            app.open_selected().await;
        }
        KeyCode::Char('m') => {
            if app.mark_selected_read().await {
                app.set_status("Marked as read");
            }
        }
        KeyCode::Char('M') => {
            let count = app.mark_group_read().await;
            if count > 0 {
                app.set_status(format!("Marked {} items as read", count));
            }
        }
        KeyCode::Char('g') => match app.cycle_group_label().await {
            Some(label) => app.set_status(format!("Grouping by {}", label)),
            None => app.set_status("No other label to group by"),
        },
        KeyCode::Char('t') => {
            let lookback = app.cycle_lookback();
            app.set_status(format!("Showing the last {}", lookback.label()));
            run_query(app, event_tx, false).await;
        }
        KeyCode::Char('/') => {
            if app.config.disable_search {
                app.set_status("Search is disabled");
            } else {
                app.prompt = Some(Prompt::Search {
                    input: app.params.query.clone(),
                });
            }
        }
        KeyCode::Esc => {
            if !app.params.query.is_empty() {
                app.params.query.clear();
                run_query(app, event_tx, false).await;
            }
        }
        KeyCode::Char('r') => {
            app.set_status("Refreshing...");
            run_query(app, event_tx, true).await;
        }
        KeyCode::Char('S') => {
            if app.response.summary.trim().is_empty() {
                app.set_status("No summary for this result set");
            } else {
                if app.summary_lines.is_empty() {
                    app.summary_lines = render_markdown(&app.response.summary);
                }
                app.show_summary = true;
            }
        }
        KeyCode::Char('o') => {
            let link = app.selection.selected_item().and_then(|i| i.link().map(str::to_string));
            open_link(app, link.as_deref());
        }
        KeyCode::Char('s') => {
            if app.enter_settings() {
                spawn_config_load(app, event_tx);
            }
        }
        KeyCode::Char('?') => app.show_help = true,
        _ => {}
    }
    Ok(Action::Continue)
}

/// Handle input in the reader view.
async fn handle_reader_input(
    app: &mut App,
    key: KeyEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc | KeyCode::Char('b') | KeyCode::Char('q') | KeyCode::Backspace => {
            if app.exit_reader().await {
                spawn_query(app, event_tx);
            }
        }
        KeyCode::Char('n') | KeyCode::Right => {
            app.reader_next().await;
        }
        KeyCode::Char('d') if ctrl => {
            let page = app.reader_visible_lines.max(2) / 2;
            app.scroll_down(page);
            app.clamp_reader_scroll();
        }
        KeyCode::Char('u') if ctrl => {
            let page = app.reader_visible_lines.max(2) / 2;
            app.scroll_up(page);
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down(1);
            app.clamp_reader_scroll();
        }
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown | KeyCode::Char(' ') => {
            app.scroll_down(app.reader_visible_lines.max(1));
            app.clamp_reader_scroll();
        }
        KeyCode::PageUp => app.scroll_up(app.reader_visible_lines.max(1)),
        KeyCode::Char('o') => {
            let link = app
                .reader_item
                .as_ref()
                .and_then(|i| i.link().map(str::to_string));
            open_link(app, link.as_deref());
        }
        KeyCode::Char('?') => app.show_help = true,
        _ => {}
    }
    Ok(Action::Continue)
}

/// Handle input in the settings view.
fn handle_settings_input(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('b') => {
            app.view = View::Browse;
            if app.settings.is_dirty() {
                app.set_status("Unapplied configuration changes kept as draft");
            }
        }
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            let count = app.settings.current().map_or(0, |d| d.sources().len());
            if app.settings.selected_source + 1 < count {
                app.settings.selected_source += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.settings.selected_source = app.settings.selected_source.saturating_sub(1);
        }
        KeyCode::Char('a') => {
            if app.config.disable_add_source {
                app.set_status("Adding sources is disabled");
            } else if app.settings.current().is_none() {
                app.set_status("Configuration not loaded yet");
            } else {
                app.prompt = Some(Prompt::AddSourceName {
                    input: String::new(),
                });
            }
        }
        KeyCode::Char('e') => {
            if app.settings.current().is_some() {
                return Action::EditConfig;
            }
            app.set_status("Configuration not loaded yet");
        }
        KeyCode::Char('w') => {
            if app.settings.applying {
                app.set_status("Apply already in progress");
            } else if spawn_config_apply(app, event_tx) {
                app.set_status("Applying configuration...");
            } else {
                app.set_status("Nothing to apply");
            }
        }
        KeyCode::Char('u') => {
            if app.settings.draft.take().is_some() {
                app.set_status("Draft discarded");
            }
        }
        KeyCode::Char('r') => spawn_config_load(app, event_tx),
        KeyCode::Char('?') => app.show_help = true,
        _ => {}
    }
    Action::Continue
}

/// Handle input while a text prompt is open.
async fn handle_prompt_input(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(prompt) = app.prompt.as_mut() else {
        return;
    };

    match code {
        KeyCode::Esc => {
            app.prompt = None;
        }
        KeyCode::Backspace => {
            prompt_input(prompt).pop();
        }
        KeyCode::Char(c) => {
            prompt_input(prompt).push(c);
        }
        KeyCode::Enter => {
            let Some(prompt) = app.prompt.take() else {
                return;
            };
            submit_prompt(app, prompt, event_tx).await;
        }
        _ => {}
    }
}

fn prompt_input(prompt: &mut Prompt) -> &mut String {
    match prompt {
        Prompt::Search { input }
        | Prompt::AddSourceName { input }
        | Prompt::AddSourceUrl { input, .. } => input,
    }
}

async fn submit_prompt(app: &mut App, prompt: Prompt, event_tx: &mpsc::Sender<AppEvent>) {
    match prompt {
        Prompt::Search { input } => match app.set_search(&input) {
            Ok(()) => run_query(app, event_tx, false).await,
            Err(e) => {
                app.set_status(e);
                app.prompt = Some(Prompt::Search { input });
            }
        },
        Prompt::AddSourceName { input } => {
            let name = input.trim().to_string();
            if name.is_empty() {
                app.set_status("Source name must not be empty");
                app.prompt = Some(Prompt::AddSourceName { input });
            } else {
                app.prompt = Some(Prompt::AddSourceUrl {
                    name,
                    input: String::new(),
                });
            }
        }
        Prompt::AddSourceUrl { name, input } => match app.add_source(&name, input.trim()) {
            Ok(()) => app.set_status(format!("Added {}, press w to apply", name)),
            Err(e) => {
                app.set_status(e.to_string());
                app.prompt = Some(Prompt::AddSourceUrl { name, input });
            }
        },
    }
}

fn open_link(app: &mut App, link: Option<&str>) {
    let Some(url) = link else {
        app.set_status(ERR_ITEM_NO_LINK);
        return;
    };
    // Only http(s) links reach the system opener.
    match validate_url_for_open(url) {
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {}", e));
            }
        }
        Err(e) => app.set_status(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::QueryResponse;
    use crate::config::Config;
    use crate::model::{FeedItem, Labels};
    use crate::storage::Database;
    use pretty_assertions::assert_eq;

    async fn loaded_app() -> (App, mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
        let db = Database::open(":memory:").await.unwrap();
        let mut app = App::new(Config::default(), db).await.unwrap();
        let feeds = ["a", "b"]
            .iter()
            .map(|t| {
                FeedItem::new(
                    [("title", *t), ("source", "s")].into_iter().collect::<Labels>(),
                    "2024-05-01T10:00:00Z",
                )
            })
            .collect();
        let generation = app.begin_query();
        let key = app.params.cache_key();
        app.apply_query_result(
            generation,
            key,
            Ok(QueryResponse {
                summary: "**hi**".into(),
                feeds,
                count: 2,
            }),
        )
        .await;
        let (tx, rx) = mpsc::channel(8);
        (app, tx, rx)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_quit_from_browse() {
        let (mut app, tx, _rx) = loaded_app().await;
        let action = handle_input(&mut app, press(KeyCode::Char('q')), &tx).await.unwrap();
        assert!(matches!(action, Action::Quit));
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let (mut app, tx, _rx) = loaded_app().await;
        handle_input(&mut app, press(KeyCode::Char('?')), &tx).await.unwrap();
        assert!(app.show_help);
        let action = handle_input(&mut app, press(KeyCode::Char('j')), &tx).await.unwrap();
        assert!(matches!(action, Action::Continue));
        assert_eq!(app.selection.selected_item().map(FeedItem::title), Some("a"));
        handle_input(&mut app, press(KeyCode::Esc), &tx).await.unwrap();
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_search_disabled_by_config() {
        let (mut app, tx, _rx) = loaded_app().await;
        app.config.disable_search = true;
        handle_input(&mut app, press(KeyCode::Char('/')), &tx).await.unwrap();
        assert!(app.prompt.is_none());
    }

    #[tokio::test]
    async fn test_search_prompt_typing_and_cancel() {
        let (mut app, tx, _rx) = loaded_app().await;
        handle_input(&mut app, press(KeyCode::Char('/')), &tx).await.unwrap();
        for c in "rs".chars() {
            handle_input(&mut app, press(KeyCode::Char(c)), &tx).await.unwrap();
        }
        assert_eq!(
            app.prompt,
            Some(Prompt::Search {
                input: "rs".to_string()
            })
        );
        handle_input(&mut app, press(KeyCode::Esc), &tx).await.unwrap();
        assert!(app.prompt.is_none());
        assert!(app.params.query.is_empty());
    }

    #[tokio::test]
    async fn test_summary_toggle_renders_markdown() {
        let (mut app, tx, _rx) = loaded_app().await;
        handle_input(&mut app, press(KeyCode::Char('S')), &tx).await.unwrap();
        assert!(app.show_summary);
        assert!(!app.summary_lines.is_empty());
        handle_input(&mut app, press(KeyCode::Char('S')), &tx).await.unwrap();
        assert!(!app.show_summary);
    }

    #[tokio::test]
    async fn test_enter_then_back_round_trip() {
        let (mut app, tx, _rx) = loaded_app().await;
        handle_input(&mut app, press(KeyCode::Enter), &tx).await.unwrap();
        assert_eq!(app.view, View::Reader);
        handle_input(&mut app, press(KeyCode::Esc), &tx).await.unwrap();
        assert_eq!(app.view, View::Browse);
        assert_eq!(app.unread, 1);
    }

    #[tokio::test]
    async fn test_add_source_prompt_requires_loaded_config() {
        let (mut app, tx, _rx) = loaded_app().await;
        app.view = View::Settings;
        handle_input(&mut app, press(KeyCode::Char('a')), &tx).await.unwrap();
        assert!(app.prompt.is_none());

        let generation = app.begin_config_load();
        app.apply_config_loaded(generation, Ok(serde_json::json!({})));
        handle_input(&mut app, press(KeyCode::Char('a')), &tx).await.unwrap();
        for c in "hn".chars() {
            handle_input(&mut app, press(KeyCode::Char(c)), &tx).await.unwrap();
        }
        handle_input(&mut app, press(KeyCode::Enter), &tx).await.unwrap();
        assert!(matches!(app.prompt, Some(Prompt::AddSourceUrl { ref name, .. }) if name == "hn"));
    }
}
