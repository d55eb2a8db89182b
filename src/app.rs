use crate::api::{
    BackendClient, ConfigDocError, ConfigDocument, Lookback, QueryParams, QueryResponse,
};
use crate::config::Config;
use crate::grouping::{
    discover_groupable_labels, filter_read, group, resolve_group_label, unread_count, Grouping,
};
use crate::model::{FeedItem, LABEL_CONTENT, LABEL_SUMMARY, LABEL_SUMMARY_SNIPPET};
use crate::preferences::PreferenceManager;
use crate::read_state::{ReadCue, ReadStateStore};
use crate::selection::Selection;
use crate::session::{next_in_group, NavigationContext, QueryCache, SessionBridge};
use crate::storage::Database;
use crate::util::{display_width, html_to_text, strip_control_chars, MAX_QUERY_LENGTH};
use anyhow::{Context, Result};
use ratatui::text::Line;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::time::Instant;

/// Maximum scroll offset for the reader view (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

// ============================================================================
// View and Load State
// ============================================================================

/// Current view mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse,   // Group tabs + item list + preview
    Reader,   // Full-screen single item
    Settings, // Sources, notification routes, raw config
}

/// Progress of a network-backed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Error shown inline until the user retries.
    Failed(String),
}

/// Single-line text prompt shown over the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Search { input: String },
    AddSourceName { input: String },
    AddSourceUrl { name: String, input: String },
}

/// Events from background tasks
pub enum AppEvent {
    /// A `/query` request finished.
    ///
    /// `generation` is compared against `App::query_generation` so a slow
    /// response for an older query never overwrites a newer one.
    QueryLoaded {
        generation: u64,
        key: String,
        result: Result<QueryResponse, String>,
    },
    /// `/query_config` finished.
    ConfigLoaded {
        generation: u64,
        result: Result<serde_json::Value, String>,
    },
    /// `/apply_config` finished.
    ConfigApplied { result: Result<(), String> },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

/// Settings view state: the fetched configuration and a local draft.
#[derive(Debug, Default)]
pub struct SettingsState {
    pub load_state: LoadState,
    /// Configuration as last fetched or applied.
    pub remote: Option<ConfigDocument>,
    /// Local edits not yet applied.
    pub draft: Option<ConfigDocument>,
    pub selected_source: usize,
    pub applying: bool,
    /// Document sent by the pending `/apply_config` request.
    pub in_flight: Option<ConfigDocument>,
    pub load_generation: u64,
}

impl SettingsState {
    /// The document shown: the draft if there is one, else the remote copy.
    pub fn current(&self) -> Option<&ConfigDocument> {
        self.draft.as_ref().or(self.remote.as_ref())
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.is_some() && self.draft != self.remote
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub db: Database,
    pub client: BackendClient,
    pub config: Config,

    // Stores
    pub read_state: ReadStateStore,
    pub prefs: PreferenceManager,
    pub session: SessionBridge,
    pub query_cache: QueryCache,

    // Query
    pub params: QueryParams,
    pub load_state: LoadState,
    /// Current result set. Shared with the query cache.
    pub response: Arc<QueryResponse>,
    /// Generation counter for query results (see `AppEvent::QueryLoaded`).
    pub query_generation: u64,
    pub query_handle: Option<tokio::task::JoinHandle<()>>,

    // Derived views, rebuilt by `sync_views`
    /// Label actually used for grouping (the preference, or the default when
    /// the preference is not groupable in the current result set).
    pub group_label: String,
    pub group_labels: Vec<String>,
    pub groups: Grouping,
    pub visible: Grouping,
    pub unread: usize,
    pub selection: Selection,

    // UI State
    pub view: View,
    pub prompt: Option<Prompt>,
    pub show_summary: bool,
    pub show_help: bool,
    pub summary_lines: Vec<Line<'static>>,
    /// Item shown in the reader.
    pub reader_item: Option<FeedItem>,
    /// Plain-text body of `reader_item`, one entry per paragraph line.
    pub reader_text: Vec<String>,
    pub scroll_offset: usize,
    pub reader_visible_lines: usize,
    pub reader_viewport_width: usize,
    /// Navigation context waiting for a fetched result set before the list
    /// position can be restored.
    pub pending_restore: Option<NavigationContext>,
    pub settings: SettingsState,

    // Status message with expiry
    pub status_message: Option<(Cow<'static, str>, Instant)>,

    /// Dirty flag to skip unnecessary frame renders
    pub needs_redraw: bool,
}

impl App {
    pub async fn new(config: Config, db: Database) -> Result<Self> {
        let client = BackendClient::new(&config.backend_url, config.request_timeout())
            .context("Failed to create backend client")?;

        let mut read_state = ReadStateStore::load(db.clone()).await?;
        if config.read_cue {
            read_state = read_state.with_cue(terminal_bell());
        }

        let prefs = match PreferenceManager::load(&config, &db).await {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load preferences, using config defaults");
                PreferenceManager::from_config(&config)
            }
        };
        let session = SessionBridge::start(db.clone()).await;
        let selection = Selection::with_preferred_group(prefs.active_group().map(str::to_string));

        let params = QueryParams {
            lookback: Lookback::from_hours(u64::from(config.lookback_hours)),
            query: String::new(),
            limit: config.query_limit,
            summarize: config.summarize,
        };

        Ok(Self {
            db,
            client,
            read_state,
            session,
            query_cache: QueryCache::default(),
            params,
            load_state: LoadState::Idle,
            response: Arc::new(QueryResponse::default()),
            query_generation: 0,
            query_handle: None,
            group_label: prefs.group_label().to_string(),
            group_labels: Vec::new(),
            groups: Grouping::new(),
            visible: Grouping::new(),
            unread: 0,
            selection,
            prefs,
            config,
            view: View::Browse,
            prompt: None,
            show_summary: false,
            show_help: false,
            summary_lines: Vec::new(),
            reader_item: None,
            reader_text: Vec::new(),
            scroll_offset: 0,
            reader_visible_lines: 0,
            reader_viewport_width: 0,
            pending_restore: None,
            settings: SettingsState::default(),
            status_message: None,
            needs_redraw: true,
        })
    }

    // ========================================================================
    // Derived Views
    // ========================================================================

    pub fn is_read(&self, item_id: &str) -> bool {
        self.read_state.is_read(item_id)
    }

    /// Rebuild groupings, unread count and selection from the current result
    /// set and read state.
    pub async fn sync_views(&mut self) {
        let snapshot = self.read_state.snapshot();
        let is_read = |id: &str| snapshot.contains_key(id);
        let default_label = self.prefs.default_group_label().to_string();

        self.group_labels = discover_groupable_labels(&self.response.feeds, &default_label);
        let label = resolve_group_label(self.prefs.group_label(), &self.group_labels, &default_label);
        if label != self.group_label {
            tracing::debug!(from = %self.group_label, to = %label, "Grouping label changed");
            self.group_label = label;
        }

        self.groups = group(&self.response.feeds, &self.group_label);
        self.visible = filter_read(&self.groups, is_read);
        self.unread = unread_count(&self.response.feeds, is_read);
        self.selection.reconcile(&self.visible, is_read);
        self.persist_active_group().await;
        self.needs_redraw = true;
    }

    /// Items of the active group that are still unread.
    pub fn active_items(&self) -> &[FeedItem] {
        self.selection
            .active_group()
            .and_then(|g| self.visible.get(g))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    async fn persist_active_group(&mut self) {
        let Some(active) = self.selection.active_group().map(str::to_string) else {
            return;
        };
        if let Err(e) = self.prefs.set_active_group(&self.db, Some(&active)).await {
            tracing::warn!(error = %e, "Failed to persist active group");
        }
    }

    // ========================================================================
    // Query Results
    // ========================================================================

    /// Start a new query generation. Returns the generation to tag the
    /// result with.
    pub fn begin_query(&mut self) -> u64 {
        if let Some(handle) = self.query_handle.take() {
            handle.abort();
            tracing::debug!("Aborted previous query task");
        }
        self.query_generation = self.query_generation.wrapping_add(1);
        self.load_state = LoadState::Loading;
        self.needs_redraw = true;
        self.query_generation
    }

    /// Reuse a cached result for the current parameters, if there is one.
    pub async fn try_cached_query(&mut self) -> bool {
        let key = self.params.cache_key();
        let Some(response) = self.query_cache.get(&key) else {
            return false;
        };
        tracing::debug!(key = %key, "Reusing cached query result");
        self.show_response(response).await;
        true
    }

    /// Apply a finished query. Stale generations are dropped.
    pub async fn apply_query_result(
        &mut self,
        generation: u64,
        key: String,
        result: Result<QueryResponse, String>,
    ) {
        if generation != self.query_generation {
            tracing::debug!(
                generation,
                current = self.query_generation,
                "Dropping stale query result"
            );
            return;
        }
        self.query_handle = None;

        match result {
            Ok(response) => {
                tracing::info!(items = response.feeds.len(), count = response.count, "Query loaded");
                let response = Arc::new(response);
                self.query_cache.insert(key, Arc::clone(&response));
                self.show_response(response).await;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Query failed");
                self.load_state = LoadState::Failed(error);
                self.pending_restore = None;
                self.needs_redraw = true;
            }
        }
    }

    async fn show_response(&mut self, response: Arc<QueryResponse>) {
        self.response = response;
        self.load_state = LoadState::Loaded;
        self.summary_lines.clear();
        self.sync_views().await;
        if let Some(ctx) = self.pending_restore.take() {
            self.restore_position(&ctx).await;
        }
    }

    /// Cycle the lookback window. The caller runs the new query.
    pub fn cycle_lookback(&mut self) -> Lookback {
        self.params.lookback = self.params.lookback.next();
        self.params.lookback
    }

    /// Set the free-text query. The caller runs the new query.
    pub fn set_search(&mut self, query: &str) -> Result<(), String> {
        let query = query.trim();
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(format!("Search query too long (max {} chars)", MAX_QUERY_LENGTH));
        }
        self.params.query = query.to_string();
        Ok(())
    }

    /// Drop the cached result for the current parameters (explicit refresh).
    pub fn invalidate_current_query(&mut self) {
        self.query_cache.invalidate(&self.params.cache_key());
    }

    // ========================================================================
    // Grouping and Selection
    // ========================================================================

    /// Switch to the next groupable label and remember it.
    pub async fn cycle_group_label(&mut self) -> Option<String> {
        if self.group_labels.len() < 2 {
            return None;
        }
        let idx = self
            .group_labels
            .iter()
            .position(|l| *l == self.group_label)
            .map_or(0, |i| (i + 1) % self.group_labels.len());
        let next = self.group_labels[idx].clone();
        if let Err(e) = self.prefs.set_group_label(&self.db, &next).await {
            tracing::warn!(error = %e, "Failed to persist grouping label");
        }
        self.sync_views().await;
        Some(next)
    }

    pub async fn cycle_group(&mut self, forward: bool) {
        self.selection.cycle_group(&self.visible, forward);
        self.persist_active_group().await;
        self.needs_redraw = true;
    }

    pub fn step_item(&mut self, forward: bool) {
        self.selection.step_item(&self.visible, forward);
        self.needs_redraw = true;
    }

    /// Mark the selected item read. Views follow via the read-state
    /// subscription.
    pub async fn mark_selected_read(&mut self) -> bool {
        let Some(id) = self.selection.selected_item().map(FeedItem::identity) else {
            return false;
        };
        self.read_state.mark_read(&id).await
    }

    /// Mark every unread item of the active group read.
    pub async fn mark_group_read(&mut self) -> usize {
        let ids: Vec<String> = self.active_items().iter().map(FeedItem::identity).collect();
        self.read_state
            .mark_many_read(ids.iter().map(String::as_str))
            .await
    }

    pub async fn reset_read(&mut self) {
        self.read_state.reset().await;
        self.sync_views().await;
    }

    // ========================================================================
    // Reader
    // ========================================================================

    /// Open the selected item in the reader, snapshotting the list context.
    pub async fn open_selected(&mut self) -> bool {
        let Some(item) = self.selection.selected_item().cloned() else {
            return false;
        };
        let Some(group_name) = self.selection.active_group().map(str::to_string) else {
            return false;
        };
        let ctx = NavigationContext {
            item_id: item.identity(),
            group_label: self.group_label.clone(),
            group_name,
            scroll_offset: self.selection.selected_index(&self.visible).unwrap_or(0),
            query_key: self.params.cache_key(),
        };
        self.session.enter_detail(ctx).await;
        self.show_in_reader(item.with_identity());
        true
    }

    /// "Next item": mark the current item read and move to the next unread
    /// item of the same group without refetching.
    pub async fn reader_next(&mut self) -> bool {
        let Some(ctx) = self.session.context().cloned() else {
            return false;
        };
        self.read_state.mark_read(&ctx.item_id).await;

        let snapshot = self.read_state.snapshot();
        match next_in_group(&self.response.feeds, &ctx, |id| snapshot.contains_key(id)) {
            Some(item) => {
                self.session.advance(item.identity()).await;
                self.show_in_reader(item.with_identity());
                true
            }
            None => {
                self.set_status("No more unread items in this group");
                false
            }
        }
    }

    /// Leave the reader. Applies the deferred mark-read and restores the
    /// list position. Returns `true` when the result set is no longer cached
    /// and must be fetched again before the position can be restored.
    pub async fn exit_reader(&mut self) -> bool {
        self.view = View::Browse;
        self.reader_item = None;
        self.reader_text.clear();
        self.scroll_offset = 0;
        self.needs_redraw = true;

        let Some(ctx) = self.session.take_return().await else {
            return false;
        };
        self.read_state.mark_read(&ctx.item_id).await;

        match self.query_cache.get(&ctx.query_key) {
            Some(response) => {
                self.response = response;
                self.sync_views().await;
                self.restore_position(&ctx).await;
                false
            }
            None => {
                self.pending_restore = Some(ctx);
                true
            }
        }
    }

    async fn restore_position(&mut self, ctx: &NavigationContext) {
        if !self.visible.contains_key(&ctx.group_name) {
            return;
        }
        if self.selection.active_group() != Some(ctx.group_name.as_str()) {
            self.selection.select_group(&self.visible, &ctx.group_name);
            self.persist_active_group().await;
        }
        self.selection.select_index(&self.visible, ctx.scroll_offset);
    }

    fn show_in_reader(&mut self, item: FeedItem) {
        let body = [LABEL_CONTENT, LABEL_SUMMARY_SNIPPET, LABEL_SUMMARY]
            .iter()
            .find_map(|key| item.labels.get(key).filter(|v| !v.trim().is_empty()))
            .map(|html| html_to_text(&strip_control_chars(html)))
            .unwrap_or_default();
        self.reader_text = body.lines().map(str::to_string).collect();
        self.reader_item = Some(item);
        self.view = View::Reader;
        self.scroll_offset = 0;
        self.needs_redraw = true;
    }

    /// Scroll up in reader view
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Scroll down in reader view
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    /// Display lines of the reader body after wrapping, plus the header.
    pub fn reader_content_lines(&self) -> usize {
        const HEADER_LINES: usize = 3; // Title, source/time, blank line
        let width = self.reader_viewport_width.max(1);
        let body: usize = self
            .reader_text
            .iter()
            .map(|line| display_width(line).max(1).div_ceil(width))
            .sum();
        HEADER_LINES + body.max(1)
    }

    /// Clamp scroll offset to content bounds using the last rendered viewport.
    pub fn clamp_reader_scroll(&mut self) {
        let max_scroll = self
            .reader_content_lines()
            .saturating_sub(self.reader_visible_lines);
        self.scroll_offset = self.scroll_offset.min(max_scroll).min(MAX_SCROLL);
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Switch to settings. Returns `true` when the configuration needs loading.
    pub fn enter_settings(&mut self) -> bool {
        self.view = View::Settings;
        self.needs_redraw = true;
        self.settings.remote.is_none() && self.settings.load_state != LoadState::Loading
    }

    pub fn begin_config_load(&mut self) -> u64 {
        self.settings.load_generation = self.settings.load_generation.wrapping_add(1);
        self.settings.load_state = LoadState::Loading;
        self.settings.load_generation
    }

    pub fn apply_config_loaded(&mut self, generation: u64, result: Result<serde_json::Value, String>) {
        if generation != self.settings.load_generation {
            return;
        }
        match result.and_then(|v| ConfigDocument::from_json(v).map_err(|e| e.to_string())) {
            Ok(doc) => {
                self.settings.remote = Some(doc);
                self.settings.draft = None;
                self.settings.selected_source = 0;
                self.settings.load_state = LoadState::Loaded;
            }
            Err(error) => {
                tracing::warn!(error = %error, "Loading configuration failed");
                self.settings.load_state = LoadState::Failed(error);
            }
        }
        self.needs_redraw = true;
    }

    /// Add an RSS source to the draft.
    pub fn add_source(&mut self, name: &str, url: &str) -> Result<(), ConfigDocError> {
        let mut draft = self
            .settings
            .current()
            .cloned()
            .ok_or(ConfigDocError::NotAMapping)?;
        draft.add_rss_source(name, url)?;
        self.settings.draft = Some(draft);
        Ok(())
    }

    /// YAML text of the current document for the external editor.
    pub fn draft_yaml(&self) -> Result<String, ConfigDocError> {
        match self.settings.current() {
            Some(doc) => doc.to_yaml(),
            None => Ok(String::new()),
        }
    }

    /// Replace the draft with edited YAML. Invalid YAML leaves the draft and
    /// the remote configuration untouched.
    pub fn replace_draft_from_yaml(&mut self, text: &str) -> Result<(), ConfigDocError> {
        let doc = ConfigDocument::parse_yaml(text)?;
        self.settings.draft = Some(doc);
        Ok(())
    }

    /// Document to send to `/apply_config`, if there are pending edits.
    pub fn begin_apply(&mut self) -> Option<serde_json::Value> {
        if self.settings.applying || !self.settings.is_dirty() {
            return None;
        }
        let sent = self.settings.draft.clone()?;
        let body = sent.as_json().clone();
        self.settings.applying = true;
        self.settings.in_flight = Some(sent);
        Some(body)
    }

    pub fn apply_config_applied(&mut self, result: Result<(), String>) {
        self.settings.applying = false;
        let sent = self.settings.in_flight.take();
        match result {
            Ok(()) => {
                // Edits made while the request was pending stay in the draft.
                if self.settings.draft == sent {
                    self.settings.draft = None;
                }
                if sent.is_some() {
                    self.settings.remote = sent;
                }
                // Sources may have changed; cached results are stale.
                self.query_cache.clear();
                self.set_status("Configuration applied");
            }
            Err(error) => {
                tracing::warn!(error = %error, "Applying configuration failed");
                self.set_status(format!("Apply failed: {}", error));
            }
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

/// Audible mark-read cue: a terminal bell.
fn terminal_bell() -> ReadCue {
    Box::new(|| {
        use std::io::Write;
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    })
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// Abort in-flight query tasks when the App goes away.
impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.query_handle.take() {
            handle.abort();
            tracing::debug!("Aborted query task on App drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Labels;
    use crate::storage::keys;
    use pretty_assertions::assert_eq;
    use tokio::time::{self, Duration};

    async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        App::new(Config::default(), db).await.unwrap()
    }

    fn item(title: &str, source: &str, time: &str) -> FeedItem {
        FeedItem::new(
            [("title", title), ("source", source), ("content", "<p>body</p>")]
                .into_iter()
                .collect::<Labels>(),
            time,
        )
    }

    fn response() -> QueryResponse {
        QueryResponse {
            summary: "# Today".into(),
            feeds: vec![
                item("x1", "x", "2024-05-01T12:00:00Z"),
                item("x2", "x", "2024-05-01T11:00:00Z"),
                item("x3", "x", "2024-05-01T10:00:00Z"),
                item("y1", "y", "2024-05-01T12:30:00Z"),
            ],
            count: 4,
        }
    }

    async fn loaded_app() -> App {
        let mut app = test_app().await;
        let generation = app.begin_query();
        let key = app.params.cache_key();
        app.apply_query_result(generation, key, Ok(response())).await;
        app
    }

    fn selected_title(app: &App) -> Option<String> {
        app.selection.selected_item().map(|i| i.title().to_string())
    }

    #[tokio::test]
    async fn test_query_result_builds_views() {
        let app = loaded_app().await;
        assert_eq!(app.load_state, LoadState::Loaded);
        assert_eq!(app.unread, 4);
        assert_eq!(app.visible.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(app.selection.active_group(), Some("x"));
        assert_eq!(selected_title(&app).as_deref(), Some("x1"));
        assert_eq!(app.prefs.active_group(), Some("x"));
    }

    #[tokio::test]
    async fn test_stale_query_result_dropped() {
        let mut app = test_app().await;
        let old = app.begin_query();
        let _new = app.begin_query();
        app.apply_query_result(old, "k".into(), Ok(response())).await;
        assert_eq!(app.load_state, LoadState::Loading);
        assert!(app.response.feeds.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_sets_inline_error() {
        let mut app = test_app().await;
        let generation = app.begin_query();
        app.apply_query_result(generation, "k".into(), Err("Backend unreachable".into()))
            .await;
        assert_eq!(app.load_state, LoadState::Failed("Backend unreachable".into()));
    }

    #[tokio::test]
    async fn test_mark_selected_read_advances_after_sync() {
        let mut app = loaded_app().await;
        assert!(app.mark_selected_read().await);
        app.sync_views().await;
        assert_eq!(selected_title(&app).as_deref(), Some("x2"));
        assert_eq!(app.unread, 3);
    }

    #[tokio::test]
    async fn test_mark_group_read_falls_back_to_next_group() {
        let mut app = loaded_app().await;
        assert_eq!(app.mark_group_read().await, 3);
        app.sync_views().await;
        assert_eq!(app.selection.active_group(), Some("y"));
        assert_eq!(selected_title(&app).as_deref(), Some("y1"));
    }

    #[tokio::test]
    async fn test_reader_round_trip_marks_read_and_restores_position() {
        let mut app = loaded_app().await;
        app.step_item(true);
        assert_eq!(selected_title(&app).as_deref(), Some("x2"));

        assert!(app.open_selected().await);
        assert_eq!(app.view, View::Reader);
        assert_eq!(app.reader_text, vec!["body".to_string()]);
        // Deferred: not read while the reader is open.
        let x2 = app.reader_item.as_ref().unwrap().identity();
        assert!(!app.is_read(&x2));

        assert!(!app.exit_reader().await);
        assert_eq!(app.view, View::Browse);
        assert!(app.is_read(&x2));
        // Same index in the rebuilt list is now x3.
        assert_eq!(selected_title(&app).as_deref(), Some("x3"));
    }

    #[tokio::test]
    async fn test_reader_next_marks_current_and_walks_group() {
        let mut app = loaded_app().await;
        app.open_selected().await;

        assert!(app.reader_next().await);
        assert_eq!(app.reader_item.as_ref().map(FeedItem::title), Some("x2"));
        assert!(app.reader_next().await);
        assert_eq!(app.reader_item.as_ref().map(FeedItem::title), Some("x3"));
        assert!(!app.reader_next().await);

        app.exit_reader().await;
        assert_eq!(app.selection.active_group(), Some("y"));
        assert_eq!(app.unread, 1);
    }

    #[tokio::test]
    async fn test_exit_reader_without_cache_requests_fetch() {
        let mut app = loaded_app().await;
        app.open_selected().await;
        app.query_cache.clear();

        assert!(app.exit_reader().await);
        let pending = app.pending_restore.clone().unwrap();
        assert_eq!(pending.group_name, "x");

        let generation = app.begin_query();
        let key = app.params.cache_key();
        app.apply_query_result(generation, key, Ok(response())).await;
        assert!(app.pending_restore.is_none());
        assert_eq!(selected_title(&app).as_deref(), Some("x2"));
    }

    #[tokio::test]
    async fn test_cached_query_reused() {
        let mut app = loaded_app().await;
        app.cycle_lookback();
        assert!(!app.try_cached_query().await);
        for _ in 0..3 {
            app.cycle_lookback();
        }
        assert!(app.try_cached_query().await);
    }

    #[tokio::test]
    async fn test_search_length_limit() {
        let mut app = test_app().await;
        assert!(app.set_search(&"a".repeat(MAX_QUERY_LENGTH + 1)).is_err());
        assert!(app.set_search("  rust  ").is_ok());
        assert_eq!(app.params.query, "rust");
    }

    #[tokio::test]
    async fn test_preferred_group_restored_from_previous_run() {
        let db = Database::open(":memory:").await.unwrap();
        db.set_item(keys::ACTIVE_GROUP, "y").await.unwrap();
        let mut app = App::new(Config::default(), db).await.unwrap();
        let generation = app.begin_query();
        app.apply_query_result(generation, "k".into(), Ok(response()))
            .await;
        assert_eq!(app.selection.active_group(), Some("y"));
    }

    #[tokio::test]
    async fn test_invalid_yaml_keeps_draft() {
        let mut app = test_app().await;
        let generation = app.begin_config_load();
        app.apply_config_loaded(generation, Ok(serde_json::json!({"scrape": {"sources": []}})));
        assert!(app.add_source("hn", "https://news.ycombinator.com/rss").is_ok());
        assert!(app.settings.is_dirty());

        let before = app.settings.draft.clone();
        assert!(app.replace_draft_from_yaml("scrape: [unclosed").is_err());
        assert_eq!(app.settings.draft, before);

        let body = app.begin_apply().unwrap();
        assert_eq!(body["scrape"]["sources"][0]["name"], "hn");
        assert!(app.begin_apply().is_none());
        app.apply_config_applied(Ok(()));
        assert!(!app.settings.is_dirty());
    }

    #[tokio::test]
    async fn test_edits_during_apply_stay_pending() {
        let mut app = test_app().await;
        let generation = app.begin_config_load();
        app.apply_config_loaded(generation, Ok(serde_json::json!({"scrape": {"sources": []}})));
        app.add_source("hn", "https://news.ycombinator.com/rss").unwrap();

        let body = app.begin_apply().unwrap();
        assert_eq!(body["scrape"]["sources"].as_array().map(Vec::len), Some(1));

        app.add_source("lobsters", "https://lobste.rs/rss").unwrap();
        app.apply_config_applied(Ok(()));

        assert!(app.settings.is_dirty());
        let remote = app.settings.remote.as_ref().unwrap();
        assert_eq!(remote.as_json()["scrape"]["sources"], body["scrape"]["sources"]);
        let draft = app.settings.draft.as_ref().unwrap();
        assert_eq!(draft.as_json()["scrape"]["sources"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_failed_apply_keeps_remote() {
        let mut app = test_app().await;
        let generation = app.begin_config_load();
        app.apply_config_loaded(generation, Ok(serde_json::json!({"scrape": {"sources": []}})));
        app.add_source("hn", "https://news.ycombinator.com/rss").unwrap();

        assert!(app.begin_apply().is_some());
        app.apply_config_applied(Err("invalid route".into()));

        assert!(app.settings.is_dirty());
        assert!(app.settings.in_flight.is_none());
        let remote = app.settings.remote.as_ref().unwrap();
        assert_eq!(remote.as_json()["scrape"]["sources"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        // Build the app before pausing time; the pool's acquire timeout
        // would otherwise fire while the clock auto-advances.
        let mut app = test_app().await;
        time::pause();
        app.set_status("Test message");
        assert!(!app.clear_expired_status());
        time::advance(Duration::from_secs(3)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_clamp_reader_scroll() {
        let mut app = test_app().await;
        app.reader_text = vec!["x".repeat(100)];
        app.reader_viewport_width = 50;
        app.reader_visible_lines = 3;
        app.scroll_down(100);
        app.clamp_reader_scroll();
        // 3 header + 2 wrapped body lines, 3 visible
        assert_eq!(app.scroll_offset, 2);
    }
}
