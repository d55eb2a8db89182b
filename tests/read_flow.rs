//! Integration tests for the read-tracking flow across restarts.
//!
//! Uses a database file in a temp directory so a second `Database::open`
//! sees what the first process wrote, like a real restart.

use std::path::PathBuf;

use feedboard::config::Config;
use feedboard::grouping::{filter_read, group, unread_count};
use feedboard::model::{FeedItem, Labels};
use feedboard::preferences::PreferenceManager;
use feedboard::read_state::ReadStateStore;
use feedboard::selection::Selection;
use feedboard::session::SessionBridge;
use feedboard::storage::{keys, Database};
use pretty_assertions::assert_eq;

struct TempDb {
    dir: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "feedboard_read_flow_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    async fn open(&self) -> Database {
        let path = self.dir.join("feedboard.db");
        Database::open(path.to_str().unwrap()).await.unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn item(title: &str, source: &str, time: &str) -> FeedItem {
    FeedItem::new(
        [("title", title), ("source", source)]
            .into_iter()
            .collect::<Labels>(),
        time,
    )
}

fn items() -> Vec<FeedItem> {
    vec![
        item("a1", "alpha", "2024-05-01T12:00:00Z"),
        item("a2", "alpha", "2024-05-01T11:00:00Z"),
        item("b1", "beta", "2024-05-01T10:00:00Z"),
    ]
}

#[tokio::test]
async fn test_read_items_survive_restart() {
    let tmp = TempDb::new("restart");
    let feeds = items();

    {
        let db = tmp.open().await;
        let mut store = ReadStateStore::load(db.clone()).await.unwrap();
        assert!(store.mark_read(&feeds[0].identity()).await);
        assert!(store.mark_read(&feeds[2].identity()).await);
        db.close().await;
    }

    let db = tmp.open().await;
    let store = ReadStateStore::load(db.clone()).await.unwrap();
    let snapshot = store.snapshot();
    let is_read = |id: &str| snapshot.contains_key(id);

    assert_eq!(unread_count(&feeds, is_read), 1);
    let visible = filter_read(&group(&feeds, "source"), is_read);
    assert_eq!(visible.keys().collect::<Vec<_>>(), vec!["alpha"]);
    assert_eq!(visible["alpha"][0].title(), "a2");
    db.close().await;
}

#[tokio::test]
async fn test_group_preferences_survive_restart_but_session_does_not() {
    let tmp = TempDb::new("prefs");
    let config = Config::default();

    {
        let db = tmp.open().await;
        let mut prefs = PreferenceManager::load(&config, &db).await.unwrap();
        prefs.set_group_label(&db, "source").await.unwrap();
        prefs.set_active_group(&db, Some("beta")).await.unwrap();
        db.set_item(keys::NAV_CONTEXT, "{}").await.unwrap();
        db.close().await;
    }

    let db = tmp.open().await;
    let _session = SessionBridge::start(db.clone()).await;
    assert_eq!(db.get_item(keys::NAV_CONTEXT).await.unwrap(), None);

    let prefs = PreferenceManager::load(&config, &db).await.unwrap();
    assert_eq!(prefs.active_group(), Some("beta"));

    let feeds = items();
    let visible = filter_read(&group(&feeds, prefs.group_label()), |_| false);
    let mut selection = Selection::with_preferred_group(prefs.active_group().map(str::to_string));
    selection.reconcile(&visible, |_| false);
    assert_eq!(selection.active_group(), Some("beta"));
    assert_eq!(selection.selected_item().map(FeedItem::title), Some("b1"));
    db.close().await;
}

#[tokio::test]
async fn test_reading_whole_group_moves_selection_to_next_group() {
    let db = Database::open(":memory:").await.unwrap();
    let mut store = ReadStateStore::load(db.clone()).await.unwrap();
    let feeds = items();
    let grouping = group(&feeds, "source");

    let mut selection = Selection::new();
    selection.reconcile(&filter_read(&grouping, |_| false), |_| false);
    assert_eq!(selection.active_group(), Some("alpha"));

    let ids: Vec<String> = grouping["alpha"].iter().map(FeedItem::identity).collect();
    assert_eq!(store.mark_many_read(ids.iter().map(String::as_str)).await, 2);

    let snapshot = store.snapshot();
    let is_read = |id: &str| snapshot.contains_key(id);
    selection.reconcile(&filter_read(&grouping, is_read), is_read);
    assert_eq!(selection.active_group(), Some("beta"));
    assert_eq!(store.today_count(), 2);
}
