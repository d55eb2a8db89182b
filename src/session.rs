//! List <-> reader navigation bridge.
//!
//! Opening an item snapshots where the user was (group label, group, list
//! position, item id, query) into session storage. The reader uses it to walk
//! "next item" through the same ordering without refetching; returning to the
//! list applies the deferred mark-read and restores the list position once
//! the list has been rebuilt, preferably from the cached result set.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::api::QueryResponse;
use crate::grouping::items_in_group;
use crate::model::FeedItem;
use crate::storage::{keys, Database};

/// Result sets kept per session. Small: each holds up to `limit` items.
const QUERY_CACHE_CAPACITY: usize = 8;

/// Where the user was when they opened an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationContext {
    /// Identity of the item currently shown in the reader.
    pub item_id: String,
    pub group_label: String,
    pub group_name: String,
    /// Index of the opened item within its group's list.
    pub scroll_offset: usize,
    /// Cache key of the query that produced the list.
    pub query_key: String,
}

// ============================================================================
// Query Cache
// ============================================================================

/// Session-scoped LRU of query results keyed by `QueryParams::cache_key`.
pub struct QueryCache {
    entries: LruCache<String, Arc<QueryResponse>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QUERY_CACHE_CAPACITY)
    }
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Arc<QueryResponse>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, response: Arc<QueryResponse>) {
        self.entries.put(key, response);
    }

    /// Drop one entry (explicit refresh).
    pub fn invalidate(&mut self, key: &str) {
        self.entries.pop(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Session Bridge
// ============================================================================

/// Holds the navigation context while the reader is open.
pub struct SessionBridge {
    db: Database,
    current: Option<NavigationContext>,
}

impl SessionBridge {
    /// Start a new session, discarding `session.*` keys from earlier runs.
    pub async fn start(db: Database) -> Self {
        match db.remove_prefix(keys::SESSION_PREFIX).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(removed = n, "Cleared stale session keys"),
            Err(e) => tracing::warn!(error = %e, "Failed to clear stale session keys"),
        }
        Self { db, current: None }
    }

    pub fn context(&self) -> Option<&NavigationContext> {
        self.current.as_ref()
    }

    /// Snapshot the list context before the reader opens.
    pub async fn enter_detail(&mut self, ctx: NavigationContext) {
        tracing::debug!(item = %ctx.item_id, group = %ctx.group_name, "Entering reader");
        self.save(&ctx).await;
        self.current = Some(ctx);
    }

    /// The reader moved on to another item in the same group.
    pub async fn advance(&mut self, item_id: String) {
        let Some(mut ctx) = self.current.take() else {
            return;
        };
        ctx.item_id = item_id;
        self.save(&ctx).await;
        self.current = Some(ctx);
    }

    /// Leave the reader: returns the context to apply to the list and clears
    /// the session keys.
    pub async fn take_return(&mut self) -> Option<NavigationContext> {
        let ctx = self.current.take()?;
        for key in [keys::NAV_CONTEXT, keys::SCROLL] {
            if let Err(e) = self.db.remove_item(key).await {
                tracing::warn!(key, error = %e, "Failed to clear session key");
            }
        }
        Some(ctx)
    }

    /// Context persisted by this session, if any. Corrupt data is cleared.
    pub async fn load_persisted(&self) -> Option<NavigationContext> {
        let raw = match self.db.get_item(keys::NAV_CONTEXT).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read navigation context");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                tracing::warn!(error = %e, "Stored navigation context is corrupt, clearing it");
                let _ = self.db.remove_item(keys::NAV_CONTEXT).await;
                None
            }
        }
    }

    async fn save(&self, ctx: &NavigationContext) {
        let encoded = match serde_json::to_string(ctx) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize navigation context");
                return;
            }
        };
        if let Err(e) = self.db.set_item(keys::NAV_CONTEXT, &encoded).await {
            tracing::warn!(error = %e, "Failed to persist navigation context");
        }
        if let Err(e) = self
            .db
            .set_item(keys::SCROLL, &ctx.scroll_offset.to_string())
            .await
        {
            tracing::warn!(error = %e, "Failed to persist scroll offset");
        }
    }
}

/// The item after `ctx.item_id` in its group, skipping read items.
///
/// Rebuilds the group ordering from the flat result set, so it works from a
/// cached response without a refetch. If the current item is no longer in
/// the group the first unread item is returned.
pub fn next_in_group<F>(items: &[FeedItem], ctx: &NavigationContext, is_read: F) -> Option<FeedItem>
where
    F: Fn(&str) -> bool,
{
    let group = items_in_group(items, &ctx.group_label, &ctx.group_name);
    let start = group
        .iter()
        .position(|item| item.identity() == ctx.item_id)
        .map_or(0, |i| i + 1);

    group
        .into_iter()
        .skip(start)
        .find(|item| item.identity() != ctx.item_id && !is_read(&item.identity()))
}
