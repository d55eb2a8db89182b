//! Persisted read-state store.
//!
//! Holds the mapping `item_id -> read_at_ms` for every item the user has
//! marked read. The map is loaded once from `local_storage` and kept in memory;
//! every mutation builds a new map, swaps it in, persists the whole thing and
//! bumps a revision counter that views subscribe to.
//!
//! Persistence is best effort. A failed write is logged and the in-memory
//! state still changes, so the user never loses a mark-read because the disk
//! is full.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::sync::watch;

use crate::storage::{keys, Database};

/// Side effect fired once per committed mark-read call (terminal bell in the TUI).
pub type ReadCue = Box<dyn Fn() + Send + Sync>;

/// Immutable snapshot of the read state.
pub type ReadSnapshot = Arc<HashMap<String, i64>>;

/// Single-writer, many-reader read-state container.
///
/// The only mutators are [`mark_read`](Self::mark_read),
/// [`mark_many_read`](Self::mark_many_read) and [`reset`](Self::reset).
pub struct ReadStateStore {
    db: Database,
    records: ReadSnapshot,
    revision: watch::Sender<u64>,
    cue: Option<ReadCue>,
}

impl ReadStateStore {
    /// Load the persisted read state.
    ///
    /// A missing key yields an empty store. Corrupt data (bad JSON, wrong
    /// shape) is logged, the key is cleared, and the store starts empty.
    /// Only a failing database read is returned as an error.
    pub async fn load(db: Database) -> anyhow::Result<Self> {
        let records = match db.get_item(keys::READ_ITEMS).await? {
            None => HashMap::new(),
            Some(raw) => match decode(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored read state is corrupt, clearing it");
                    if let Err(e) = db.remove_item(keys::READ_ITEMS).await {
                        tracing::warn!(error = %e, "Failed to clear corrupt read state");
                    }
                    HashMap::new()
                }
            },
        };

        tracing::debug!(count = records.len(), "Loaded read state");
        let (revision, _) = watch::channel(0);
        Ok(Self {
            db,
            records: Arc::new(records),
            revision,
            cue: None,
        })
    }

    /// Install the side effect fired after a mark-read commits.
    pub fn with_cue(mut self, cue: ReadCue) -> Self {
        self.cue = Some(cue);
        self
    }

    /// Mark an item read. Returns `true` if it was not read before.
    ///
    /// Idempotent: an already-read id changes nothing and fires no cue.
    pub async fn mark_read(&mut self, item_id: &str) -> bool {
        self.mark_many_read(std::iter::once(item_id)).await == 1
    }

    /// Mark a batch of items read with a single swap, write and cue.
    /// Returns how many ids were newly recorded.
    pub async fn mark_many_read<'a, I>(&mut self, item_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now_ms = Utc::now().timestamp_millis();
        let mut next: Option<HashMap<String, i64>> = None;
        let mut added = 0;

        for id in item_ids {
            if self.records.contains_key(id) || next.as_ref().is_some_and(|m| m.contains_key(id))
            {
                continue;
            }
            next.get_or_insert_with(|| (*self.records).clone())
                .insert(id.to_string(), now_ms);
            added += 1;
        }

        let Some(next) = next else {
            return 0;
        };

        self.records = Arc::new(next);
        self.persist().await;
        if let Some(cue) = &self.cue {
            cue();
        }
        self.notify();
        tracing::debug!(added, total = self.records.len(), "Marked items read");
        added
    }

    pub fn is_read(&self, item_id: &str) -> bool {
        self.records.contains_key(item_id)
    }

    /// Read timestamp (epoch millis) for an item, if read.
    pub fn read_at(&self, item_id: &str) -> Option<i64> {
        self.records.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of items read since local midnight.
    pub fn today_count(&self) -> usize {
        self.count_on_day_of(Local::now())
    }

    /// Number of items read on the local calendar day containing `moment`.
    pub fn count_on_day_of<Tz: TimeZone>(&self, moment: DateTime<Tz>) -> usize {
        let tz = moment.timezone();
        let day = moment.date_naive();
        self.records
            .values()
            .filter(|&&ms| {
                tz.timestamp_millis_opt(ms)
                    .single()
                    .is_some_and(|t| t.date_naive() == day)
            })
            .count()
    }

    /// Current snapshot. Cheap to clone; never changes after it is handed out.
    pub fn snapshot(&self) -> ReadSnapshot {
        Arc::clone(&self.records)
    }

    /// Subscribe to change notifications. The value is a revision counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Drop all read records from memory and storage.
    pub async fn reset(&mut self) {
        self.records = Arc::new(HashMap::new());
        if let Err(e) = self.db.remove_item(keys::READ_ITEMS).await {
            tracing::warn!(error = %e, "Failed to clear persisted read state");
        }
        self.notify();
        tracing::info!("Read state reset");
    }

    async fn persist(&self) {
        let encoded = match encode(&self.records) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize read state");
                return;
            }
        };
        if let Err(e) = self.db.set_item(keys::READ_ITEMS, &encoded).await {
            tracing::warn!(error = %e, "Failed to persist read state (kept in memory)");
        }
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

/// Serialize as `[[id, ts], ...]`, oldest first.
fn encode(records: &HashMap<String, i64>) -> serde_json::Result<String> {
    let mut pairs: Vec<(&str, i64)> = records.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    pairs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    serde_json::to_string(&pairs)
}

fn decode(raw: &str) -> serde_json::Result<HashMap<String, i64>> {
    let pairs: Vec<(String, i64)> = serde_json::from_str(raw)?;
    Ok(pairs.into_iter().collect())
}
