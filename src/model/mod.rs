//! Feed item data model.
//!
//! A [`FeedItem`] is what the backend's `/query` endpoint returns: a bag of
//! string labels plus an ISO-8601 timestamp. Items are immutable once
//! deserialized; identity is derived from the labels (see [`identity`]) and
//! ordering is defined in [`ordering`].

pub mod identity;
pub mod ordering;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use identity::{djb2, item_identity};
pub use ordering::{compare_items, sort_items};

/// Label holding the item's headline.
pub const LABEL_TITLE: &str = "title";
/// Label holding the item's canonical URL.
pub const LABEL_LINK: &str = "link";
/// Label naming the source the item was scraped from.
pub const LABEL_SOURCE: &str = "source";
/// Label holding a short HTML excerpt of the content.
pub const LABEL_SUMMARY_SNIPPET: &str = "summary_html_snippet";
/// Label holding the full content (often Markdown).
pub const LABEL_CONTENT: &str = "content";
/// Label holding the backend-generated summary.
pub const LABEL_SUMMARY: &str = "summary";

// ============================================================================
// Labels
// ============================================================================

/// String-to-string label dictionary attached to every item.
///
/// The backend occasionally emits non-string JSON scalars as label values;
/// those are stringified on the way in. `null` values are hidden from
/// lookups, so the rest of the crate only ever sees `String -> String`, but
/// are remembered for identity hashing and serialization.
///
/// Keys are kept sorted (`BTreeMap`), which makes identity hashing
/// independent of the order the backend serialized them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, serde_json::Value>",
    into = "BTreeMap<String, serde_json::Value>"
)]
pub struct Labels {
    values: BTreeMap<String, String>,
    nulls: BTreeSet<String>,
}

impl From<BTreeMap<String, serde_json::Value>> for Labels {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        let mut labels = Self::default();
        for (key, value) in raw {
            match value {
                serde_json::Value::Null => {
                    labels.nulls.insert(key);
                }
                serde_json::Value::String(s) => {
                    labels.values.insert(key, s);
                }
                other => {
                    labels.values.insert(key, other.to_string());
                }
            }
        }
        labels
    }
}

impl From<Labels> for BTreeMap<String, serde_json::Value> {
    fn from(labels: Labels) -> Self {
        labels
            .values
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .chain(labels.nulls.into_iter().map(|k| (k, serde_json::Value::Null)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            nulls: BTreeSet::new(),
        }
    }
}

impl Labels {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Label value, or `default` when the label is absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate `(key, value)` pairs in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every pair in key order, with `null` labels rendered as `"null"`.
    pub(crate) fn identity_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.iter()
            .chain(self.nulls.iter().map(|k| (k.as_str(), "null")))
            .collect::<BTreeMap<_, _>>()
            .into_iter()
    }
}

// ============================================================================
// FeedItem
// ============================================================================

/// One aggregated content entry returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub labels: Labels,
    /// ISO-8601 timestamp as sent by the backend. Parsed lazily because a
    /// malformed value must not prevent the item from being displayed.
    pub time: String,
    /// Precomputed identifier. Set when an item is handed from the reader
    /// back into list context; backend items never carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl FeedItem {
    pub fn new(labels: Labels, time: impl Into<String>) -> Self {
        Self {
            labels,
            time: time.into(),
            id: None,
        }
    }

    /// Stable identifier used as the read-tracking key.
    pub fn identity(&self) -> String {
        item_identity(self)
    }

    /// Copy of this item carrying its identity precomputed.
    pub fn with_identity(&self) -> Self {
        let mut item = self.clone();
        item.id = Some(self.identity());
        item
    }

    pub fn title(&self) -> &str {
        self.labels.get_or(LABEL_TITLE, "")
    }

    pub fn link(&self) -> Option<&str> {
        self.labels.get(LABEL_LINK)
    }

    pub fn source(&self) -> Option<&str> {
        self.labels.get(LABEL_SOURCE)
    }

    pub fn summary_snippet(&self) -> Option<&str> {
        self.labels.get(LABEL_SUMMARY_SNIPPET)
    }

    /// Parsed timestamp, or `None` when the backend sent something that is not RFC 3339.
    pub fn parsed_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.time.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_stringify_scalars_and_hide_nulls() {
        let item: FeedItem = serde_json::from_str(
            r#"{"labels":{"title":"Hello","score":7,"flag":true,"gone":null},"time":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(item.labels.get("title"), Some("Hello"));
        assert_eq!(item.labels.get("score"), Some("7"));
        assert_eq!(item.labels.get("flag"), Some("true"));
        assert!(!item.labels.contains("gone"));
        assert_eq!(item.labels.len(), 3);
        assert_eq!(item.id, None);

        let back = serde_json::to_value(&item.labels).unwrap();
        assert_eq!(back["gone"], serde_json::Value::Null);
        assert_eq!(back["score"], "7");
    }

    #[test]
    fn test_get_or_placeholder() {
        let labels: Labels = [("title", "A")].into_iter().collect();
        assert_eq!(labels.get_or("source", "Uncategorized"), "Uncategorized");
        assert_eq!(labels.get_or("title", "x"), "A");
    }

    #[test]
    fn test_parsed_time_malformed() {
        let item = FeedItem::new(Labels::default(), "yesterday-ish");
        assert!(item.parsed_time().is_none());

        let item = FeedItem::new(Labels::default(), "2024-05-01T10:00:00+02:00");
        assert!(item.parsed_time().is_some());
    }

    #[test]
    fn test_with_identity_carries_id() {
        let item = FeedItem::new([("title", "A")].into_iter().collect(), "2024-05-01T10:00:00Z");
        let carried = item.with_identity();
        assert_eq!(carried.id.as_deref(), Some(item.identity().as_str()));
        assert_eq!(carried.identity(), item.identity());
    }
}
