//! Client-side grouping and filtering of a fetched result set.
//!
//! A [`Grouping`] partitions items by the value of one label. `BTreeMap`
//! keeps group names in lexicographic order, which is also the tab order in
//! the UI. The grouping is derived data: rebuild it whenever the items or the
//! grouping label change, and re-filter it whenever the read state changes.

use std::collections::{BTreeMap, HashMap};

use crate::model::{
    sort_items, FeedItem, LABEL_CONTENT, LABEL_LINK, LABEL_SUMMARY, LABEL_SUMMARY_SNIPPET,
    LABEL_TITLE,
};

/// Group name for items that lack the grouping label.
pub const PLACEHOLDER_GROUP: &str = "Uncategorized";

/// Label keys that carry content rather than categories. Never offered for grouping.
pub const EXCLUDED_GROUP_LABELS: &[&str] = &[
    LABEL_TITLE,
    LABEL_LINK,
    LABEL_SUMMARY_SNIPPET,
    LABEL_CONTENT,
    LABEL_SUMMARY,
    "pub_time",
];

/// Group name -> items, each group sorted newest first.
pub type Grouping = BTreeMap<String, Vec<FeedItem>>;

/// Partition `items` by `labels[group_by]`, sorting each group.
pub fn group(items: &[FeedItem], group_by: &str) -> Grouping {
    let mut groups: Grouping = BTreeMap::new();
    for item in items {
        let key = item.labels.get_or(group_by, PLACEHOLDER_GROUP);
        groups.entry(key.to_string()).or_default().push(item.clone());
    }
    for items in groups.values_mut() {
        sort_items(items);
    }
    groups
}

/// Remove read items, dropping groups that end up empty.
///
/// `is_read` receives each item's identity.
pub fn filter_read<F>(groups: &Grouping, is_read: F) -> Grouping
where
    F: Fn(&str) -> bool,
{
    groups
        .iter()
        .filter_map(|(name, items)| {
            let unread: Vec<FeedItem> = items
                .iter()
                .filter(|item| !is_read(&item.identity()))
                .cloned()
                .collect();
            (!unread.is_empty()).then(|| (name.clone(), unread))
        })
        .collect()
}

/// Number of unread items in a flat result set.
pub fn unread_count<F>(items: &[FeedItem], is_read: F) -> usize
where
    F: Fn(&str) -> bool,
{
    items
        .iter()
        .filter(|item| !is_read(&item.identity()))
        .count()
}

/// Label keys worth offering as grouping choices.
///
/// A key qualifies when at least one of its values is shared by two or more
/// items; a label whose values are all distinct would produce one group per
/// item. `default_label` always qualifies. Result: default first, then the
/// rest in lexicographic order.
pub fn discover_groupable_labels(items: &[FeedItem], default_label: &str) -> Vec<String> {
    let mut value_counts: BTreeMap<&str, HashMap<&str, usize>> = BTreeMap::new();
    for item in items {
        for (key, value) in item.labels.iter() {
            if EXCLUDED_GROUP_LABELS.contains(&key) {
                continue;
            }
            *value_counts.entry(key).or_default().entry(value).or_default() += 1;
        }
    }

    let mut labels = vec![default_label.to_string()];
    labels.extend(
        value_counts
            .into_iter()
            .filter(|(key, counts)| *key != default_label && counts.values().any(|&n| n > 1))
            .map(|(key, _)| key.to_string()),
    );
    labels
}

/// Keep `current` if it is still offered, otherwise fall back to `default_label`.
pub fn resolve_group_label(current: &str, available: &[String], default_label: &str) -> String {
    if available.iter().any(|l| l == current) {
        current.to_string()
    } else {
        if current != default_label {
            tracing::debug!(
                current,
                default = default_label,
                "Grouping label no longer available, resetting"
            );
        }
        default_label.to_string()
    }
}

/// Items of `group_name` under `group_by`, in display order.
///
/// Rebuilds one group from the flat result set without materializing the
/// others (used by the reader's "next item").
pub fn items_in_group(items: &[FeedItem], group_by: &str, group_name: &str) -> Vec<FeedItem> {
    let mut members: Vec<FeedItem> = items
        .iter()
        .filter(|item| item.labels.get_or(group_by, PLACEHOLDER_GROUP) == group_name)
        .cloned()
        .collect();
    sort_items(&mut members);
    members
}
