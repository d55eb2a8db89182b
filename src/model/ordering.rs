//! Display order for feed items: newest first, then title ascending.

use std::cmp::Ordering;

use super::FeedItem;
use crate::util::collate;

/// Compare two items for display.
///
/// Primary key is the parsed timestamp, descending. Ties break on the `title`
/// label, ascending by [`collate`]. When either timestamp fails to parse the
/// pair is compared by title alone, so one malformed item degrades its own
/// position instead of failing the whole sort.
pub fn compare_items(a: &FeedItem, b: &FeedItem) -> Ordering {
    match (a.parsed_time(), b.parsed_time()) {
        (Some(ta), Some(tb)) => tb.cmp(&ta).then_with(|| collate(a.title(), b.title())),
        _ => collate(a.title(), b.title()),
    }
}

/// Stable in-place sort using [`compare_items`].
///
/// The title fallback means the comparator is not a strict total order once
/// malformed timestamps are mixed in, and `slice::sort_by` may panic on such
/// comparators. A plain merge sort tolerates it.
pub fn sort_items(items: &mut Vec<FeedItem>) {
    if items.len() < 2 {
        return;
    }
    let taken = std::mem::take(items);
    *items = merge_sort(taken);
}

fn merge_sort(mut items: Vec<FeedItem>) -> Vec<FeedItem> {
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items);
    let right = merge_sort(right);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => compare_items(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        if let Some(item) = next {
            merged.push(item);
        }
    }

    merged
}
