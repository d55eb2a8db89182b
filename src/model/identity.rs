//! Content-derived item identity.
//!
//! Items have no backend-assigned ID, so read tracking keys them by a DJB2
//! hash of their label set. Collisions are not resolved: two colliding items
//! share read status, nothing more.

use super::FeedItem;

/// DJB2 over UTF-16 code units, wrapping at 2^32.
///
/// Code units (not bytes or chars) keep hashes identical to those produced by
/// JavaScript clients that share the same `read_items` export.
pub fn djb2(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(5381u32, |acc, unit| {
            acc.wrapping_mul(33).wrapping_add(u32::from(unit))
        })
}

/// Stable identifier for an item.
///
/// Returns the precomputed `id` unchanged when present. Otherwise hashes
/// `key=value` pairs in lexicographic key order joined with `&`; `null`
/// labels hash as `key=null`.
pub fn item_identity(item: &FeedItem) -> String {
    if let Some(id) = &item.id {
        return id.clone();
    }

    let canonical = item
        .labels
        .identity_pairs()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    djb2(&canonical).to_string()
}
