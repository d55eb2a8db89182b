//! Active group / selected item reconciliation for the two-pane browse view.
//!
//! [`Selection::reconcile`] is re-run after every change to the filtered
//! grouping or the read state. It keeps the selection valid: the selected
//! item always belongs to the active group and is unread, or is `None`.

use crate::grouping::Grouping;
use crate::model::FeedItem;

#[derive(Debug, Clone, Default)]
pub struct Selection {
    active_group: Option<String>,
    selected: Option<FeedItem>,
    /// One-shot preferred group, consumed by the first reconcile that can honor it.
    preferred_group: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a preferred group (e.g. restored from the last session).
    pub fn with_preferred_group(group: Option<String>) -> Self {
        Self {
            preferred_group: group,
            ..Self::default()
        }
    }

    pub fn active_group(&self) -> Option<&str> {
        self.active_group.as_deref()
    }

    pub fn selected_item(&self) -> Option<&FeedItem> {
        self.selected.as_ref()
    }

    /// Queue a group to activate on the next reconcile, if it exists then.
    pub fn set_preferred_group(&mut self, group: impl Into<String>) {
        self.preferred_group = Some(group.into());
    }

    /// Repair the selection against the current filtered grouping.
    ///
    /// `is_read` receives item identities.
    ///
    /// 1. A pending preferred group that exists wins (and is consumed).
    /// 2. Otherwise the current active group is kept if it still exists.
    /// 3. Otherwise the lexicographically first group is activated.
    /// 4. A changed active group selects its first item.
    /// 5. An unchanged active group keeps the selected item if it is still
    ///    listed and unread, else moves to the first unread item.
    pub fn reconcile<F>(&mut self, groups: &Grouping, is_read: F)
    where
        F: Fn(&str) -> bool,
    {
        let previous = self.active_group.clone();

        let preferred = self
            .preferred_group
            .as_ref()
            .filter(|name| groups.contains_key(name.as_str()))
            .cloned();

        let next_group = if let Some(name) = preferred {
            self.preferred_group = None;
            Some(name)
        } else if let Some(current) = previous.as_ref().filter(|g| groups.contains_key(*g)) {
            Some(current.clone())
        } else {
            groups.keys().next().cloned()
        };

        let items: &[FeedItem] = next_group
            .as_ref()
            .and_then(|g| groups.get(g))
            .map(Vec::as_slice)
            .unwrap_or_default();

        if next_group != previous {
            tracing::trace!(from = ?previous, to = ?next_group, "Active group changed");
            self.active_group = next_group;
            self.selected = items.first().cloned();
            return;
        }

        let keep = self.selected.as_ref().is_some_and(|sel| {
            let id = sel.identity();
            !is_read(&id) && items.iter().any(|item| item.identity() == id)
        });
        if !keep {
            self.selected = items.iter().find(|item| !is_read(&item.identity())).cloned();
        }
    }

    /// Switch tabs. The new group's first item becomes selected.
    pub fn select_group(&mut self, groups: &Grouping, name: &str) -> bool {
        let Some(items) = groups.get(name) else {
            return false;
        };
        self.active_group = Some(name.to_string());
        self.selected = items.first().cloned();
        true
    }

    /// Move to the next (`forward`) or previous tab, wrapping around.
    pub fn cycle_group(&mut self, groups: &Grouping, forward: bool) {
        if groups.is_empty() {
            return;
        }
        let names: Vec<&String> = groups.keys().collect();
        let current = self
            .active_group
            .as_ref()
            .and_then(|g| names.iter().position(|n| *n == g));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % names.len(),
            (Some(i), false) => (i + names.len() - 1) % names.len(),
        };
        let name = names[next].clone();
        self.select_group(groups, &name);
    }

    /// Move the selection within the active group. Stops at either end.
    pub fn step_item(&mut self, groups: &Grouping, forward: bool) {
        let Some(items) = self.active_group.as_ref().and_then(|g| groups.get(g)) else {
            return;
        };
        let current = self
            .selected
            .as_ref()
            .map(FeedItem::identity)
            .and_then(|id| items.iter().position(|item| item.identity() == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(items.len().saturating_sub(1)),
            (Some(i), false) => i.saturating_sub(1),
        };
        self.selected = items.get(next).cloned();
    }

    /// Select a specific item in the active group (scroll restore).
    pub fn select_index(&mut self, groups: &Grouping, index: usize) {
        if let Some(items) = self.active_group.as_ref().and_then(|g| groups.get(g)) {
            if let Some(item) = items.get(index.min(items.len().saturating_sub(1))) {
                self.selected = Some(item.clone());
            }
        }
    }

    /// Position of the selected item in the active group's list.
    pub fn selected_index(&self, groups: &Grouping) -> Option<usize> {
        let id = self.selected.as_ref()?.identity();
        let items = groups.get(self.active_group.as_ref()?)?;
        items.iter().position(|item| item.identity() == id)
    }
}
