//! Selection: single, additive multi-select, and rubber-band.
//!
//! `ids` keeps insertion order so that removing the primary can promote the
//! most recently added remaining member. The invariant held after every
//! operation: `primary` is `Some` and a member of `ids` exactly when `ids` is
//! non-empty.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::coords::Rect;
use crate::doc::{CanvasItem, ItemId};

/// Coarse selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    Single,
    Multi,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    primary: Option<ItemId>,
    ids: Vec<ItemId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with a single item.
    pub fn select_one(&mut self, id: ItemId) {
        self.ids.clear();
        self.ids.push(id);
        self.primary = Some(id);
    }

    /// Replace the selection with `ids`; the last one becomes primary.
    pub fn select_many(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.clear();
        for id in ids {
            self.add(id);
        }
    }

    /// Add `id` if absent (making it primary), remove it if present.
    pub fn toggle(&mut self, id: ItemId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Drop `id` from the selection, promoting a new primary if needed.
    ///
    /// Returns whether `id` was selected.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        let Some(pos) = self.ids.iter().position(|x| x == id) else {
            return false;
        };
        self.ids.remove(pos);
        if self.primary.as_ref() == Some(id) {
            self.primary = self.ids.last().copied();
        }
        true
    }

    /// Keep only ids for which `exists` holds. Returns whether anything changed.
    pub fn retain(&mut self, mut exists: impl FnMut(&ItemId) -> bool) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| exists(id));
        if self.ids.len() == before {
            return false;
        }
        if self.primary.is_some_and(|p| !self.ids.contains(&p)) {
            self.primary = self.ids.last().copied();
        }
        true
    }

    /// Recompute a rubber-band selection.
    ///
    /// Selects every visible item whose bounds intersect `rect`. Without a
    /// `base` the result replaces the selection; with one (captured when the
    /// drag started under an additive modifier) the hits are added to it.
    /// The topmost newly hit item becomes primary.
    pub fn rubber_band_update<'a, I>(&mut self, rect: &Rect, items: I, base: Option<&Selection>)
    where
        I: IntoIterator<Item = &'a CanvasItem>,
    {
        let mut hits: Vec<&CanvasItem> = items
            .into_iter()
            .filter(|item| item.visible && rect.intersects(&item.bounds()))
            .collect();
        hits.sort_by_key(|item| item.z_index);

        *self = base.cloned().unwrap_or_default();
        for item in hits {
            if !self.contains(&item.id) {
                self.add(item.id);
            }
        }
    }

    /// Rewrite an id after the backing store assigned a canonical one.
    pub fn rekey(&mut self, old: &ItemId, new: ItemId) {
        for id in &mut self.ids {
            if id == old {
                *id = new;
            }
        }
        if self.primary.as_ref() == Some(old) {
            self.primary = Some(new);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.primary = None;
    }

    #[must_use]
    pub fn primary(&self) -> Option<ItemId> {
        self.primary
    }

    /// Selected ids in the order they were added.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn state(&self) -> SelectionState {
        match self.ids.len() {
            0 => SelectionState::Empty,
            1 => SelectionState::Single,
            _ => SelectionState::Multi,
        }
    }

    fn add(&mut self, id: ItemId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
        self.primary = Some(id);
    }
}
