//! Undo/redo over full snapshots of the item collection.
//!
//! A linear, bounded stack of [`Snapshot`]s with a cursor. The entry at the
//! cursor is the state the document is in. Recording after an undo discards
//! everything above the cursor.
//!
//! Snapshots are reference-counted and never mutated, so handing one out (to
//! the store on undo, to a persistence layer, to a test) is cheap and every
//! older entry stays valid after later edits.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::sync::Arc;

use crate::consts::HISTORY_LIMIT;
use crate::doc::{CanvasItem, ItemId};

/// Immutable copy of the item collection, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    items: Arc<[CanvasItem]>,
}

impl Snapshot {
    #[must_use]
    pub fn new(items: Vec<CanvasItem>) -> Self {
        Self { items: items.into() }
    }

    #[must_use]
    pub fn items(&self) -> &[CanvasItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CanvasItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    /// Whether two snapshots share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

/// Bounded undo/redo stack.
#[derive(Debug)]
pub struct History {
    entries: Vec<Snapshot>,
    index: usize,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history keeping at most `limit` entries (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { entries: Vec::new(), index: 0, limit: limit.max(1) }
    }

    /// Push a snapshot as the new current state.
    ///
    /// Drops the redo tail, evicts the oldest entry past the limit, and moves
    /// the cursor to the new top.
    pub fn record(&mut self, snapshot: Snapshot) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push(snapshot);
        if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess);
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if self.index == 0 || self.entries.is_empty() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index).cloned()
    }

    /// Step forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index).cloned()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0 && !self.entries.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// The snapshot at the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.index)
    }

    /// Cursor position (0 = oldest entry).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }

    /// Rewrite `old` to `new` in every entry that contains it.
    ///
    /// Affected snapshots are copied; the originals are never touched.
    pub fn rekey(&mut self, old: &ItemId, new: ItemId) {
        for entry in &mut self.entries {
            if entry.get(old).is_none() {
                continue;
            }
            let items = entry
                .items()
                .iter()
                .map(|item| {
                    let mut item = item.clone();
                    if item.id == *old {
                        item.id = new;
                    }
                    item
                })
                .collect();
            *entry = Snapshot::new(items);
        }
    }
}
