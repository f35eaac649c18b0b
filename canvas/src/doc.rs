//! Document model: canvas items, sparse updates, and the in-memory item store.
//!
//! This module defines the data that describes what is on the canvas
//! (`CanvasItem`), the construction record that applies defaults exactly once
//! (`NewItem`), a sparse-update type for incremental edits (`ItemPatch`), and
//! the store that owns all live items (`ItemStore`).
//!
//! Draw order is ascending `z_index`; equal z-indices keep insertion order.
//! The store remembers insertion order with a monotonically increasing
//! sequence number per entry, so ties are stable across snapshots and
//! restores.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::consts::DEFAULT_ITEM_SIZE;
use crate::coords::Rect;
use crate::error::EngineError;
use crate::history::Snapshot;

/// Unique identifier for a canvas item.
pub type ItemId = Uuid;

/// Opaque handle to the image an item displays (asset key, URL, blob id).
///
/// The engine never interprets it. An empty handle marks a placeholder frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Non-destructive colour adjustments applied by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Adjustments {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub hue: f64,
}

impl Adjustments {
    fn is_finite(&self) -> bool {
        self.brightness.is_finite() && self.contrast.is_finite() && self.saturation.is_finite() && self.hue.is_finite()
    }
}

/// A positioned, layered image on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItem {
    /// Unique identifier for this item.
    pub id: ItemId,
    /// Left edge of the bounding box in world coordinates.
    pub x: f64,
    /// Top edge of the bounding box in world coordinates.
    pub y: f64,
    /// Width of the bounding box in world coordinates.
    pub width: f64,
    /// Height of the bounding box in world coordinates.
    pub height: f64,
    /// Clockwise rotation in degrees. Culling and hit-testing ignore it.
    pub rotation: f64,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Stacking order; lower values are drawn beneath higher values.
    pub z_index: i64,
    /// Hidden items stay in the document but are neither drawn nor hit.
    pub visible: bool,
    /// Locked items can be selected but not moved.
    pub locked: bool,
    /// Image displayed by this item.
    pub image_ref: ImageRef,
    /// Optional colour adjustments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<Adjustments>,
}

impl CanvasItem {
    /// Unrotated world-space bounding box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }
}

/// Fields for a new item. Absent fields take their defaults in
/// [`NewItem::into_item`], the only place defaults are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    pub image_ref: ImageRef,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub opacity: Option<f64>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub adjustments: Option<Adjustments>,
}

impl NewItem {
    #[must_use]
    pub fn new(image_ref: ImageRef, x: f64, y: f64) -> Self {
        Self { image_ref, x, y, ..Default::default() }
    }

    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Materialize the item with its defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPatch` for non-finite geometry or negative sizes.
    pub fn into_item(self, id: ItemId, z_index: i64) -> Result<CanvasItem, EngineError> {
        let item = CanvasItem {
            id,
            x: self.x,
            y: self.y,
            width: self.width.unwrap_or(DEFAULT_ITEM_SIZE),
            height: self.height.unwrap_or(DEFAULT_ITEM_SIZE),
            rotation: self.rotation.unwrap_or(0.0),
            opacity: clamp_opacity(self.opacity.unwrap_or(1.0)),
            z_index,
            visible: self.visible.unwrap_or(true),
            locked: self.locked.unwrap_or(false),
            image_ref: self.image_ref,
            adjustments: self.adjustments,
        };
        validate_item(&item)?;
        Ok(item)
    }
}

/// Sparse update for a canvas item. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Values outside `[0, 1]` are clamped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<ImageRef>,
    /// `Some(None)` clears the adjustments; serialized as `null`.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
    pub adjustments: Option<Option<Adjustments>>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn changed<T: PartialEq + Clone>(sent: &T, stored: &T, current: &T) -> Option<T> {
    (stored != sent && current == sent).then(|| stored.clone())
}

impl ItemPatch {
    /// Patch that moves an item to `(x, y)`.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    /// Patch that only sets the z-index.
    #[must_use]
    pub fn z_index(z: i64) -> Self {
        Self { z_index: Some(z), ..Default::default() }
    }

    /// Patch carrying every field of `item` (used to sync a restored state).
    #[must_use]
    pub fn from_item(item: &CanvasItem) -> Self {
        Self {
            x: Some(item.x),
            y: Some(item.y),
            width: Some(item.width),
            height: Some(item.height),
            rotation: Some(item.rotation),
            opacity: Some(item.opacity),
            z_index: Some(item.z_index),
            visible: Some(item.visible),
            locked: Some(item.locked),
            image_ref: Some(item.image_ref.clone()),
            adjustments: Some(item.adjustments),
        }
    }

    /// Fields the backing store changed between `sent` and `stored`, limited
    /// to those `current` has not edited since `sent` went out.
    #[must_use]
    pub fn store_changes(sent: &CanvasItem, stored: &CanvasItem, current: &CanvasItem) -> Self {
        Self {
            x: changed(&sent.x, &stored.x, &current.x),
            y: changed(&sent.y, &stored.y, &current.y),
            width: changed(&sent.width, &stored.width, &current.width),
            height: changed(&sent.height, &stored.height, &current.height),
            rotation: changed(&sent.rotation, &stored.rotation, &current.rotation),
            opacity: changed(&sent.opacity, &stored.opacity, &current.opacity),
            z_index: changed(&sent.z_index, &stored.z_index, &current.z_index),
            visible: changed(&sent.visible, &stored.visible, &current.visible),
            locked: changed(&sent.locked, &stored.locked, &current.locked),
            image_ref: changed(&sent.image_ref, &stored.image_ref, &current.image_ref),
            adjustments: changed(&sent.adjustments, &stored.adjustments, &current.adjustments),
        }
    }

    /// True when the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn validate(&self) -> Result<(), EngineError> {
        for (name, value) in [("x", self.x), ("y", self.y), ("rotation", self.rotation), ("opacity", self.opacity)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(EngineError::InvalidPatch(format!("{name} must be finite")));
            }
        }
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(EngineError::InvalidPatch(format!("{name} must be finite and non-negative")));
            }
        }
        if self.adjustments.flatten().is_some_and(|a| !a.is_finite()) {
            return Err(EngineError::InvalidPatch("adjustments must be finite".into()));
        }
        Ok(())
    }

    /// Shallow-merge into `item`.
    fn apply_to(&self, item: &mut CanvasItem) {
        if let Some(x) = self.x {
            item.x = x;
        }
        if let Some(y) = self.y {
            item.y = y;
        }
        if let Some(w) = self.width {
            item.width = w;
        }
        if let Some(h) = self.height {
            item.height = h;
        }
        if let Some(r) = self.rotation {
            item.rotation = r;
        }
        if let Some(o) = self.opacity {
            item.opacity = clamp_opacity(o);
        }
        if let Some(z) = self.z_index {
            item.z_index = z;
        }
        if let Some(v) = self.visible {
            item.visible = v;
        }
        if let Some(l) = self.locked {
            item.locked = l;
        }
        if let Some(ref image_ref) = self.image_ref {
            item.image_ref = image_ref.clone();
        }
        if let Some(a) = self.adjustments {
            item.adjustments = a;
        }
    }
}

fn clamp_opacity(opacity: f64) -> f64 {
    opacity.max(0.0).min(1.0)
}

fn validate_item(item: &CanvasItem) -> Result<(), EngineError> {
    ItemPatch::from_item(item).validate()
}

#[derive(Debug, Clone)]
struct Entry {
    item: CanvasItem,
    seq: u64,
}

/// In-memory store of canvas items.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: HashMap<ItemId, Entry>,
    next_seq: u64,
}

impl ItemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new item on top of everything else and return its fresh id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPatch` if the new item's geometry is invalid.
    pub fn add(&mut self, new: NewItem) -> Result<ItemId, EngineError> {
        let id = Uuid::new_v4();
        let item = new.into_item(id, self.next_z())?;
        self.insert(item);
        Ok(id)
    }

    /// Insert or replace an item by id. A replaced item keeps its place in
    /// insertion order.
    pub fn insert(&mut self, item: CanvasItem) {
        let seq = match self.items.get(&item.id) {
            Some(existing) => existing.seq,
            None => self.bump_seq(),
        };
        self.items.insert(item.id, Entry { item, seq });
    }

    /// Apply a partial update to an existing item.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids and `InvalidPatch` for
    /// non-finite or negative values; the item is unchanged on error.
    pub fn patch(&mut self, id: &ItemId, patch: &ItemPatch) -> Result<(), EngineError> {
        patch.validate()?;
        let entry = self.items.get_mut(id).ok_or(EngineError::ItemNotFound(*id))?;
        patch.apply_to(&mut entry.item);
        Ok(())
    }

    /// Remove an item by id. Other items keep their z-indices.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids.
    pub fn remove(&mut self, id: &ItemId) -> Result<CanvasItem, EngineError> {
        self.items
            .remove(id)
            .map(|entry| entry.item)
            .ok_or(EngineError::ItemNotFound(*id))
    }

    /// Assign z-indices in bulk. All ids are checked before anything changes.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for the first unknown id.
    pub fn reorder(&mut self, assignment: &[(ItemId, i64)]) -> Result<(), EngineError> {
        if let Some((missing, _)) = assignment.iter().find(|(id, _)| !self.items.contains_key(id)) {
            return Err(EngineError::ItemNotFound(*missing));
        }
        for (id, z) in assignment {
            if let Some(entry) = self.items.get_mut(id) {
                entry.item.z_index = *z;
            }
        }
        Ok(())
    }

    /// Put an item above every other item (`z = max + 1`).
    ///
    /// Returns the new z-index, or `None` if it was already strictly on top.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids and `InvalidPatch` when the
    /// topmost z-index is already `i64::MAX`.
    pub fn move_to_front(&mut self, id: &ItemId) -> Result<Option<i64>, EngineError> {
        let current = self.get(id).ok_or(EngineError::ItemNotFound(*id))?.z_index;
        let others_max = self.items.values().filter(|e| e.item.id != *id).map(|e| e.item.z_index).max();
        match others_max {
            Some(max) if max >= current => {
                let z = max
                    .checked_add(1)
                    .ok_or_else(|| EngineError::InvalidPatch("z_index has no room above the front".into()))?;
                self.patch(id, &ItemPatch::z_index(z))?;
                Ok(Some(z))
            }
            _ => Ok(None),
        }
    }

    /// Put an item below every other item (`z = min - 1`).
    ///
    /// Returns the new z-index, or `None` if it was already strictly at the back.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids and `InvalidPatch` when the
    /// backmost z-index is already `i64::MIN`.
    pub fn move_to_back(&mut self, id: &ItemId) -> Result<Option<i64>, EngineError> {
        let current = self.get(id).ok_or(EngineError::ItemNotFound(*id))?.z_index;
        let others_min = self.items.values().filter(|e| e.item.id != *id).map(|e| e.item.z_index).min();
        match others_min {
            Some(min) if min <= current => {
                let z = min
                    .checked_sub(1)
                    .ok_or_else(|| EngineError::InvalidPatch("z_index has no room below the back".into()))?;
                self.patch(id, &ItemPatch::z_index(z))?;
                Ok(Some(z))
            }
            _ => Ok(None),
        }
    }

    /// Move an item to a new id, keeping its insertion order. Used when the
    /// backing store assigns the canonical id.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` if `old` is unknown.
    pub fn rekey(&mut self, old: &ItemId, new: ItemId) -> Result<(), EngineError> {
        let mut entry = self.items.remove(old).ok_or(EngineError::ItemNotFound(*old))?;
        entry.item.id = new;
        self.items.insert(new, entry);
        Ok(())
    }

    /// Return a reference to an item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CanvasItem> {
        self.items.get(id).map(|e| &e.item)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// All items in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<&CanvasItem> {
        let mut entries: Vec<&Entry> = self.items.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| &e.item).collect()
    }

    /// All items in draw order: ascending `z_index`, ties by insertion order.
    #[must_use]
    pub fn sorted_items(&self) -> Vec<&CanvasItem> {
        let mut entries: Vec<&Entry> = self.items.values().collect();
        entries.sort_by(|a, b| a.item.z_index.cmp(&b.item.z_index).then_with(|| a.seq.cmp(&b.seq)));
        entries.into_iter().map(|e| &e.item).collect()
    }

    /// z-index a newly added item receives: `max(max existing, 0) + 1`.
    ///
    /// Saturates at `i64::MAX`; the tie still draws the new item on top
    /// because it is the latest insertion.
    #[must_use]
    pub fn next_z(&self) -> i64 {
        self.items.values().map(|e| e.item.z_index).max().unwrap_or(0).max(0).saturating_add(1)
    }

    /// Union of all item bounds, or `None` for an empty store.
    #[must_use]
    pub fn content_bounds(&self) -> Option<Rect> {
        self.items.values().map(|e| e.item.bounds()).reduce(|acc, r| acc.union(&r))
    }

    /// Immutable copy of the whole collection in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.list().into_iter().cloned().collect())
    }

    /// Replace all items with the contents of a snapshot.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.load(snapshot.items().iter().cloned());
    }

    /// Replace all items, keeping the given order as insertion order.
    pub fn load(&mut self, items: impl IntoIterator<Item = CanvasItem>) {
        self.items.clear();
        for item in items {
            self.insert(item);
        }
    }

    /// Number of items currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the store contains no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
