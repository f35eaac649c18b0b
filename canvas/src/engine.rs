use std::collections::{HashMap, HashSet};
use std::mem;

use tracing::{debug, warn};

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::coords::{self, Point, Rect, ScreenSize};
use crate::cull;
use crate::doc::{CanvasItem, ImageRef, ItemId, ItemPatch, ItemStore, NewItem};
use crate::error::EngineError;
use crate::history::{History, Snapshot};
use crate::hit;
use crate::input::{Button, DrawGesture, InputState, Key, Mode, Modifiers, ToolKind, WheelDelta};
use crate::selection::Selection;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Intents returned from engine operations for the host to carry out.
///
/// Persistence intents describe a change the engine has already applied
/// locally; the host forwards them to the backing store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ItemCreated(CanvasItem),
    ItemUpdated { id: ItemId, patch: ItemPatch },
    ItemDeleted { id: ItemId },
    CameraChanged(Camera),
    /// A brush stroke finished; `target` is the primary selection at release.
    StrokeFinished { points: Vec<Point>, target: Option<ItemId> },
    RenderNeeded,
}

/// Which part of the engine state changed during one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Change {
    Items,
    Camera,
    Selection,
    Mode,
}

/// Callback notified once per operation with the deduplicated changes.
///
/// Observers get shared access only, so they cannot re-enter the engine.
pub type Observer = Box<dyn FnMut(&[Change], &EngineCore) + Send>;

/// Core engine state: items, camera, selection, history and the gesture
/// state machine. Free of any rendering surface so it can be driven from a
/// host process or a test.
pub struct EngineCore {
    config: EngineConfig,
    doc: ItemStore,
    camera: Camera,
    selection: Selection,
    history: History,
    input: InputState,
    screen: ScreenSize,
    pan_key_held: bool,
    /// The store differs from the history cursor (remote changes, reconcile).
    unrecorded: bool,
    last_mode: Mode,
    changes: Vec<Change>,
    observers: Vec<Observer>,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            doc: ItemStore::new(),
            camera: Camera::default(),
            selection: Selection::new(),
            history: History::new(config.history_limit),
            input: InputState::Idle,
            screen: ScreenSize::default(),
            pan_key_held: false,
            unrecorded: false,
            last_mode: Mode::Idle,
            changes: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Register a change observer.
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    // --- Data inputs ---

    /// Hydrate the store from the backing store. Resets history to a single
    /// baseline entry.
    pub fn load_items(&mut self, items: Vec<CanvasItem>) -> Vec<Action> {
        self.input = InputState::Idle;
        self.doc.load(items);
        self.history.clear();
        self.history.record(self.doc.snapshot());
        self.unrecorded = false;
        self.prune_selection();
        self.changes.push(Change::Items);
        self.finish(Vec::new())
    }

    /// Apply a create that originated elsewhere. Not recorded in history.
    pub fn apply_create(&mut self, item: CanvasItem) -> Vec<Action> {
        self.doc.insert(item);
        self.unrecorded = true;
        self.changes.push(Change::Items);
        self.finish(Vec::new())
    }

    /// Apply an update that originated elsewhere. Not recorded in history.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `InvalidPatch`; the store is unchanged.
    pub fn apply_update(&mut self, id: &ItemId, patch: &ItemPatch) -> Result<Vec<Action>, EngineError> {
        self.doc.patch(id, patch)?;
        self.unrecorded = true;
        self.changes.push(Change::Items);
        Ok(self.finish(Vec::new()))
    }

    /// Apply a delete that originated elsewhere. Unknown ids are ignored.
    pub fn apply_delete(&mut self, id: &ItemId) -> Vec<Action> {
        if self.doc.remove(id).is_ok() {
            self.unrecorded = true;
            self.changes.push(Change::Items);
            self.prune_selection();
        }
        self.finish(Vec::new())
    }

    /// Adopt the canonical record the backing store returned for `sent`.
    ///
    /// A changed id is rewritten in the store, the selection, the history
    /// and any gesture in progress. Fields the store altered on the way in
    /// are applied unless the item was edited locally after `sent` went out;
    /// local edits always win.
    pub fn reconcile_item(&mut self, sent: &CanvasItem, canonical: &CanvasItem) -> Vec<Action> {
        let local_id = sent.id;
        if !self.doc.contains(&local_id) {
            debug!(%local_id, "reconcile skipped; item no longer present");
            return self.finish(Vec::new());
        }
        let new_id = canonical.id;
        if new_id != local_id {
            if let Err(e) = self.doc.rekey(&local_id, new_id) {
                warn!(error = %e, "reconcile rekey failed");
                return self.finish(Vec::new());
            }
            self.selection.rekey(&local_id, new_id);
            self.history.rekey(&local_id, new_id);
            if let InputState::DraggingItems { origins, .. } = &mut self.input {
                for origin in origins.iter_mut().filter(|o| o.0 == local_id) {
                    origin.0 = new_id;
                }
            }
            self.changes.push(Change::Items);
            self.changes.push(Change::Selection);
        }
        let Some(current) = self.doc.get(&new_id) else {
            return self.finish(Vec::new());
        };
        let patch = ItemPatch::store_changes(sent, canonical, current);
        // An empty patch leaves the history cursor valid.
        if !patch.is_empty() {
            match self.doc.patch(&new_id, &patch) {
                Ok(()) => {
                    self.unrecorded = true;
                    self.changes.push(Change::Items);
                }
                Err(e) => warn!(error = %e, id = %new_id, "reconcile patch rejected"),
            }
        }
        self.finish(Vec::new())
    }

    // --- Local edits ---

    /// Add an item on top of the stack.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPatch` for invalid geometry.
    pub fn add_item(&mut self, new: NewItem) -> Result<(ItemId, Vec<Action>), EngineError> {
        self.checkpoint();
        let id = self.doc.add(new)?;
        self.commit();
        let item = self.doc.get(&id).cloned().ok_or(EngineError::ItemNotFound(id))?;
        self.changes.push(Change::Items);
        Ok((id, self.finish(vec![Action::ItemCreated(item)])))
    }

    /// Apply a sparse update to one item.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` or `InvalidPatch`; nothing is recorded on error.
    pub fn patch_item(&mut self, id: &ItemId, patch: &ItemPatch) -> Result<Vec<Action>, EngineError> {
        if !self.doc.contains(id) {
            return Err(EngineError::ItemNotFound(*id));
        }
        self.checkpoint();
        self.doc.patch(id, patch)?;
        self.commit();
        self.changes.push(Change::Items);
        Ok(self.finish(vec![Action::ItemUpdated { id: *id, patch: patch.clone() }]))
    }

    /// Delete items. All ids are checked before anything is removed.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for the first unknown id.
    pub fn delete_items(&mut self, ids: &[ItemId]) -> Result<Vec<Action>, EngineError> {
        if let Some(missing) = ids.iter().find(|id| !self.doc.contains(id)) {
            return Err(EngineError::ItemNotFound(*missing));
        }
        if ids.is_empty() {
            return Ok(self.finish(Vec::new()));
        }
        self.checkpoint();
        let mut actions = Vec::with_capacity(ids.len());
        for id in ids {
            // Duplicate ids fail the second remove.
            if self.doc.remove(id).is_ok() {
                actions.push(Action::ItemDeleted { id: *id });
            }
        }
        self.commit();
        self.prune_selection();
        self.changes.push(Change::Items);
        Ok(self.finish(actions))
    }

    /// Delete every selected item.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        let ids = self.selection.ids().to_vec();
        self.delete_items(&ids).unwrap_or_else(|e| {
            warn!(error = %e, "delete selection failed");
            self.finish(Vec::new())
        })
    }

    /// Assign z-indices in bulk.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for the first unknown id; nothing changes.
    pub fn reorder(&mut self, assignment: &[(ItemId, i64)]) -> Result<Vec<Action>, EngineError> {
        if let Some((missing, _)) = assignment.iter().find(|(id, _)| !self.doc.contains(id)) {
            return Err(EngineError::ItemNotFound(*missing));
        }
        self.checkpoint();
        self.doc.reorder(assignment)?;
        self.commit();
        self.changes.push(Change::Items);
        let actions = assignment
            .iter()
            .map(|(id, z)| Action::ItemUpdated { id: *id, patch: ItemPatch::z_index(*z) })
            .collect();
        Ok(self.finish(actions))
    }

    /// Raise an item above all others.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids and `InvalidPatch` when the
    /// z-index range is exhausted.
    pub fn move_to_front(&mut self, id: &ItemId) -> Result<Vec<Action>, EngineError> {
        self.restack(&[*id], true)
    }

    /// Lower an item beneath all others.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids and `InvalidPatch` when the
    /// z-index range is exhausted.
    pub fn move_to_back(&mut self, id: &ItemId) -> Result<Vec<Action>, EngineError> {
        self.restack(&[*id], false)
    }

    /// Raise (or lower) the whole selection, keeping its relative order.
    pub fn restack_selection(&mut self, front: bool) -> Vec<Action> {
        let ids = self.selection.ids().to_vec();
        self.restack(&ids, front).unwrap_or_else(|e| {
            warn!(error = %e, "restack selection failed");
            self.finish(Vec::new())
        })
    }

    pub fn undo(&mut self) -> Vec<Action> {
        self.step_history(true)
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.step_history(false)
    }

    // --- Selection ---

    /// Select exactly one item.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids.
    pub fn select(&mut self, id: &ItemId) -> Result<Vec<Action>, EngineError> {
        if !self.doc.contains(id) {
            return Err(EngineError::ItemNotFound(*id));
        }
        self.selection.select_one(*id);
        self.changes.push(Change::Selection);
        Ok(self.finish(Vec::new()))
    }

    /// Add an item to, or remove it from, the selection.
    ///
    /// # Errors
    ///
    /// Returns `ItemNotFound` for unknown ids.
    pub fn toggle_selection(&mut self, id: &ItemId) -> Result<Vec<Action>, EngineError> {
        if !self.doc.contains(id) {
            return Err(EngineError::ItemNotFound(*id));
        }
        self.selection.toggle(*id);
        self.changes.push(Change::Selection);
        Ok(self.finish(Vec::new()))
    }

    pub fn clear_selection(&mut self) -> Vec<Action> {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.changes.push(Change::Selection);
        }
        self.finish(Vec::new())
    }

    /// Select every visible item; the topmost becomes primary.
    pub fn select_all(&mut self) -> Vec<Action> {
        let ids: Vec<ItemId> = self.doc.sorted_items().into_iter().filter(|i| i.visible).map(|i| i.id).collect();
        self.selection.select_many(ids);
        self.changes.push(Change::Selection);
        self.finish(Vec::new())
    }

    // --- Camera / viewport ---

    /// Record the drawing surface size in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.screen = ScreenSize::new(width, height);
        self.changes.push(Change::Camera);
        self.finish(Vec::new())
    }

    /// Pan by a screen-space delta.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` for non-finite deltas; the camera is unchanged.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Result<Vec<Action>, EngineError> {
        self.camera.pan(dx, dy)?;
        Ok(self.camera_changed())
    }

    /// Zoom to `zoom` (clamped), keeping the world point under `pivot` fixed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` for a non-positive or non-finite zoom or pivot.
    pub fn set_zoom(&mut self, zoom: f64, pivot: Point) -> Result<Vec<Action>, EngineError> {
        if self.camera.set_zoom(zoom, pivot, self.config.zoom)? {
            Ok(self.camera_changed())
        } else {
            Ok(self.finish(Vec::new()))
        }
    }

    /// Apply a persisted camera. The zoom is clamped and the view kept over
    /// the content. No `CameraChanged` is emitted; the state came from storage.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` if `saved` is invalid; the camera is unchanged.
    pub fn restore_camera(&mut self, saved: Camera) -> Result<Vec<Action>, EngineError> {
        let bounds = self.doc.content_bounds();
        self.camera.restore(saved, self.config.zoom, bounds.as_ref(), self.screen)?;
        self.changes.push(Change::Camera);
        Ok(self.finish(Vec::new()))
    }

    // --- Tools ---

    /// Activate a drawing tool, or return to plain selection with `None`.
    /// Any gesture in progress is cancelled first.
    pub fn set_tool(&mut self, tool: Option<ToolKind>) -> Vec<Action> {
        self.cancel_gesture();
        if let Some(tool) = tool {
            self.input = InputState::Drawing { tool, gesture: None, before: self.selection.clone() };
        }
        self.finish(Vec::new())
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if !screen_pt.is_finite() {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen_pt);
        let pan = button == Button::Middle || (button == Button::Primary && self.pan_key_held);
        let state = mem::take(&mut self.input);
        self.input = match (state, button) {
            (InputState::Idle, _) if pan => InputState::Panning { last_screen: screen_pt, resume: None },
            (InputState::Drawing { tool, gesture: None, .. }, _) if pan => {
                InputState::Panning { last_screen: screen_pt, resume: Some(tool) }
            }
            (InputState::Drawing { tool, gesture: None, before }, Button::Primary) => {
                let gesture = match tool {
                    ToolKind::Frame => DrawGesture::Frame { anchor_world: world, current_world: world },
                    ToolKind::Brush => DrawGesture::Brush { points: vec![world] },
                };
                InputState::Drawing { tool, gesture: Some(gesture), before }
            }
            (InputState::Idle, Button::Primary) => self.press_idle(world, modifiers),
            (other, _) => other,
        };
        self.finish(Vec::new())
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        if !screen_pt.is_finite() {
            return Vec::new();
        }
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();
        let state = mem::take(&mut self.input);
        self.input = match state {
            InputState::Panning { last_screen, resume } => {
                match self.camera.pan(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y) {
                    Ok(()) => {
                        self.changes.push(Change::Camera);
                        actions.push(Action::CameraChanged(self.camera));
                    }
                    Err(e) => debug!(error = %e, "pan step ignored"),
                }
                InputState::Panning { last_screen: screen_pt, resume }
            }
            InputState::RubberBand { origin_world, base, before, .. } => {
                let rect = Rect::from_corners(origin_world, world);
                self.selection.rubber_band_update(&rect, self.doc.list(), base.as_ref());
                self.changes.push(Change::Selection);
                InputState::RubberBand { origin_world, current_world: world, base, before }
            }
            InputState::DraggingItems { start_world, origins } => {
                let (dx, dy) = (world.x - start_world.x, world.y - start_world.y);
                for (id, x, y) in &origins {
                    if let Err(e) = self.doc.patch(id, &ItemPatch::position(x + dx, y + dy)) {
                        debug!(error = %e, %id, "drag step skipped");
                    }
                }
                self.changes.push(Change::Items);
                InputState::DraggingItems { start_world, origins }
            }
            InputState::Drawing { tool, gesture: Some(gesture), before } => {
                let gesture = match gesture {
                    DrawGesture::Frame { anchor_world, .. } => DrawGesture::Frame { anchor_world, current_world: world },
                    DrawGesture::Brush { mut points } => {
                        points.push(world);
                        DrawGesture::Brush { points }
                    }
                };
                actions.push(Action::RenderNeeded);
                InputState::Drawing { tool, gesture: Some(gesture), before }
            }
            other => other,
        };
        self.finish(actions)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let release = screen_pt.is_finite().then(|| self.camera.screen_to_world(screen_pt));
        let state = mem::take(&mut self.input);
        let mut actions = Vec::new();
        self.input = match state {
            InputState::Panning { resume, .. } => self.resting(resume),
            InputState::RubberBand { .. } => InputState::Idle,
            InputState::DraggingItems { origins, .. } => {
                actions = self.commit_drag(&origins);
                InputState::Idle
            }
            InputState::Drawing { gesture: Some(gesture), .. } => {
                actions = self.commit_gesture(gesture, release);
                InputState::Idle
            }
            other => other,
        };
        self.finish(actions)
    }

    /// The pointer left the surface: cancel any gesture. An armed tool with
    /// no gesture stays armed, including one suspended by a pan.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        match self.input {
            InputState::Idle | InputState::Drawing { gesture: None, .. } => {}
            InputState::Panning { resume, .. } => self.input = self.resting(resume),
            _ => self.cancel_gesture(),
        }
        self.finish(Vec::new())
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        if !delta.dy.is_finite() || delta.dy.abs() < f64::EPSILON {
            return self.finish(Vec::new());
        }
        let step = self.config.wheel_zoom_step;
        let factor = if delta.dy < 0.0 { step } else { 1.0 / step };
        match self.camera.zoom_by(factor, screen_pt, self.config.zoom) {
            Ok(true) => self.camera_changed(),
            Ok(false) => self.finish(Vec::new()),
            Err(e) => {
                debug!(error = %e, "wheel zoom ignored");
                self.finish(Vec::new())
            }
        }
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        if key.is_pan_trigger() {
            self.pan_key_held = true;
            return self.finish(Vec::new());
        }
        if key.as_str() == "Escape" {
            if matches!(self.input, InputState::Idle) {
                return self.clear_selection();
            }
            self.cancel_gesture();
            return self.finish(Vec::new());
        }
        if !matches!(self.input, InputState::Idle) {
            return self.finish(Vec::new());
        }
        match (key.as_str(), modifiers.command()) {
            ("Delete" | "Backspace", _) => self.delete_selection(),
            ("z" | "Z", true) if modifiers.shift => self.redo(),
            ("z" | "Z", true) => self.undo(),
            ("y" | "Y", true) => self.redo(),
            ("a" | "A", true) => self.select_all(),
            ("]", _) => self.restack_selection(true),
            ("[", _) => self.restack_selection(false),
            _ => self.finish(Vec::new()),
        }
    }

    pub fn on_key_up(&mut self, key: Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is_pan_trigger() {
            self.pan_key_held = false;
        }
        self.finish(Vec::new())
    }

    // --- Queries ---

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.input.mode()
    }

    #[must_use]
    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Look up an item by id.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&CanvasItem> {
        self.doc.get(id)
    }

    /// All items in draw order.
    #[must_use]
    pub fn items(&self) -> Vec<&CanvasItem> {
        self.doc.sorted_items()
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.doc.len()
    }

    /// Items overlapping the padded viewport, in insertion order.
    #[must_use]
    pub fn culled_items(&self) -> Vec<&CanvasItem> {
        cull::cull(self.doc.list(), &self.camera, self.screen, self.config.cull_padding)
    }

    /// What to draw this frame: culled, visible, back to front.
    #[must_use]
    pub fn render_list(&self) -> Vec<&CanvasItem> {
        cull::cull(self.doc.sorted_items(), &self.camera, self.screen, self.config.cull_padding)
            .into_iter()
            .filter(|item| item.visible)
            .collect()
    }

    /// Topmost visible item under a screen point.
    #[must_use]
    pub fn hit_test(&self, screen_pt: Point) -> Option<ItemId> {
        hit::hit_test(self.camera.screen_to_world(screen_pt), &self.doc)
    }

    /// Union of the selected items' bounds in screen space, for floating UI.
    #[must_use]
    pub fn selection_screen_bounds(&self) -> Option<Rect> {
        self.selection
            .ids()
            .iter()
            .filter_map(|id| self.doc.get(id))
            .map(CanvasItem::bounds)
            .reduce(|acc, r| acc.union(&r))
            .map(|world| coords::world_rect_to_screen(&world, &self.camera))
    }

    /// World-space marquee while rubber-band selecting.
    #[must_use]
    pub fn rubber_band_rect(&self) -> Option<Rect> {
        match &self.input {
            InputState::RubberBand { origin_world, current_world, .. } => {
                Some(Rect::from_corners(*origin_world, *current_world))
            }
            _ => None,
        }
    }

    /// World-space rectangle of a frame being drawn.
    #[must_use]
    pub fn draft_frame(&self) -> Option<Rect> {
        match &self.input {
            InputState::Drawing { gesture: Some(DrawGesture::Frame { anchor_world, current_world }), .. } => {
                Some(Rect::from_corners(*anchor_world, *current_world))
            }
            _ => None,
        }
    }

    /// Current item collection as an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.doc.snapshot()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || (self.unrecorded && !self.history.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.unrecorded && self.history.can_redo()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // --- Internals ---

    fn press_idle(&mut self, world: Point, modifiers: Modifiers) -> InputState {
        if let Some(id) = hit::hit_test(world, &self.doc) {
            if modifiers.selecting() {
                self.selection.toggle(id);
                self.changes.push(Change::Selection);
                return InputState::Idle;
            }
            if !self.selection.contains(&id) {
                self.selection.select_one(id);
                self.changes.push(Change::Selection);
            }
            let origins: Vec<(ItemId, f64, f64)> = self
                .selection
                .ids()
                .iter()
                .filter_map(|id| self.doc.get(id))
                .filter(|item| !item.locked)
                .map(|item| (item.id, item.x, item.y))
                .collect();
            if origins.is_empty() {
                return InputState::Idle;
            }
            self.checkpoint();
            return InputState::DraggingItems { start_world: world, origins };
        }

        let before = self.selection.clone();
        if modifiers.command() {
            return InputState::RubberBand {
                origin_world: world,
                current_world: world,
                base: Some(before.clone()),
                before,
            };
        }
        if !self.selection.is_empty() {
            self.selection.clear();
            self.changes.push(Change::Selection);
        }
        if modifiers.shift {
            InputState::RubberBand { origin_world: world, current_world: world, base: None, before }
        } else {
            InputState::Idle
        }
    }

    fn commit_drag(&mut self, origins: &[(ItemId, f64, f64)]) -> Vec<Action> {
        let actions: Vec<Action> = origins
            .iter()
            .filter_map(|(id, x, y)| {
                let item = self.doc.get(id)?;
                let moved = (item.x - x).abs() > f64::EPSILON || (item.y - y).abs() > f64::EPSILON;
                moved.then(|| Action::ItemUpdated { id: *id, patch: ItemPatch::position(item.x, item.y) })
            })
            .collect();
        if !actions.is_empty() {
            self.commit();
        }
        actions
    }

    fn commit_gesture(&mut self, gesture: DrawGesture, release: Option<Point>) -> Vec<Action> {
        match gesture {
            DrawGesture::Frame { anchor_world, current_world } => {
                let rect = Rect::from_corners(anchor_world, release.unwrap_or(current_world));
                if rect.width() < self.config.min_draw_size || rect.height() < self.config.min_draw_size {
                    debug!(width = rect.width(), height = rect.height(), "frame too small; discarded");
                    return Vec::new();
                }
                self.checkpoint();
                let new = NewItem::new(ImageRef::default(), rect.left, rect.top).with_size(rect.width(), rect.height());
                match self.doc.add(new) {
                    Ok(id) => {
                        self.commit();
                        self.selection.select_one(id);
                        self.changes.push(Change::Items);
                        self.changes.push(Change::Selection);
                        self.doc.get(&id).cloned().map(Action::ItemCreated).into_iter().collect()
                    }
                    Err(e) => {
                        warn!(error = %e, "frame creation failed");
                        Vec::new()
                    }
                }
            }
            DrawGesture::Brush { mut points } => {
                if let Some(p) = release
                    && points.last() != Some(&p)
                {
                    points.push(p);
                }
                if points.len() < 2 {
                    return Vec::new();
                }
                vec![Action::StrokeFinished { points, target: self.selection.primary() }]
            }
        }
    }

    /// State to return to once a pan ends.
    fn resting(&self, resume: Option<ToolKind>) -> InputState {
        match resume {
            Some(tool) => InputState::Drawing { tool, gesture: None, before: self.selection.clone() },
            None => InputState::Idle,
        }
    }

    /// Abort the gesture in progress and return to `Idle`, restoring
    /// whatever the gesture changed.
    fn cancel_gesture(&mut self) {
        match mem::take(&mut self.input) {
            InputState::RubberBand { before, .. } | InputState::Drawing { before, gesture: Some(_), .. } => {
                if self.selection != before {
                    self.selection = before;
                    self.changes.push(Change::Selection);
                }
            }
            InputState::DraggingItems { origins, .. } => {
                for (id, x, y) in origins {
                    if let Err(e) = self.doc.patch(&id, &ItemPatch::position(x, y)) {
                        warn!(error = %e, %id, "drag revert skipped");
                    }
                }
                self.changes.push(Change::Items);
            }
            InputState::Idle | InputState::Panning { .. } | InputState::Drawing { gesture: None, .. } => {}
        }
    }

    fn restack(&mut self, ids: &[ItemId], front: bool) -> Result<Vec<Action>, EngineError> {
        if let Some(missing) = ids.iter().find(|id| !self.doc.contains(id)) {
            return Err(EngineError::ItemNotFound(*missing));
        }
        // Move in draw order so the group keeps its relative stacking.
        let mut ordered: Vec<ItemId> =
            self.doc.sorted_items().into_iter().map(|item| item.id).filter(|id| ids.contains(id)).collect();
        if !front {
            ordered.reverse();
        }
        self.checkpoint();
        let before = self.doc.snapshot();
        let mut actions = Vec::new();
        for id in ordered {
            let moved = if front { self.doc.move_to_front(&id) } else { self.doc.move_to_back(&id) };
            match moved {
                Ok(Some(z)) => actions.push(Action::ItemUpdated { id, patch: ItemPatch::z_index(z) }),
                Ok(None) => {}
                Err(e) => {
                    // A half-moved group is rolled back.
                    self.doc.restore(&before);
                    return Err(e);
                }
            }
        }
        if !actions.is_empty() {
            self.commit();
            self.changes.push(Change::Items);
        }
        Ok(self.finish(actions))
    }

    fn step_history(&mut self, back: bool) -> Vec<Action> {
        self.cancel_gesture();
        if self.unrecorded {
            self.commit();
        }
        let before = self.doc.snapshot();
        let step = if back { self.history.undo() } else { self.history.redo() };
        let Some(snapshot) = step else {
            return self.finish(Vec::new());
        };
        self.doc.restore(&snapshot);
        self.prune_selection();
        self.changes.push(Change::Items);
        self.finish(diff_actions(&before, &snapshot))
    }

    /// Record the current state if it is not already at the history cursor.
    fn checkpoint(&mut self) {
        if self.unrecorded || self.history.is_empty() {
            self.commit();
        }
    }

    fn commit(&mut self) {
        self.history.record(self.doc.snapshot());
        self.unrecorded = false;
    }

    fn prune_selection(&mut self) {
        let doc = &self.doc;
        if self.selection.retain(|id| doc.contains(id)) {
            self.changes.push(Change::Selection);
        }
    }

    fn camera_changed(&mut self) -> Vec<Action> {
        self.changes.push(Change::Camera);
        self.finish(vec![Action::CameraChanged(self.camera)])
    }

    /// Close out an operation: note mode transitions, notify observers once,
    /// and request a render when anything changed.
    fn finish(&mut self, mut actions: Vec<Action>) -> Vec<Action> {
        let mode = self.input.mode();
        if mode != self.last_mode {
            debug!(from = ?self.last_mode, to = ?mode, "mode transition");
            self.last_mode = mode;
            self.changes.push(Change::Mode);
        }
        if self.changes.is_empty() {
            return actions;
        }
        let mut changes = mem::take(&mut self.changes);
        changes.sort_unstable();
        changes.dedup();
        if !actions.contains(&Action::RenderNeeded) {
            actions.push(Action::RenderNeeded);
        }
        let mut observers = mem::take(&mut self.observers);
        for observer in &mut observers {
            observer(&changes, self);
        }
        self.observers = observers;
        actions
    }
}

/// Persistence intents that bring the backing store from `before` to `after`.
fn diff_actions(before: &Snapshot, after: &Snapshot) -> Vec<Action> {
    let old: HashMap<ItemId, &CanvasItem> = before.items().iter().map(|item| (item.id, item)).collect();
    let mut actions = Vec::new();
    for item in after.items() {
        match old.get(&item.id) {
            None => actions.push(Action::ItemCreated(item.clone())),
            Some(prev) if *prev != item => {
                actions.push(Action::ItemUpdated { id: item.id, patch: ItemPatch::from_item(item) });
            }
            Some(_) => {}
        }
    }
    let current: HashSet<ItemId> = after.items().iter().map(|item| item.id).collect();
    actions.extend(
        before
            .items()
            .iter()
            .filter(|item| !current.contains(&item.id))
            .map(|item| Action::ItemDeleted { id: item.id }),
    );
    actions
}
