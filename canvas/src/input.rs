//! Raw input values and the gesture machine driven by `EngineCore`.
//!
//! Hosts translate platform events into `Button`, `Modifiers`, `Key` and
//! `WheelDelta`. `InputState` holds whatever a gesture needs between press
//! and release so that release can commit and Escape can roll back.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::coords::Point;
use crate::doc::ItemId;
use crate::selection::Selection;

/// Drawing tool activated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Drag out a placeholder frame; a new empty item is created on release.
    Frame,
    /// Freehand stroke sampled in world space, handed to an editing backend.
    Brush,
}

/// Modifier keys down when the event fired.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Extends or replaces selection.
    pub shift: bool,
    /// Toggles selection; with `z`/`y` drives history.
    pub ctrl: bool,
    /// Option on macOS. Unused by the engine.
    pub alt: bool,
    /// Command on macOS. Treated like ctrl.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Any selection-affecting modifier (shift, ctrl or meta).
    #[must_use]
    pub fn selecting(self) -> bool {
        self.shift || self.command()
    }
}

/// Pointer button that pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Selects, drags and draws.
    Primary,
    /// Always pans.
    Middle,
    /// Ignored.
    Secondary,
}

/// A keyboard key as reported by the platform (e.g. `"Delete"`, `"Escape"`, `" "`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The pan-trigger key (Space).
    #[must_use]
    pub fn is_pan_trigger(&self) -> bool {
        matches!(self.0.as_str(), " " | "Space" | "Spacebar")
    }
}

/// Scroll amounts from a wheel event, in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelDelta {
    pub dx: f64,
    /// Positive scrolls down and zooms out.
    pub dy: f64,
}

/// Observable interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Panning,
    RubberBandSelecting,
    DraggingItems,
    DrawingTool(ToolKind),
}

/// Work-in-progress of a drawing tool between pointer-down and pointer-up.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawGesture {
    Frame {
        /// World-space corner where the drag started.
        anchor_world: Point,
        /// Latest world-space pointer position.
        current_world: Point,
    },
    Brush {
        /// Sampled world-space points, in order.
        points: Vec<Point>,
    },
}

/// Gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    #[default]
    Idle,
    /// The user is panning the canvas.
    Panning {
        /// Previous pointer position, for the next pan delta.
        last_screen: Point,
        /// Tool that was armed when the pan started; re-armed on release.
        resume: Option<ToolKind>,
    },
    /// The user is dragging out a selection rectangle.
    RubberBand {
        /// World-space corner where the drag started.
        origin_world: Point,
        /// Latest world-space pointer position.
        current_world: Point,
        /// Selection to union with, when the drag started additively.
        base: Option<Selection>,
        /// Selection before the gesture, restored on cancel.
        before: Selection,
    },
    /// The user is moving the selected items.
    DraggingItems {
        /// World-space pointer position at pointer-down.
        start_world: Point,
        /// Original `(id, x, y)` of every moving item, used to commit or revert.
        origins: Vec<(ItemId, f64, f64)>,
    },
    /// A drawing tool is active, optionally mid-gesture.
    Drawing {
        tool: ToolKind,
        gesture: Option<DrawGesture>,
        /// Selection before the gesture, restored on cancel.
        before: Selection,
    },
}

impl InputState {
    /// The coarse mode this state belongs to.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Self::Idle => Mode::Idle,
            Self::Panning { .. } => Mode::Panning,
            Self::RubberBand { .. } => Mode::RubberBandSelecting,
            Self::DraggingItems { .. } => Mode::DraggingItems,
            Self::Drawing { tool, .. } => Mode::DrawingTool(*tool),
        }
    }
}
