//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Lowest zoom factor the camera accepts by default.
pub const MIN_ZOOM: f64 = 0.25;

/// Highest zoom factor the camera accepts by default.
pub const MAX_ZOOM: f64 = 3.0;

/// Multiplicative zoom applied per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.05;

// ── Culling ─────────────────────────────────────────────────────

/// World units added on every side of the viewport before culling.
pub const CULL_PADDING: f64 = 200.0;

// ── Items ───────────────────────────────────────────────────────

/// Width and height given to items created without explicit dimensions.
pub const DEFAULT_ITEM_SIZE: f64 = 400.0;

/// Smallest frame (world units, per axis) the frame tool will commit.
pub const MIN_DRAW_SIZE: f64 = 4.0;

// ── History ─────────────────────────────────────────────────────

/// Number of snapshots kept by the undo stack.
pub const HISTORY_LIMIT: usize = 50;
