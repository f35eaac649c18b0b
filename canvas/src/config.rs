//! Engine tunables.
//!
//! The engine never reads the environment itself; the host builds an
//! [`EngineConfig`] (from env vars, a settings file, or defaults) and hands it
//! to [`crate::engine::EngineCore::with_config`].

use crate::camera::ZoomLimits;
use crate::consts::{CULL_PADDING, HISTORY_LIMIT, MAX_ZOOM, MIN_DRAW_SIZE, MIN_ZOOM, WHEEL_ZOOM_STEP};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Zoom range enforced on every camera transition.
    pub zoom: ZoomLimits,
    /// World units added around the viewport before culling.
    pub cull_padding: f64,
    /// Maximum number of undo snapshots.
    pub history_limit: usize,
    /// Zoom multiplier per wheel notch.
    pub wheel_zoom_step: f64,
    /// Minimum frame size (world units) the frame tool commits.
    pub min_draw_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomLimits { min: MIN_ZOOM, max: MAX_ZOOM },
            cull_padding: CULL_PADDING,
            history_limit: HISTORY_LIMIT,
            wheel_zoom_step: WHEEL_ZOOM_STEP,
            min_draw_size: MIN_DRAW_SIZE,
        }
    }
}
