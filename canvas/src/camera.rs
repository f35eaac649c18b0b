//! Camera model: pan offset and zoom factor for the infinite canvas.
//!
//! The camera is always valid. Every transition validates its input first and
//! returns [`EngineError::InvalidCamera`] without touching state when the input
//! would break the invariants (`zoom > 0`, finite offset). Zoom transitions
//! clamp to [`ZoomLimits`] *before* the offset is recomputed, so the point under
//! the cursor stays put even when the requested zoom is out of range.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{MAX_ZOOM, MIN_ZOOM};
use crate::coords::{self, Point, Rect, ScreenSize};
use crate::error::EngineError;

/// Inclusive zoom range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: MIN_ZOOM, max: MAX_ZOOM }
    }
}

impl ZoomLimits {
    #[must_use]
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

/// Camera state for pan/zoom.
///
/// `x` / `y` are the world-to-screen translation in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0 }
    }
}

impl Camera {
    /// Build a camera, rejecting states the inverse transform cannot handle.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` for a non-finite offset or a zoom that is not
    /// strictly positive and finite.
    pub fn new(x: f64, y: f64, zoom: f64) -> Result<Self, EngineError> {
        let camera = Self { x, y, zoom };
        camera.validate()?;
        Ok(camera)
    }

    /// Check the invariants without modifying anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` describing the first broken invariant.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(EngineError::InvalidCamera(format!("non-finite pan ({}, {})", self.x, self.y)));
        }
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(EngineError::InvalidCamera(format!("zoom must be positive, got {}", self.zoom)));
        }
        Ok(())
    }

    /// The offset as a point.
    #[must_use]
    pub fn offset(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        coords::to_world(screen, self)
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        coords::to_screen(world, self)
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        coords::screen_dist_to_world(screen_dist, self)
    }

    /// Translate the offset by a screen-space delta.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` if the delta or the resulting offset is non-finite.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Result<(), EngineError> {
        let next = Self { x: self.x + dx, y: self.y + dy, zoom: self.zoom };
        next.validate().inspect_err(|e| warn!(error = %e, dx, dy, "pan rejected"))?;
        *self = next;
        Ok(())
    }

    /// Set the zoom, keeping the world point under `pivot` fixed on screen.
    ///
    /// Returns whether the camera actually changed (false when already pinned
    /// at the clamped target).
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` if `new_zoom` is not positive and finite or the
    /// pivot is non-finite.
    pub fn set_zoom(&mut self, new_zoom: f64, pivot: Point, limits: ZoomLimits) -> Result<bool, EngineError> {
        if !new_zoom.is_finite() || new_zoom <= 0.0 {
            let err = EngineError::InvalidCamera(format!("zoom must be positive, got {new_zoom}"));
            warn!(error = %err, "zoom rejected");
            return Err(err);
        }
        if !pivot.is_finite() {
            return Err(EngineError::InvalidCamera("non-finite zoom pivot".into()));
        }
        let zoom = limits.clamp(new_zoom);
        if (zoom - self.zoom).abs() < f64::EPSILON {
            return Ok(false);
        }
        let offset = coords::zoom_to_cursor(pivot, self, zoom);
        let next = Self { x: offset.x, y: offset.y, zoom };
        next.validate()?;
        *self = next;
        Ok(true)
    }

    /// Multiply the zoom by `factor` around `pivot` (wheel zoom).
    ///
    /// # Errors
    ///
    /// Same as [`Camera::set_zoom`].
    pub fn zoom_by(&mut self, factor: f64, pivot: Point, limits: ZoomLimits) -> Result<bool, EngineError> {
        self.set_zoom(self.zoom * factor, pivot, limits)
    }

    /// Apply a persisted camera.
    ///
    /// The zoom is clamped to `limits`. When `bounds` is given the pan is then
    /// clamped so the world point at the viewport centre (or at the screen
    /// origin while the surface is unmeasured) lies inside the bounds.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCamera` if `saved` breaks the camera invariants; the
    /// current camera is kept.
    pub fn restore(
        &mut self,
        saved: Camera,
        limits: ZoomLimits,
        bounds: Option<&Rect>,
        screen: ScreenSize,
    ) -> Result<(), EngineError> {
        saved.validate().inspect_err(|e| warn!(error = %e, "camera restore rejected"))?;
        let mut next = Self { zoom: limits.clamp(saved.zoom), ..saved };
        if let Some(bounds) = bounds {
            let anchor = if screen.is_known() { screen.center() } else { Point::default() };
            let world = next.screen_to_world(anchor);
            let clamped = Point::new(
                world.x.max(bounds.left).min(bounds.right.max(bounds.left)),
                world.y.max(bounds.top).min(bounds.bottom.max(bounds.top)),
            );
            next.x = anchor.x - clamped.x * next.zoom;
            next.y = anchor.y - clamped.y * next.zoom;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}
