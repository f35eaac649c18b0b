//! Coordinate system: points, rectangles, and screen/world conversions.
//!
//! World space is the infinite plane items live on. Screen space is CSS pixels
//! of the visible surface. The mapping between them is fully described by a
//! [`Camera`]: `screen = world * zoom + offset`.
//!
//! Everything here is pure. Callers guard against non-finite input; the
//! camera model guarantees `zoom > 0` so the inverse transform never divides
//! by zero.

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;

use serde::{Deserialize, Serialize};

use crate::camera::Camera;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both components are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Size of the rendering surface in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A surface is usable once both dimensions are known, finite and positive.
    ///
    /// Before the host has measured the surface (startup race) this is false.
    #[must_use]
    pub fn is_known(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Screen-space centre of the surface.
    #[must_use]
    pub fn center(self) -> Point {
        Point::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Axis-aligned rectangle given by its four edges.
///
/// `top < bottom` in both spaces (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    #[must_use]
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Rectangle from an origin and a size.
    #[must_use]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { left: x, top: y, right: x + width, bottom: y + height }
    }

    /// Normalized rectangle spanning two arbitrary corners (drag start/end).
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) * 0.5, (self.top + self.bottom) * 0.5)
    }

    /// Grow the rectangle by `amount` on every side.
    #[must_use]
    pub fn expand(&self, amount: f64) -> Self {
        Self {
            left: self.left - amount,
            top: self.top - amount,
            right: self.right + amount,
            bottom: self.bottom + amount,
        }
    }

    /// Overlap test. Touching edges count as intersecting.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.right < self.left || other.left > self.right || other.bottom < self.top || other.top > self.bottom)
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Convert a screen-space point to world space: `(screen - offset) / zoom`.
#[must_use]
pub fn to_world(screen: Point, camera: &Camera) -> Point {
    Point {
        x: (screen.x - camera.x) / camera.zoom,
        y: (screen.y - camera.y) / camera.zoom,
    }
}

/// Convert a world-space point to screen space: `world * zoom + offset`.
#[must_use]
pub fn to_screen(world: Point, camera: &Camera) -> Point {
    Point {
        x: world.x * camera.zoom + camera.x,
        y: world.y * camera.zoom + camera.y,
    }
}

/// Convert a screen-space distance (pixels) to a world-space distance.
#[must_use]
pub fn screen_dist_to_world(screen_dist: f64, camera: &Camera) -> f64 {
    screen_dist / camera.zoom
}

/// Camera offset that keeps the world point under `cursor` fixed when the
/// zoom changes from `old.zoom` to `new_zoom`.
///
/// Per axis: `cursor - (cursor - old_offset) * (new_zoom / old_zoom)`.
#[must_use]
pub fn zoom_to_cursor(cursor: Point, old: &Camera, new_zoom: f64) -> Point {
    let ratio = new_zoom / old.zoom;
    Point {
        x: cursor.x - (cursor.x - old.x) * ratio,
        y: cursor.y - (cursor.y - old.y) * ratio,
    }
}

/// Map a screen rectangle to world space by converting its corners.
#[must_use]
pub fn screen_rect_to_world(rect: &Rect, camera: &Camera) -> Rect {
    let a = to_world(Point::new(rect.left, rect.top), camera);
    let b = to_world(Point::new(rect.right, rect.bottom), camera);
    Rect::from_corners(a, b)
}

/// Map a world rectangle to screen space by converting its corners.
#[must_use]
pub fn world_rect_to_screen(rect: &Rect, camera: &Camera) -> Rect {
    let a = to_screen(Point::new(rect.left, rect.top), camera);
    let b = to_screen(Point::new(rect.right, rect.bottom), camera);
    Rect::from_corners(a, b)
}
