//! Viewport culling.
//!
//! Filters items down to those whose unrotated bounding box overlaps the
//! padded world-space viewport. The padding keeps items just outside the
//! screen alive during fast pans so they do not pop in.
//!
//! Culling is O(n) over the input and allocates only the output vector.

#[cfg(test)]
#[path = "cull_test.rs"]
mod cull_test;

use crate::camera::Camera;
use crate::coords::{self, Point, Rect, ScreenSize};
use crate::doc::CanvasItem;

/// World-space rectangle covered by the screen, or `None` while the surface
/// size is unknown.
#[must_use]
pub fn viewport_rect(camera: &Camera, screen: ScreenSize) -> Option<Rect> {
    if !screen.is_known() {
        return None;
    }
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(screen.width, 0.0),
        Point::new(0.0, screen.height),
        Point::new(screen.width, screen.height),
    ]
    .map(|p| coords::to_world(p, camera));

    let mut rect = Rect::from_corners(corners[0], corners[3]);
    for corner in &corners[1..3] {
        rect = rect.union(&Rect::from_corners(*corner, *corner));
    }
    Some(rect)
}

/// Items intersecting the viewport grown by `padding` world units.
///
/// Returns every item when the screen size is zero or unknown; showing too
/// much beats showing nothing. Input order is preserved.
#[must_use]
pub fn cull<'a, I>(items: I, camera: &Camera, screen: ScreenSize, padding: f64) -> Vec<&'a CanvasItem>
where
    I: IntoIterator<Item = &'a CanvasItem>,
{
    let Some(viewport) = viewport_rect(camera, screen) else {
        return items.into_iter().collect();
    };
    let padded = viewport.expand(padding.max(0.0));
    items
        .into_iter()
        .filter(|item| padded.intersects(&item.bounds()))
        .collect()
}
