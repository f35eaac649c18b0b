#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::coords::Point;
use crate::doc::{ItemId, ItemStore};

/// Topmost visible item whose unrotated bounds contain `world_pt`.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &ItemStore) -> Option<ItemId> {
    doc.sorted_items()
        .into_iter()
        .rev()
        .find(|item| item.visible && item.bounds().contains_point(world_pt))
        .map(|item| item.id)
}
