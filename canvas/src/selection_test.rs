#![allow(clippy::clone_on_copy, clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::doc::{ImageRef, NewItem};

fn item(x: f64, y: f64, z: i64) -> CanvasItem {
    NewItem::new(ImageRef::new("img://s"), x, y).with_size(100.0, 100.0).into_item(Uuid::new_v4(), z).unwrap()
}

fn ids(n: usize) -> Vec<ItemId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

/// `primary` is a member exactly when the selection is non-empty.
fn assert_consistent(sel: &Selection) {
    match sel.primary() {
        Some(p) => assert!(sel.contains(&p), "primary {p} not a member"),
        None => assert!(sel.is_empty(), "members without a primary"),
    }
}

// =============================================================
// Basic operations
// =============================================================

#[test]
fn new_selection_is_empty() {
    let sel = Selection::new();
    assert_eq!(sel.state(), SelectionState::Empty);
    assert!(sel.primary().is_none());
}

#[test]
fn select_one_replaces() {
    let id = ids(2);
    let mut sel = Selection::new();
    sel.select_one(id[0]);
    sel.select_one(id[1]);
    assert_eq!(sel.ids(), &[id[1]]);
    assert_eq!(sel.primary(), Some(id[1]));
    assert_eq!(sel.state(), SelectionState::Single);
}

#[test]
fn toggle_adds_and_makes_primary() {
    let id = ids(2);
    let mut sel = Selection::new();
    sel.toggle(id[0]);
    sel.toggle(id[1]);
    assert_eq!(sel.len(), 2);
    assert_eq!(sel.primary(), Some(id[1]));
    assert_eq!(sel.state(), SelectionState::Multi);
    assert_consistent(&sel);
}

#[test]
fn toggle_off_primary_promotes_last_remaining() {
    let id = ids(3);
    let mut sel = Selection::new();
    for i in &id {
        sel.toggle(*i);
    }
    sel.toggle(id[2]);
    assert_eq!(sel.primary(), Some(id[1]));
    assert_consistent(&sel);
}

#[test]
fn toggle_off_non_primary_keeps_primary() {
    let id = ids(3);
    let mut sel = Selection::new();
    for i in &id {
        sel.toggle(*i);
    }
    sel.toggle(id[0]);
    assert_eq!(sel.primary(), Some(id[2]));
    assert_eq!(sel.ids(), &[id[1], id[2]]);
}

#[test]
fn toggle_off_last_empties() {
    let id = ids(1);
    let mut sel = Selection::new();
    sel.toggle(id[0]);
    sel.toggle(id[0]);
    assert!(sel.is_empty());
    assert!(sel.primary().is_none());
}

#[test]
fn remove_reports_membership() {
    let id = ids(2);
    let mut sel = Selection::new();
    sel.select_one(id[0]);
    assert!(!sel.remove(&id[1]));
    assert!(sel.remove(&id[0]));
    assert!(sel.is_empty());
}

#[test]
fn select_many_last_is_primary() {
    let id = ids(3);
    let mut sel = Selection::new();
    sel.select_many(id.clone());
    assert_eq!(sel.ids(), id.as_slice());
    assert_eq!(sel.primary(), Some(id[2]));
}

#[test]
fn select_many_empty_clears() {
    let id = ids(1);
    let mut sel = Selection::new();
    sel.select_one(id[0]);
    sel.select_many(Vec::new());
    assert!(sel.is_empty());
    assert_consistent(&sel);
}

#[test]
fn retain_drops_missing_and_fixes_primary() {
    let id = ids(3);
    let mut sel = Selection::new();
    sel.select_many(id.clone());
    let gone = id[2];
    assert!(sel.retain(|x| *x != gone));
    assert_eq!(sel.primary(), Some(id[1]));
    assert!(!sel.retain(|_| true));
}

#[test]
fn clear_empties() {
    let id = ids(2);
    let mut sel = Selection::new();
    sel.select_many(id);
    sel.clear();
    assert_eq!(sel.state(), SelectionState::Empty);
    assert_consistent(&sel);
}

#[test]
fn rekey_rewrites_member_and_primary() {
    let id = ids(2);
    let mut sel = Selection::new();
    sel.select_many(id.clone());
    let canonical = Uuid::new_v4();
    sel.rekey(&id[1], canonical);
    assert_eq!(sel.ids(), &[id[0], canonical]);
    assert_eq!(sel.primary(), Some(canonical));
}

// =============================================================
// Rubber band
// =============================================================

#[test]
fn rubber_band_selects_intersecting_items() {
    let a = item(0.0, 0.0, 1);
    let b = item(150.0, 0.0, 2);
    let c = item(1000.0, 1000.0, 3);
    let items = [a.clone(), b.clone(), c.clone()];
    let mut sel = Selection::new();
    sel.rubber_band_update(&Rect::new(50.0, 50.0, 160.0, 60.0), &items, None);
    assert_eq!(sel.len(), 2);
    assert!(sel.contains(&a.id) && sel.contains(&b.id));
    assert_eq!(sel.primary(), Some(b.id));
}

#[test]
fn rubber_band_primary_is_topmost_hit() {
    let top = item(0.0, 0.0, 9);
    let bottom = item(10.0, 10.0, 1);
    let items = [top.clone(), bottom.clone()];
    let mut sel = Selection::new();
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 50.0, 50.0), &items, None);
    assert_eq!(sel.primary(), Some(top.id));
}

#[test]
fn rubber_band_skips_hidden_items() {
    let mut hidden = item(0.0, 0.0, 1);
    hidden.visible = false;
    let items = [hidden];
    let mut sel = Selection::new();
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 50.0, 50.0), &items, None);
    assert!(sel.is_empty());
}

#[test]
fn rubber_band_without_base_replaces() {
    let a = item(0.0, 0.0, 1);
    let far = item(5000.0, 0.0, 2);
    let items = [a.clone(), far.clone()];
    let mut sel = Selection::new();
    sel.select_one(far.id);
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 10.0, 10.0), &items, None);
    assert_eq!(sel.ids(), &[a.id]);
}

#[test]
fn rubber_band_with_base_unions() {
    let a = item(0.0, 0.0, 1);
    let far = item(5000.0, 0.0, 2);
    let items = [a.clone(), far.clone()];
    let mut base = Selection::new();
    base.select_one(far.id);
    let mut sel = base.clone();
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 10.0, 10.0), &items, Some(&base));
    assert_eq!(sel.ids(), &[far.id, a.id]);
    assert_eq!(sel.primary(), Some(a.id));
}

#[test]
fn rubber_band_shrinking_drops_items() {
    let a = item(0.0, 0.0, 1);
    let b = item(300.0, 0.0, 2);
    let items = [a.clone(), b.clone()];
    let mut sel = Selection::new();
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 350.0, 50.0), &items, None);
    assert_eq!(sel.len(), 2);
    sel.rubber_band_update(&Rect::new(0.0, 0.0, 50.0, 50.0), &items, None);
    assert_eq!(sel.ids(), &[a.id]);
    assert_consistent(&sel);
}

#[test]
fn rubber_band_empty_hit_with_base_keeps_base() {
    let a = item(0.0, 0.0, 1);
    let items = [a.clone()];
    let mut base = Selection::new();
    base.select_one(a.id);
    let mut sel = Selection::new();
    sel.rubber_band_update(&Rect::new(900.0, 900.0, 950.0, 950.0), &items, Some(&base));
    assert_eq!(sel, base);
}
