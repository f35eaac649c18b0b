//! End-to-end: drive the engine the way a host would and check what a user
//! would see.
#![allow(clippy::float_cmp)]

use canvas::camera::Camera;
use canvas::coords::{Point, ScreenSize};
use canvas::cull;
use canvas::doc::{ImageRef, ItemPatch, NewItem};
use canvas::engine::{Action, EngineCore};
use canvas::input::{Button, Key, Mode, Modifiers, WheelDelta};
use canvas::selection::SelectionState;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[test]
fn pan_then_zoom_keeps_cursor_anchor_and_item_visible() {
    let mut core = EngineCore::new();
    core.set_viewport(800.0, 600.0);
    assert_eq!(core.camera(), Camera { x: 0.0, y: 0.0, zoom: 1.0 });

    let (a, _) = core
        .add_item(NewItem::new(ImageRef::new("img://a"), 0.0, 0.0).with_size(100.0, 100.0))
        .unwrap();

    core.pan_by(-50.0, -50.0).unwrap();
    let cursor = Point::new(200.0, 200.0);
    let anchored = core.camera().screen_to_world(cursor);
    assert!(approx_eq(anchored.x, 250.0) && approx_eq(anchored.y, 250.0));

    core.set_zoom(2.0, cursor).unwrap();
    let after = core.camera().screen_to_world(cursor);
    assert!(approx_eq(after.x, anchored.x) && approx_eq(after.y, anchored.y));

    let camera = core.camera();
    let screen = ScreenSize::new(800.0, 600.0);
    let items = core.items();
    let visible = cull::cull(items.iter().copied(), &camera, screen, 200.0);
    assert!(visible.iter().any(|item| item.id == a));
    assert_eq!(core.render_list()[0].id, a);
}

#[test]
fn editing_session_round_trip() {
    let mut core = EngineCore::new();
    core.set_viewport(1024.0, 768.0);
    let none = Modifiers::default();

    let (a, _) = core.add_item(NewItem::new(ImageRef::new("img://a"), 0.0, 0.0).with_size(200.0, 200.0)).unwrap();
    let (b, _) = core.add_item(NewItem::new(ImageRef::new("img://b"), 400.0, 0.0).with_size(200.0, 200.0)).unwrap();

    // Rubber band both, then drag them together.
    let shift = Modifiers { shift: true, ..Default::default() };
    core.on_pointer_down(Point::new(-20.0, 300.0), Button::Primary, shift);
    core.on_pointer_move(Point::new(700.0, 100.0), shift);
    core.on_pointer_up(Point::new(700.0, 100.0), Button::Primary, shift);
    assert_eq!(core.selection().state(), SelectionState::Multi);

    core.on_pointer_down(Point::new(100.0, 100.0), Button::Primary, none);
    core.on_pointer_move(Point::new(150.0, 100.0), none);
    let actions = core.on_pointer_up(Point::new(150.0, 100.0), Button::Primary, none);
    let updates = actions.iter().filter(|a| matches!(a, Action::ItemUpdated { .. })).count();
    assert_eq!(updates, 2);
    assert_eq!(core.item(&a).unwrap().x, 50.0);
    assert_eq!(core.item(&b).unwrap().x, 450.0);

    // Wheel zoom, then delete the primary and undo everything back.
    core.on_wheel(Point::new(512.0, 384.0), WheelDelta { dx: 0.0, dy: -120.0 }, none);
    assert!(core.camera().zoom > 1.0);

    core.patch_item(&b, &ItemPatch { rotation: Some(15.0), ..Default::default() }).unwrap();
    core.on_key_down(Key::new("Delete"), none);
    assert_eq!(core.item_count(), 0);
    assert!(core.selection().is_empty());

    let ctrl = Modifiers { ctrl: true, ..Default::default() };
    core.on_key_down(Key::new("z"), ctrl);
    core.on_key_down(Key::new("z"), ctrl);
    core.on_key_down(Key::new("z"), ctrl);
    assert_eq!(core.item(&a).unwrap().x, 0.0);
    assert_eq!(core.item(&b).unwrap().rotation, 0.0);
    assert_eq!(core.mode(), Mode::Idle);
}
