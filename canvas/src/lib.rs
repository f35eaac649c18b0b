//! Interaction and viewport engine for an infinite image canvas.
//!
//! The engine owns the full lifecycle of the canvas state: translating raw
//! pointer, wheel and keyboard events into item mutations, maintaining the
//! pan/zoom camera, culling items to the viewport, tracking the selection,
//! and keeping a bounded undo/redo history. It draws nothing and performs no
//! I/O. The host wires platform events in, draws [`engine::EngineCore::render_list`],
//! and forwards the returned [`engine::Action`]s to the collaborators in
//! [`persist`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Interaction controller: [`engine::EngineCore`], actions and change notification |
//! | [`coords`] | Points, rectangles and screen/world conversions |
//! | [`camera`] | Pan/zoom camera with validated transitions |
//! | [`doc`] | Canvas items, sparse patches and the item store |
//! | [`cull`] | Viewport culling |
//! | [`hit`] | Hit-testing against items |
//! | [`selection`] | Single, multi and rubber-band selection |
//! | [`history`] | Bounded undo/redo over snapshots |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`persist`] | Collaborator traits for persistence and image metadata |
//! | [`config`] | Engine tunables |
//! | [`error`] | Engine error type |
//! | [`consts`] | Shared numeric constants (zoom limits, padding, history depth) |

pub mod camera;
pub mod config;
pub mod consts;
pub mod coords;
pub mod cull;
pub mod doc;
pub mod engine;
pub mod error;
pub mod history;
pub mod hit;
pub mod input;
pub mod persist;
pub mod selection;
