//! Headless host for the canvas engine.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Env-driven host and engine tunables |
//! | [`error`] | Host error type |
//! | [`script`] | JSON input scripts replayed by `artboard run` |
//! | [`services`] | Background persistence workers and in-memory stores |
//! | [`session`] | One engine bound to one project and its collaborators |

pub mod config;
pub mod error;
pub mod script;
pub mod services;
pub mod session;
