//! JSON input scripts for the headless runner.
//!
//! ```json
//! {
//!   "screen": { "width": 1280, "height": 800 },
//!   "events": [
//!     { "type": "add_image", "image": "img://hero", "x": 640, "y": 400 },
//!     { "type": "wheel", "x": 640, "y": 400, "dy": -120 },
//!     { "type": "key_down", "key": "z", "modifiers": { "ctrl": true } }
//!   ]
//! }
//! ```
//!
//! Coordinates are screen pixels. `button` defaults to `primary` and
//! `modifiers` to none held.

use std::path::Path;

use canvas::coords::ScreenSize;
use canvas::input::{Button, Key, Modifiers, ToolKind};
use serde::Deserialize;

use crate::error::HostError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub screen: Option<ScreenSize>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default = "primary_button")]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default = "primary_button")]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerLeave,
    Wheel {
        x: f64,
        y: f64,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyDown {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    KeyUp {
        key: Key,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// `null` (or a missing `tool`) disarms the active tool.
    SetTool {
        #[serde(default)]
        tool: Option<ToolKind>,
    },
    /// Resolve an image and place it centred on a screen point.
    AddImage { image: String, x: f64, y: f64 },
}

fn primary_button() -> Button {
    Button::Primary
}

/// Parse a script from JSON text.
///
/// # Errors
///
/// Returns `HostError::Script` for malformed JSON or unknown event types.
pub fn parse(text: &str) -> Result<Script, HostError> {
    Ok(serde_json::from_str(text)?)
}

/// Read and parse a script file.
///
/// # Errors
///
/// Returns `HostError::Io` if the file cannot be read, otherwise as [`parse`].
pub fn load(path: &Path) -> Result<Script, HostError> {
    let text = std::fs::read_to_string(path)?;
    parse(&text)
}

/// Parse a `WIDTHxHEIGHT` screen size (e.g. `1280x800`).
///
/// # Errors
///
/// Returns a message when the format is wrong or either side is not positive.
pub fn parse_screen(raw: &str) -> Result<ScreenSize, String> {
    let (w, h) = raw.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: f64 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: f64 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    let size = ScreenSize::new(width, height);
    if !size.is_known() {
        return Err(format!("screen size must be positive, got '{raw}'"));
    }
    Ok(size)
}

#[cfg(test)]
#[path = "script_test.rs"]
mod tests;
