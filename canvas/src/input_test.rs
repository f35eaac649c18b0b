use super::*;

// =============================================================
// ToolKind
// =============================================================

#[test]
fn tool_kind_serde_lowercase() {
    assert_eq!(serde_json::to_string(&ToolKind::Frame).unwrap(), "\"frame\"");
    let brush: ToolKind = serde_json::from_str("\"brush\"").unwrap();
    assert_eq!(brush, ToolKind::Brush);
}

// =============================================================
// Modifiers
// =============================================================

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
    assert!(!m.command());
    assert!(!m.selecting());
}

#[test]
fn command_is_ctrl_or_meta() {
    assert!(Modifiers { ctrl: true, ..Default::default() }.command());
    assert!(Modifiers { meta: true, ..Default::default() }.command());
    assert!(!Modifiers { alt: true, ..Default::default() }.command());
}

#[test]
fn selecting_includes_shift() {
    assert!(Modifiers { shift: true, ..Default::default() }.selecting());
    assert!(Modifiers { meta: true, ..Default::default() }.selecting());
    assert!(!Modifiers { alt: true, ..Default::default() }.selecting());
}

#[test]
fn modifiers_deserialize_partial() {
    let m: Modifiers = serde_json::from_str(r#"{"shift": true}"#).unwrap();
    assert_eq!(m, Modifiers { shift: true, ..Default::default() });
}

// =============================================================
// Key / Button
// =============================================================

#[test]
fn pan_trigger_names() {
    assert!(Key::new(" ").is_pan_trigger());
    assert!(Key::new("Space").is_pan_trigger());
    assert!(Key::new("Spacebar").is_pan_trigger());
    assert!(!Key::new("Escape").is_pan_trigger());
}

#[test]
fn key_as_str() {
    assert_eq!(Key::new("Delete").as_str(), "Delete");
}

#[test]
fn button_serde() {
    let b: Button = serde_json::from_str("\"middle\"").unwrap();
    assert_eq!(b, Button::Middle);
}

// =============================================================
// InputState
// =============================================================

#[test]
fn input_state_default_is_idle() {
    assert_eq!(InputState::default().mode(), Mode::Idle);
}

#[test]
fn input_state_modes() {
    let p = Point::new(0.0, 0.0);
    assert_eq!(InputState::Panning { last_screen: p, resume: Some(ToolKind::Brush) }.mode(), Mode::Panning);
    let band = InputState::RubberBand { origin_world: p, current_world: p, base: None, before: Selection::new() };
    assert_eq!(band.mode(), Mode::RubberBandSelecting);
    let drag = InputState::DraggingItems { start_world: p, origins: Vec::new() };
    assert_eq!(drag.mode(), Mode::DraggingItems);
    let draw = InputState::Drawing { tool: ToolKind::Brush, gesture: None, before: Selection::new() };
    assert_eq!(draw.mode(), Mode::DrawingTool(ToolKind::Brush));
}
