//! Keyboard bindings and input handling.
//!
//! Centralizes all keyboard shortcuts and key mapping logic.

use marble_viz_core::EffectKind;
use nannou::prelude::*;

/// Synth volume change per `+`/`-` press
pub const VOLUME_STEP: f32 = 0.1;

/// Actions that can be triggered by key presses
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // App-level
    Quit,
    ShowHelp,

    // Transport
    TogglePlayback,
    Stop,

    // Marbles
    SpawnMarble,
    ClearMarbles,
    ToggleAutoSpawn,

    // Effects and output
    ToggleEffect(EffectKind),
    SynthVolume(f32),
    ToggleRecording,
}

/// Parse a key into an action
pub fn parse_key(key: Key) -> Option<Action> {
    match key {
        Key::Q => Some(Action::Quit),
        Key::H => Some(Action::ShowHelp),
        Key::Space => Some(Action::TogglePlayback),
        Key::S => Some(Action::Stop),
        Key::M => Some(Action::SpawnMarble),
        Key::C => Some(Action::ClearMarbles),
        Key::A => Some(Action::ToggleAutoSpawn),
        Key::R => Some(Action::ToggleRecording),
        Key::Key1 | Key::Numpad1 => Some(Action::ToggleEffect(EffectKind::Wave)),
        Key::Key2 | Key::Numpad2 => Some(Action::ToggleEffect(EffectKind::Particle)),
        Key::Key3 | Key::Numpad3 => Some(Action::ToggleEffect(EffectKind::Geometric)),
        Key::Key4 | Key::Numpad4 => Some(Action::ToggleEffect(EffectKind::Fluid)),
        Key::Key5 | Key::Numpad5 => Some(Action::ToggleEffect(EffectKind::Neural)),
        Key::Key0 | Key::Numpad0 => Some(Action::ToggleEffect(EffectKind::Marble)),
        // `=` shares the `+` key on most layouts
        Key::Plus | Key::Equals | Key::NumpadAdd => Some(Action::SynthVolume(VOLUME_STEP)),
        Key::Minus | Key::NumpadSubtract => Some(Action::SynthVolume(-VOLUME_STEP)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_keys() {
        let expected = [
            (Key::Key1, EffectKind::Wave),
            (Key::Key2, EffectKind::Particle),
            (Key::Key3, EffectKind::Geometric),
            (Key::Key4, EffectKind::Fluid),
            (Key::Key5, EffectKind::Neural),
            (Key::Key0, EffectKind::Marble),
        ];
        for (key, kind) in expected {
            assert_eq!(parse_key(key), Some(Action::ToggleEffect(kind)));
        }
    }

    #[test]
    fn test_volume_keys() {
        assert_eq!(parse_key(Key::Equals), Some(Action::SynthVolume(VOLUME_STEP)));
        assert_eq!(parse_key(Key::Minus), Some(Action::SynthVolume(-VOLUME_STEP)));
    }

    #[test]
    fn test_unbound_key() {
        assert_eq!(parse_key(Key::Z), None);
        assert_eq!(parse_key(Key::Key9), None);
    }
}
