//! Input handling
//!
//! Windows expose raw key and mouse state through [`InputState`]. The
//! [`InputManager`] turns that level-triggered state into per-frame edges so
//! toggles fire once per press.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Level-triggered keyboard and mouse state
pub trait InputState {
    /// Whether `key` is currently held
    fn is_key_pressed(&self, key: KeyCode) -> bool;

    /// Whether `button` is currently held
    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool;

    /// Cursor position in window coordinates
    fn cursor_position(&self) -> (f64, f64);

    /// Hide and lock the cursor while `captured` is true
    fn set_cursor_captured(&mut self, captured: bool);
}

/// Tracks which keys went down since the previous frame
#[derive(Debug, Default)]
pub struct InputManager {
    held: HashSet<KeyCode>,
    pressed_this_frame: HashSet<KeyCode>,
}

impl InputManager {
    /// Create a manager with no keys held
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample `input` once per frame
    pub fn update(&mut self, input: &dyn InputState) {
        self.pressed_this_frame.clear();
        for &key in KeyCode::ALL {
            let down = input.is_key_pressed(key);
            if down && self.held.insert(key) {
                self.pressed_this_frame.insert(key);
            } else if !down {
                self.held.remove(&key);
            }
        }
    }

    /// Whether `key` went down during the last `update`
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.pressed_this_frame.contains(&key)
    }

    /// Whether `key` was held at the last `update`
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }
}

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    /// A key
    A,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// G key
    G,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// M key
    M,
    /// N key
    N,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// V key
    V,
    /// W key
    W,
    /// Space key
    Space,
    /// Escape key
    Escape,
    /// Left shift
    LeftShift,
    /// `=` / `+` key
    Equal,
    /// `-` key
    Minus,
    /// `[` key
    LeftBracket,
    /// `]` key
    RightBracket,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
}

impl KeyCode {
    /// Every key the engine knows about
    pub const ALL: &'static [KeyCode] = &[
        Self::A,
        Self::C,
        Self::D,
        Self::E,
        Self::G,
        Self::I,
        Self::J,
        Self::K,
        Self::M,
        Self::N,
        Self::P,
        Self::Q,
        Self::R,
        Self::S,
        Self::T,
        Self::V,
        Self::W,
        Self::Space,
        Self::Escape,
        Self::LeftShift,
        Self::Equal,
        Self::Minus,
        Self::LeftBracket,
        Self::RightBracket,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
    ];
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

/// Camera movement bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMappings {
    /// Strafe left
    pub move_left: KeyCode,
    /// Strafe right
    pub move_right: KeyCode,
    /// Move along the view direction
    pub move_forward: KeyCode,
    /// Move against the view direction
    pub move_backward: KeyCode,
    /// Move up (world -y)
    pub move_up: KeyCode,
    /// Move down (world +y)
    pub move_down: KeyCode,
    /// Hold to add the speed boost
    pub speed_boost: KeyCode,
    /// Hold to look around with the mouse
    pub look: MouseButton,
}

impl Default for KeyMappings {
    fn default() -> Self {
        Self {
            move_left: KeyCode::A,
            move_right: KeyCode::D,
            move_forward: KeyCode::W,
            move_backward: KeyCode::S,
            move_up: KeyCode::E,
            move_down: KeyCode::Q,
            speed_boost: KeyCode::LeftShift,
            look: MouseButton::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeInput {
        keys: HashSet<KeyCode>,
    }

    impl InputState for FakeInput {
        fn is_key_pressed(&self, key: KeyCode) -> bool {
            self.keys.contains(&key)
        }
        fn is_mouse_button_pressed(&self, _button: MouseButton) -> bool {
            false
        }
        fn cursor_position(&self) -> (f64, f64) {
            (0.0, 0.0)
        }
        fn set_cursor_captured(&mut self, _captured: bool) {}
    }

    #[test]
    fn test_press_fires_once() {
        let mut input = FakeInput::default();
        let mut manager = InputManager::new();

        input.keys.insert(KeyCode::G);
        manager.update(&input);
        assert!(manager.just_pressed(KeyCode::G));

        manager.update(&input);
        assert!(!manager.just_pressed(KeyCode::G));
        assert!(manager.is_held(KeyCode::G));

        input.keys.clear();
        manager.update(&input);
        input.keys.insert(KeyCode::G);
        manager.update(&input);
        assert!(manager.just_pressed(KeyCode::G));
    }
}
