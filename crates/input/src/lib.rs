//! Desktop input mapped to observer movement and window actions.
//!
//! # Invariants
//! - Movement reads input through [`InputSource`] only, so the same rule
//!   runs against a window, a script, or a test fake.
//! - Pointer motion steers the observer only while the pointer is grabbed.

pub mod action;
pub mod controller;

use std::collections::HashSet;

pub use action::Action;
pub use controller::ObserverController;

/// Keys the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    S,
    Up,
    Down,
    E,
    Escape,
}

/// Per-frame view of keyboard and pointer state.
pub trait InputSource {
    fn is_key_down(&self, key: Key) -> bool;

    /// Pointer motion since the last call, `y` growing upward. Consumes it.
    fn take_pointer_delta(&mut self) -> (f32, f32);
}

/// Held keys plus accumulated pointer motion, fed from window events.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    pointer: (f32, f32),
    grabbed: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns the action it triggers, if this press is
    /// not a repeat of a key already held.
    pub fn press(&mut self, key: Key) -> Option<Action> {
        if self.held.insert(key) {
            Action::for_key(key)
        } else {
            None
        }
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Accumulate pointer motion. Ignored unless grabbed.
    pub fn add_pointer_delta(&mut self, dx: f32, dy: f32) {
        if self.grabbed {
            self.pointer.0 += dx;
            self.pointer.1 += dy;
        }
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn set_grabbed(&mut self, grabbed: bool) {
        self.grabbed = grabbed;
        if !grabbed {
            self.pointer = (0.0, 0.0);
        }
        tracing::debug!(grabbed, "pointer grab changed");
    }

    pub fn toggle_grab(&mut self) -> bool {
        self.set_grabbed(!self.grabbed);
        self.grabbed
    }

    /// Drop all held keys, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
        self.pointer = (0.0, 0.0);
    }
}

impl InputSource for InputState {
    fn is_key_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    fn take_pointer_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_reports_action_once() {
        let mut input = InputState::new();
        assert_eq!(input.press(Key::Escape), Some(Action::Quit));
        assert_eq!(input.press(Key::Escape), None);
        input.release(Key::Escape);
        assert_eq!(input.press(Key::Escape), Some(Action::Quit));
        assert!(input.is_key_down(Key::Escape));
    }

    #[test]
    fn pointer_ignored_until_grabbed() {
        let mut input = InputState::new();
        input.add_pointer_delta(5.0, 5.0);
        assert_eq!(input.take_pointer_delta(), (0.0, 0.0));

        assert!(input.toggle_grab());
        input.add_pointer_delta(3.0, -1.0);
        input.add_pointer_delta(1.0, -1.0);
        assert_eq!(input.take_pointer_delta(), (4.0, -2.0));
        assert_eq!(input.take_pointer_delta(), (0.0, 0.0));
    }

    #[test]
    fn releasing_grab_drops_pending_motion() {
        let mut input = InputState::new();
        input.set_grabbed(true);
        input.add_pointer_delta(10.0, 0.0);
        input.toggle_grab();
        assert_eq!(input.take_pointer_delta(), (0.0, 0.0));
    }
}
