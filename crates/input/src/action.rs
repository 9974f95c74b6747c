use crate::Key;

/// Window-level actions triggered by a key press, as opposed to held keys
/// that steer the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave the main loop and shut down.
    Quit,
    /// Capture or release the pointer.
    ToggleGrab,
}

impl Action {
    pub fn for_key(key: Key) -> Option<Self> {
        match key {
            Key::Escape => Some(Self::Quit),
            Key::E => Some(Self::ToggleGrab),
            _ => None,
        }
    }
}
