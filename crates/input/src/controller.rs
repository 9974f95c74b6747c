use glam::Vec3;
use serde::{Deserialize, Serialize};
use tileworld_common::Observer;

use crate::{InputSource, Key};

/// Per-frame observer movement from held keys and pointer motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverController {
    /// World units per frame.
    pub speed: f32,
    /// Degrees per unit of pointer motion.
    pub turn_speed: f32,
}

impl Default for ObserverController {
    fn default() -> Self {
        Self {
            speed: 0.3,
            turn_speed: 0.1,
        }
    }
}

impl ObserverController {
    /// Apply one frame of input. Rotation is updated first and the
    /// displacement uses the new angles.
    pub fn apply(&self, observer: &mut Observer, input: &mut impl InputSource) -> Vec3 {
        let step = if input.is_key_down(Key::W) || input.is_key_down(Key::Up) {
            -self.speed
        } else if input.is_key_down(Key::S) || input.is_key_down(Key::Down) {
            self.speed
        } else {
            0.0
        };

        let (dx, dy) = input.take_pointer_delta();
        observer.rotation.x += -dy * self.turn_speed;
        observer.rotation.y += dx * self.turn_speed;

        let pitch = observer.pitch().to_radians();
        let yaw = observer.yaw().to_radians();
        let delta = Vec3::new(-step * yaw.sin(), step * pitch.sin(), step * yaw.cos());
        observer.position += delta;
        delta
    }
}
