use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// The viewpoint that drives both streaming radius and the view transform.
///
/// Rotation is stored in degrees: `x` is pitch, `y` is yaw, `z` is roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Default for Observer {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 0.0),
            rotation: Vec3::ZERO,
        }
    }
}

impl Observer {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    pub fn pitch(&self) -> f32 {
        self.rotation.x
    }

    pub fn yaw(&self) -> f32 {
        self.rotation.y
    }

    /// World-to-view transform: `Rx(-pitch) · Ry(-yaw) · Rz(-roll) · T(-position)`.
    ///
    /// Rotation is applied after translation; rotating the translated camera
    /// position instead would orbit the world around the origin.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(-self.rotation.x.to_radians())
            * Mat4::from_rotation_y(-self.rotation.y.to_radians())
            * Mat4::from_rotation_z(-self.rotation.z.to_radians())
            * Mat4::from_translation(-self.position)
    }

    /// The observer's own placement in the world, the inverse of [`view_matrix`](Self::view_matrix).
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
    }
}
