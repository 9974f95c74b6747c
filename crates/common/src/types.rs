use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Identifier of a drawable model in the model registry.
///
/// Spatial objects hold this instead of the model itself; the registry owns
/// the geometry/material pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

/// A tile-grid coordinate on the horizontal plane (Y is not partitioned).
///
/// The world-space origin of the tile is `coord * edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World-space origin of this tile for the given edge length.
    pub fn origin(self, edge: i32) -> Vec3 {
        Vec3::new((self.x * edge) as f32, 0.0, (self.z * edge) as f32)
    }

    /// Chebyshev distance in grid cells.
    pub fn ring_distance(self, other: TileCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }
}

/// Position, per-axis rotation in degrees and uniform scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Vec3,
    /// Rotation angles in degrees around X, Y and Z.
    pub rotation: Vec3,
    pub scale: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl Placement {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Model-to-world transform.
    ///
    /// Composition is `T · Rx · Ry · Rz · S`: translation outermost, scale
    /// innermost. Changing the order changes where rotated objects land.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn placement_default_is_identity() {
        let p = Placement::default();
        assert_eq!(p.model_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translate_is_outermost_and_scale_innermost() {
        let p = Placement {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.0, 90.0, 0.0),
            scale: 2.0,
        };
        let world = p.model_matrix().transform_point3(Vec3::X);
        assert!(approx(world, Vec3::new(1.0, 2.0, 1.0)), "got {world:?}");
    }

    #[test]
    fn rotation_order_is_x_then_y_then_z() {
        let p = Placement {
            rotation: Vec3::new(90.0, 90.0, 0.0),
            ..Placement::default()
        };
        // Ry first takes +Z to +X, then Rx leaves +X alone.
        let world = p.model_matrix().transform_point3(Vec3::Z);
        assert!(approx(world, Vec3::X), "got {world:?}");
    }

    #[test]
    fn tile_origin_is_edge_multiple() {
        let c = TileCoord::new(-2, 3);
        assert_eq!(c.origin(16), Vec3::new(-32.0, 0.0, 48.0));
    }

    #[test]
    fn ring_distance_is_chebyshev() {
        let a = TileCoord::new(0, 0);
        assert_eq!(a.ring_distance(TileCoord::new(3, -1)), 3);
        assert_eq!(a.ring_distance(TileCoord::new(-2, -4)), 4);
    }
}
