use glam::Vec3;
use tileworld_common::{ModelId, TileCoord};

use crate::object::SpatialObject;
use crate::tile::Tile;
use crate::KernelError;

/// Produces the content of a tile. Called from the streaming threads, so
/// implementations must be shareable.
pub trait TileGenerator: Send + Sync {
    fn generate(&self, coord: TileCoord, edge: i32) -> Result<Tile, KernelError>;
}

/// Reserve room for a dense `edge × edge` layer without aborting on
/// exhaustion.
fn reserve_layer(coord: TileCoord, edge: i32) -> Result<Vec<SpatialObject>, KernelError> {
    if edge <= 0 {
        return Err(KernelError::InvalidEdge(edge));
    }
    let count = (edge as usize) * (edge as usize);
    let mut objects = Vec::new();
    objects
        .try_reserve_exact(count)
        .map_err(|_| {
            tracing::warn!(?coord, count, "tile reservation failed");
            KernelError::Allocation { coord, count }
        })?;
    Ok(objects)
}

/// A single flat layer of one model at unit spacing.
#[derive(Debug, Clone, Copy)]
pub struct FlatGenerator {
    pub model: ModelId,
    pub ground: f32,
}

impl FlatGenerator {
    pub fn new(model: ModelId) -> Self {
        Self { model, ground: 0.0 }
    }
}

impl TileGenerator for FlatGenerator {
    fn generate(&self, coord: TileCoord, edge: i32) -> Result<Tile, KernelError> {
        let mut objects = reserve_layer(coord, edge)?;
        let origin = coord.origin(edge);
        for i in 0..edge {
            for j in 0..edge {
                let pos = origin + Vec3::new(i as f32, self.ground, j as f32);
                objects.push(SpatialObject::at(self.model, pos));
            }
        }
        Ok(Tile::new(coord, edge, objects))
    }
}

/// A flat layer alternating two models on a world-space checkerboard.
#[derive(Debug, Clone, Copy)]
pub struct CheckerGenerator {
    pub even: ModelId,
    pub odd: ModelId,
    pub ground: f32,
}

impl CheckerGenerator {
    pub fn new(even: ModelId, odd: ModelId) -> Self {
        Self {
            even,
            odd,
            ground: 0.0,
        }
    }
}

impl TileGenerator for CheckerGenerator {
    fn generate(&self, coord: TileCoord, edge: i32) -> Result<Tile, KernelError> {
        let mut objects = reserve_layer(coord, edge)?;
        let origin = coord.origin(edge);
        for i in 0..edge {
            for j in 0..edge {
                let wx = coord.x * edge + i;
                let wz = coord.z * edge + j;
                let model = if (wx + wz).rem_euclid(2) == 0 {
                    self.even
                } else {
                    self.odd
                };
                let pos = origin + Vec3::new(i as f32, self.ground, j as f32);
                objects.push(SpatialObject::at(model, pos));
            }
        }
        Ok(Tile::new(coord, edge, objects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_tile_is_dense_grid_at_unit_spacing() {
        let generator = FlatGenerator::new(ModelId(7));
        let tile = generator.generate(TileCoord::new(2, -1), 16).unwrap();

        assert_eq!(tile.len(), 256);
        assert_eq!(tile.origin(), Vec3::new(32.0, 0.0, -16.0));
        assert_eq!(tile.objects()[0].position(), tile.origin());
        assert_eq!(
            tile.objects()[255].position(),
            tile.origin() + Vec3::new(15.0, 0.0, 15.0)
        );
        assert!(tile.objects().iter().all(|o| o.model() == ModelId(7)));
    }

    #[test]
    fn objects_stay_inside_their_tile() {
        let tile = FlatGenerator::new(ModelId(0))
            .generate(TileCoord::new(-3, 4), 8)
            .unwrap();
        let o = tile.origin();
        for obj in tile.objects() {
            let p = obj.position();
            assert!(p.x >= o.x && p.x < o.x + 8.0);
            assert!(p.z >= o.z && p.z < o.z + 8.0);
        }
    }

    #[test]
    fn checker_alternates_models_across_tiles() {
        let generator = CheckerGenerator::new(ModelId(0), ModelId(1));
        let tile = generator.generate(TileCoord::new(0, 0), 4).unwrap();
        let evens = tile
            .objects()
            .iter()
            .filter(|o| o.model() == ModelId(0))
            .count();
        assert_eq!(evens, 8);
        assert_eq!(tile.models().len(), 2);

        // Negative tiles continue the same world-space pattern.
        let west = generator.generate(TileCoord::new(-1, 0), 4).unwrap();
        let last = west.objects().last().unwrap();
        // world (-1, 3)
        assert_eq!(last.model(), ModelId(0));
        let first = west.objects().first().unwrap();
        // world (-4, 0)
        assert_eq!(first.model(), ModelId(0));
        assert_eq!(west.objects()[1].model(), ModelId(1));
    }

    #[test]
    fn non_positive_edge_is_rejected() {
        let err = FlatGenerator::new(ModelId(0))
            .generate(TileCoord::new(0, 0), 0)
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidEdge(0)));
    }
}
