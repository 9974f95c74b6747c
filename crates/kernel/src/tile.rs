use glam::Vec3;
use tileworld_common::{ModelId, TileCoord};

use crate::object::SpatialObject;

/// A grid-aligned batch of world geometry generated and retired as a unit.
#[derive(Debug, Clone)]
pub struct Tile {
    coord: TileCoord,
    origin: Vec3,
    objects: Vec<SpatialObject>,
}

impl Tile {
    /// Create a tile at `coord`. The origin is derived from the grid, so two
    /// tiles with the same coordinate always share an origin.
    pub fn new(coord: TileCoord, edge: i32, objects: Vec<SpatialObject>) -> Self {
        Self {
            coord,
            origin: coord.origin(edge),
            objects,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn objects(&self) -> &[SpatialObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Distinct models referenced by this tile, in first-seen order.
    pub fn models(&self) -> Vec<ModelId> {
        let mut seen = Vec::new();
        for obj in &self.objects {
            if !seen.contains(&obj.model()) {
                seen.push(obj.model());
            }
        }
        seen
    }
}
