use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use tileworld_common::TileCoord;
use tileworld_kernel::Tile;

use crate::grid::TileGrid;

#[derive(Debug, Default)]
struct Inner {
    /// Reserved or materialized coordinates.
    occupied: HashSet<TileCoord>,
    tiles: HashMap<TileCoord, Arc<Tile>>,
}

/// The resident tile collection shared by the streaming threads and the
/// main loop.
///
/// The occupied set and the tile map sit behind one lock, so a reservation,
/// a publish and a retirement never interleave partially.
#[derive(Debug, Default)]
pub struct ResidentTiles {
    inner: RwLock<Inner>,
}

impl ResidentTiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `coord` for generation. Returns false if it is already
    /// reserved or resident.
    pub fn try_reserve(&self, coord: TileCoord) -> bool {
        self.inner.write().occupied.insert(coord)
    }

    /// Make a generated tile visible. The coordinate stays occupied.
    pub fn publish(&self, tile: Tile) -> Arc<Tile> {
        let coord = tile.coord();
        let tile = Arc::new(tile);
        let mut inner = self.inner.write();
        inner.occupied.insert(coord);
        if inner.tiles.insert(coord, Arc::clone(&tile)).is_some() {
            tracing::warn!(?coord, "replaced a resident tile");
        }
        tile
    }

    /// Drop a reservation, and the tile if it was published.
    pub fn release(&self, coord: TileCoord) -> Option<Arc<Tile>> {
        let mut inner = self.inner.write();
        inner.occupied.remove(&coord);
        inner.tiles.remove(&coord)
    }

    /// Remove every resident tile outside the in-range rule and free its
    /// coordinate. Reservations still being generated are left alone.
    pub fn retire_out_of_range(&self, grid: &TileGrid, center: Vec3, radius: f32) -> Vec<TileCoord> {
        let mut inner = self.inner.write();
        let stale: Vec<TileCoord> = inner
            .tiles
            .keys()
            .filter(|c| !grid.in_range(**c, center, radius))
            .copied()
            .collect();
        for coord in &stale {
            inner.tiles.remove(coord);
            inner.occupied.remove(coord);
        }
        stale
    }

    /// Snapshot of the resident tiles in range of `center`. The lock is only
    /// held while cloning the handles.
    pub fn visible(&self, grid: &TileGrid, center: Vec3, radius: f32) -> Vec<Arc<Tile>> {
        self.inner
            .read()
            .tiles
            .iter()
            .filter(|(c, _)| grid.in_range(**c, center, radius))
            .map(|(_, t)| Arc::clone(t))
            .collect()
    }

    pub fn get(&self, coord: TileCoord) -> Option<Arc<Tile>> {
        self.inner.read().tiles.get(&coord).cloned()
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.inner.read().tiles.contains_key(&coord)
    }

    pub fn is_occupied(&self, coord: TileCoord) -> bool {
        self.inner.read().occupied.contains(&coord)
    }

    pub fn resident_count(&self) -> usize {
        self.inner.read().tiles.len()
    }

    /// Occupied coordinates, including in-flight reservations.
    pub fn occupied_count(&self) -> usize {
        self.inner.read().occupied.len()
    }

    pub fn coords(&self) -> Vec<TileCoord> {
        self.inner.read().tiles.keys().copied().collect()
    }

    /// Drop everything. Returns how many tiles were resident.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let n = inner.tiles.len();
        inner.tiles.clear();
        inner.occupied.clear();
        n
    }
}
