use glam::Vec3;
use tileworld_common::TileCoord;

use crate::StreamError;
use crate::config::MAX_TILES_IN_RANGE;

/// Square tile grid on the XZ plane. Tile `(x, z)` has its origin at
/// `(x * edge, 0, z * edge)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    edge: i32,
}

impl TileGrid {
    pub fn new(edge: i32) -> Self {
        assert!(edge > 0, "tile edge must be positive");
        Self { edge }
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    /// The tile containing a world position.
    pub fn coord_of(&self, pos: Vec3) -> TileCoord {
        let e = self.edge as f32;
        TileCoord::new((pos.x / e).floor() as i32, (pos.z / e).floor() as i32)
    }

    pub fn origin(&self, coord: TileCoord) -> Vec3 {
        coord.origin(self.edge)
    }

    /// Horizontal in-range rule: both axis distances from `center` to the
    /// tile origin are at most `radius`. Inclusive at the boundary.
    pub fn in_range(&self, coord: TileCoord, center: Vec3, radius: f32) -> bool {
        let o = self.origin(coord);
        (o.x - center.x).abs() <= radius && (o.z - center.z).abs() <= radius
    }

    /// Every tile whose origin is in range of `center`, nearest ring first.
    ///
    /// Within a ring, order is by `z` then `x` so the result is deterministic.
    /// Ranges holding more than [`MAX_TILES_IN_RANGE`] tiles are rejected.
    pub fn coords_in_range(
        &self,
        center: Vec3,
        radius: f32,
    ) -> Result<Vec<TileCoord>, StreamError> {
        let e = self.edge as f32;
        let (x0, x1) = axis_span(center.x, radius, e);
        let (z0, z1) = axis_span(center.z, radius, e);
        if x0 > x1 || z0 > z1 {
            return Ok(Vec::new());
        }

        let span = |lo: i32, hi: i32| (i64::from(hi) - i64::from(lo) + 1) as u64;
        let tiles = span(x0, x1)
            .checked_mul(span(z0, z1))
            .unwrap_or(u64::MAX);
        if tiles > MAX_TILES_IN_RANGE as u64 {
            return Err(StreamError::RangeTooLarge { tiles });
        }
        let mut coords = Vec::new();
        coords
            .try_reserve_exact(tiles as usize)
            .map_err(|_| StreamError::RangeTooLarge { tiles })?;
        for z in z0..=z1 {
            for x in x0..=x1 {
                coords.push(TileCoord::new(x, z));
            }
        }
        let here = self.coord_of(center);
        coords.sort_by_key(|c| (c.ring_distance(here), c.z, c.x));
        Ok(coords)
    }
}

/// Inclusive range of grid indices whose origin lies in `[c - r, c + r]`.
fn axis_span(c: f32, r: f32, edge: f32) -> (i32, i32) {
    (((c - r) / edge).ceil() as i32, ((c + r) / edge).floor() as i32)
}
