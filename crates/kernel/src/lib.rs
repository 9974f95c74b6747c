//! World Kernel: tiles, the spatial objects they hold, and tile generators.
//!
//! # Invariants
//! - A tile's origin is always `coord * edge`; objects are placed inside it.
//! - Object state changes only through the delta operations on [`SpatialObject`].
//! - Generators fail with [`KernelError::Allocation`] instead of aborting when
//!   memory for a tile cannot be reserved.

pub mod generate;
pub mod object;
pub mod tile;

pub use generate::{CheckerGenerator, FlatGenerator, TileGenerator};
pub use object::SpatialObject;
pub use tile::Tile;

use tileworld_common::TileCoord;

/// Errors from tile construction.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("could not reserve {count} objects for tile {coord:?}")]
    Allocation { coord: TileCoord, count: usize },

    #[error("tile edge must be positive, got {0}")]
    InvalidEdge(i32),
}
