//! Shared value types for the tileworld engine.
//!
//! Tile coordinates, model identifiers, placements and the observer are used
//! by every other crate, so they live here with the transform math they own.

pub mod observer;
pub mod types;

pub use observer::Observer;
pub use types::{ModelId, Placement, TileCoord};
