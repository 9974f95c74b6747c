//! Streaming: keeps tiles resident around a moving observer.
//!
//! Two background loops share a [`ResidentTiles`] collection. The generation
//! loop fills missing grid cells within the streaming radius, nearest first.
//! The retirement loop drops tiles that fell out of range.
//!
//! # Invariants
//! - No two resident tiles share a coordinate.
//! - A tile is in range iff both horizontal axis distances from its origin
//!   to the observer are at most the radius.
//! - Generation failure is reported over the error channel, never swallowed.

mod config;
mod grid;
mod resident;
mod stats;
mod streamer;

pub use config::StreamConfig;
pub use grid::TileGrid;
pub use resident::ResidentTiles;
pub use stats::{FrameTimer, StreamStats};
pub use streamer::{ObserverFeed, StreamActivity, StreamerHandle, WorldStreamer};

use tileworld_common::TileCoord;
use tileworld_kernel::KernelError;

/// Errors from the streaming subsystem.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("out of memory building tile {coord:?} ({count} objects)")]
    Allocation { coord: TileCoord, count: usize },
    #[error("tile generation failed: {0}")]
    Generation(KernelError),
    #[error("invalid stream config: {0}")]
    InvalidConfig(String),
    #[error("could not start streaming thread: {0}")]
    Spawn(std::io::Error),
    #[error("range query would cover {tiles} tiles")]
    RangeTooLarge { tiles: u64 },
    #[error("streaming thread {thread} panicked: {message}")]
    WorkerPanicked { thread: String, message: String },
}

impl From<KernelError> for StreamError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::Allocation { coord, count } => Self::Allocation { coord, count },
            other => Self::Generation(other),
        }
    }
}
