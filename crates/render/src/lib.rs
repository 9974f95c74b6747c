//! Rendering Adapter: batch renderer over a backend-agnostic draw interface.
//!
//! # Invariants
//! - Rendering reads tiles and the observer; it never mutates them.
//! - Each queued model is bound once per frame, and the batch map is empty
//!   after every [`BatchRenderer::render_frame`].

mod backend;
mod batch;
mod headless;
mod projection;

pub use backend::{CommandRecorder, DrawBackend, DrawCommand};
pub use batch::{BatchRenderer, FrameStats};
pub use headless::HeadlessLoader;
pub use projection::{Projection, RenderConfig};

use tileworld_common::ModelId;

/// Errors from rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("model {0:?} is not registered")]
    UnknownModel(ModelId),
    #[error("shader compile failed: {0}")]
    ShaderCompile(String),
    #[error("backend error: {0}")]
    Backend(String),
}
