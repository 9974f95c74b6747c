//! wgpu backend for the batch renderer.
//!
//! [`GpuLoader`] owns every buffer and texture uploaded for the world's
//! models. [`WgpuRenderer`] holds the pipeline and per-frame buffers, and
//! hands out a [`FramePass`] that implements the renderer-agnostic
//! `DrawBackend`.
//!
//! # Invariants
//! - Each draw gets its own model matrix slot in the instance buffer.
//! - GPU handles are destroyed only by `GpuLoader::release_all`.

mod frame;
mod loader;
mod renderer;
mod shaders;
mod vertex;

pub use frame::FramePass;
pub use loader::GpuLoader;
pub use renderer::WgpuRenderer;
pub use shaders::{compile_program, missing_symbols, ShaderProgram, StaticShader, STATIC_SHADER};
