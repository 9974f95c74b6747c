//! Geometry and material data for the renderer.
//!
//! Meshes and textures live on the CPU here; a [`ResourceLoader`] turns them
//! into opaque handles owned by the rendering backend. The
//! [`ModelRegistry`] pairs those handles into drawable models that spatial
//! objects reference by id.
//!
//! # Invariants
//! - Every handle a loader returns is released exactly once, by
//!   [`ResourceLoader::release_all`].
//! - Uploads after `release_all` fail with [`AssetError::Released`].

pub mod mesh;
pub mod models;
pub mod registry;
pub mod texture;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use mesh::MeshData;
pub use models::DefaultModels;
pub use registry::ModelRegistry;
pub use texture::RgbaImage;

/// Uploaded geometry and the number of indices to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeometryHandle {
    pub id: u32,
    pub index_count: u32,
}

/// An uploaded texture bound as the surface material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(pub u32);

/// Immutable pairing of geometry and material shared by many objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawableModel {
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
}

impl DrawableModel {
    pub fn index_count(&self) -> u32 {
        self.geometry.index_count
    }
}

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset file not found: {0}")]
    MissingAsset(PathBuf),
    #[error("image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    BadDimensions { width: u32, height: u32, len: usize },
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),
    #[error("loader resources were already released")]
    Released,
}

/// Uploads CPU-side assets to a rendering backend and owns the results.
pub trait ResourceLoader {
    fn upload_geometry(&mut self, mesh: &MeshData) -> Result<GeometryHandle, AssetError>;

    fn upload_texture_rgba(&mut self, image: &RgbaImage) -> Result<MaterialHandle, AssetError>;

    /// Decode an image file and upload it. Missing files are fatal to the
    /// caller; nothing falls back to a placeholder here.
    fn upload_texture(&mut self, path: &Path) -> Result<MaterialHandle, AssetError> {
        let image = RgbaImage::load(path)?;
        self.upload_texture_rgba(&image)
    }

    /// Release every handle this loader created. Idempotent.
    fn release_all(&mut self);

    /// Number of handles currently alive.
    fn live_resources(&self) -> usize;
}

/// Reject meshes a backend could not draw.
pub fn validate_mesh(mesh: &MeshData) -> Result<(), AssetError> {
    if mesh.indices.is_empty() {
        return Err(AssetError::MalformedMesh("no indices".into()));
    }
    if !mesh.is_well_formed() {
        return Err(AssetError::MalformedMesh(format!(
            "{} positions, {} uvs, {} indices",
            mesh.vertex_count(),
            mesh.uvs.len(),
            mesh.indices.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_meshes_validate() {
        validate_mesh(&MeshData::cube()).unwrap();
        validate_mesh(&MeshData::atlas_cube()).unwrap();
        validate_mesh(&MeshData::quad()).unwrap();
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let mesh = MeshData {
            positions: vec![],
            uvs: vec![],
            indices: vec![],
        };
        assert!(matches!(validate_mesh(&mesh), Err(AssetError::MalformedMesh(_))));
    }

    #[test]
    fn drawable_reports_geometry_index_count() {
        let model = DrawableModel {
            geometry: GeometryHandle { id: 2, index_count: 6 },
            material: MaterialHandle(1),
        };
        assert_eq!(model.index_count(), 6);
    }
}
