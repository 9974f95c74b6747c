use std::path::Path;

use tileworld_common::ModelId;

use crate::{AssetError, MeshData, ModelRegistry, ResourceLoader, RgbaImage};

/// Ids of the models every world is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultModels {
    /// Atlas-textured block filling the tiles.
    pub ground: ModelId,
    /// Fully textured cube placed near the spawn point.
    pub showcase: ModelId,
    /// Flat textured quad.
    pub marker: ModelId,
}

impl DefaultModels {
    /// Upload the built-in meshes and the world texture, and register the
    /// models that pair them.
    ///
    /// With no `texture` path a generated checkerboard is used. A path that
    /// does not exist is an error.
    pub fn load(
        loader: &mut dyn ResourceLoader,
        texture: Option<&Path>,
    ) -> Result<(ModelRegistry, Self), AssetError> {
        let material = match texture {
            Some(path) => loader.upload_texture(path)?,
            None => loader.upload_texture_rgba(&RgbaImage::checkerboard(
                48,
                8,
                [86, 160, 62, 255],
                [120, 86, 52, 255],
            ))?,
        };
        let atlas_cube = loader.upload_geometry(&MeshData::atlas_cube())?;
        let cube = loader.upload_geometry(&MeshData::cube())?;
        let quad = loader.upload_geometry(&MeshData::quad())?;

        let mut registry = ModelRegistry::new();
        let models = Self {
            ground: registry.register("ground", atlas_cube, material),
            showcase: registry.register("showcase", cube, material),
            marker: registry.register("marker", quad, material),
        };
        tracing::info!(models = registry.len(), "default models loaded");
        Ok((registry, models))
    }
}
