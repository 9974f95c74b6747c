use std::collections::BTreeSet;

use tileworld_assets::{
    validate_mesh, AssetError, GeometryHandle, MaterialHandle, MeshData, ResourceLoader,
    RgbaImage,
};

/// A [`ResourceLoader`] that keeps no GPU state, only handle bookkeeping.
///
/// Lets the headless simulator and tests run the full asset path.
#[derive(Debug, Default)]
pub struct HeadlessLoader {
    next_geometry: u32,
    next_material: u32,
    geometries: BTreeSet<u32>,
    materials: BTreeSet<u32>,
    released: bool,
    releases: usize,
}

impl HeadlessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles freed so far, over the loader's lifetime.
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl ResourceLoader for HeadlessLoader {
    fn upload_geometry(&mut self, mesh: &MeshData) -> Result<GeometryHandle, AssetError> {
        if self.released {
            return Err(AssetError::Released);
        }
        validate_mesh(mesh)?;
        let id = self.next_geometry;
        self.next_geometry += 1;
        self.geometries.insert(id);
        Ok(GeometryHandle {
            id,
            index_count: mesh.index_count(),
        })
    }

    fn upload_texture_rgba(&mut self, image: &RgbaImage) -> Result<MaterialHandle, AssetError> {
        if self.released {
            return Err(AssetError::Released);
        }
        tracing::trace!(width = image.width, height = image.height, "texture accepted");
        let id = self.next_material;
        self.next_material += 1;
        self.materials.insert(id);
        Ok(MaterialHandle(id))
    }

    fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.releases += self.geometries.len() + self.materials.len();
        tracing::debug!(
            geometries = self.geometries.len(),
            materials = self.materials.len(),
            "headless resources released"
        );
        self.geometries.clear();
        self.materials.clear();
    }

    fn live_resources(&self) -> usize {
        self.geometries.len() + self.materials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileworld_assets::DefaultModels;

    #[test]
    fn handles_are_released_exactly_once() {
        let mut loader = HeadlessLoader::new();
        let cube = loader.upload_geometry(&MeshData::cube()).unwrap();
        let quad = loader.upload_geometry(&MeshData::quad()).unwrap();
        loader
            .upload_texture_rgba(&RgbaImage::checkerboard(4, 1, [0; 4], [255; 4]))
            .unwrap();

        assert_ne!(cube.id, quad.id);
        assert_eq!(cube.index_count, 36);
        assert_eq!(loader.live_resources(), 3);

        loader.release_all();
        loader.release_all();
        assert_eq!(loader.releases(), 3);
        assert_eq!(loader.live_resources(), 0);
    }

    #[test]
    fn uploads_after_release_fail() {
        let mut loader = HeadlessLoader::new();
        loader.release_all();
        assert!(matches!(
            loader.upload_geometry(&MeshData::cube()),
            Err(AssetError::Released)
        ));
    }

    #[test]
    fn default_models_share_one_material() {
        let mut loader = HeadlessLoader::new();
        let (registry, models) = DefaultModels::load(&mut loader, None).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(loader.live_resources(), 4);
        let ground = registry.get(models.ground).unwrap();
        let showcase = registry.get(models.showcase).unwrap();
        assert_eq!(ground.material, showcase.material);
        assert_ne!(ground.geometry, showcase.geometry);
        assert_eq!(registry.get(models.marker).unwrap().index_count(), 6);
    }

    #[test]
    fn default_models_fail_on_missing_texture() {
        let mut loader = HeadlessLoader::new();
        let err = DefaultModels::load(&mut loader, Some(std::path::Path::new("/nonexistent.png")))
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingAsset(_)));
    }

    #[test]
    fn missing_texture_file_is_an_error() {
        let mut loader = HeadlessLoader::new();
        let err = loader
            .upload_texture(std::path::Path::new("/nonexistent/atlas.png"))
            .unwrap_err();
        assert!(matches!(err, AssetError::MissingAsset(_)));
        assert_eq!(loader.live_resources(), 0);
    }
}
