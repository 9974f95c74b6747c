use tileworld_common::ModelId;

use crate::{DrawableModel, GeometryHandle, MaterialHandle};

/// Owns every drawable model; spatial objects refer to them by [`ModelId`].
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: Vec<(String, DrawableModel)>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair a geometry with a material under `name`. Ids are dense and
    /// assigned in registration order.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        geometry: GeometryHandle,
        material: MaterialHandle,
    ) -> ModelId {
        let id = ModelId(self.models.len() as u32);
        let name = name.into();
        tracing::debug!(?id, %name, index_count = geometry.index_count, "registered model");
        self.models.push((name, DrawableModel { geometry, material }));
        id
    }

    pub fn get(&self, id: ModelId) -> Option<&DrawableModel> {
        self.models.get(id.0 as usize).map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &str, &DrawableModel)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, (n, m))| (ModelId(i as u32), n.as_str(), m))
    }
}
