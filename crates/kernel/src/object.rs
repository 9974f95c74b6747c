use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tileworld_common::{ModelId, Placement};

/// A positioned, rotated and scaled instance of a drawable model.
///
/// The model is referenced by id; the registry owns it. State only changes
/// through the delta operations below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialObject {
    model: ModelId,
    placement: Placement,
}

impl SpatialObject {
    pub fn new(model: ModelId, placement: Placement) -> Self {
        Self { model, placement }
    }

    /// Unrotated, unit-scale object at `position`.
    pub fn at(model: ModelId, position: Vec3) -> Self {
        Self::new(model, Placement::at(position))
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn position(&self) -> Vec3 {
        self.placement.position
    }

    /// Move by a world-space delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.placement.position += delta;
    }

    /// Add per-axis rotation, in degrees.
    pub fn rotate(&mut self, delta_degrees: Vec3) {
        self.placement.rotation += delta_degrees;
    }

    /// Add to the uniform scale factor.
    pub fn rescale(&mut self, delta: f32) {
        self.placement.scale += delta;
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.placement.model_matrix()
    }
}
