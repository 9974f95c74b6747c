use std::collections::BTreeMap;

use glam::Mat4;
use tileworld_assets::ModelRegistry;
use tileworld_common::{ModelId, Observer, Placement};
use tileworld_kernel::{SpatialObject, Tile};

use crate::backend::DrawBackend;
use crate::projection::{Projection, RenderConfig};
use crate::RenderError;

/// Counts from one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub groups: usize,
    pub objects: usize,
    pub draw_calls: usize,
    pub binds: usize,
}

/// Groups queued objects by model so each model is bound once per frame.
///
/// The batch map is rebuilt every frame: callers queue objects with
/// [`add_object`](Self::add_object), then [`render_frame`](Self::render_frame)
/// draws and empties it.
#[derive(Debug)]
pub struct BatchRenderer {
    batches: BTreeMap<ModelId, Vec<Placement>>,
    projection: Projection,
    projection_matrix: Mat4,
}

impl BatchRenderer {
    pub fn new(config: &RenderConfig, width: u32, height: u32) -> Self {
        let projection = Projection::new(config, width, height);
        Self {
            batches: BTreeMap::new(),
            projection_matrix: projection.matrix(),
            projection,
        }
    }

    pub fn add_object(&mut self, object: &SpatialObject) {
        self.batches
            .entry(object.model())
            .or_default()
            .push(*object.placement());
    }

    pub fn add_tile(&mut self, tile: &Tile) {
        for object in tile.objects() {
            self.add_object(object);
        }
    }

    /// Recompute the projection if the output size changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let changed = self.projection.resize(width, height);
        if changed {
            self.projection_matrix = self.projection.matrix();
            tracing::debug!(width, height, "projection updated");
        }
        changed
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn group_count(&self) -> usize {
        self.batches.len()
    }

    pub fn pending_objects(&self) -> usize {
        self.batches.values().map(Vec::len).sum()
    }

    /// Queued placements for `model`, in insertion order.
    pub fn batch(&self, model: ModelId) -> Option<&[Placement]> {
        self.batches.get(&model).map(Vec::as_slice)
    }

    /// Draw everything queued and clear the queue.
    ///
    /// Every queued model must exist in `registry`; otherwise nothing is
    /// drawn and the queue is still cleared.
    pub fn render_frame(
        &mut self,
        backend: &mut dyn DrawBackend,
        registry: &ModelRegistry,
        observer: &Observer,
    ) -> Result<FrameStats, RenderError> {
        let batches = std::mem::take(&mut self.batches);

        let mut resolved = Vec::with_capacity(batches.len());
        for (id, placements) in &batches {
            let model = registry.get(*id).ok_or(RenderError::UnknownModel(*id))?;
            resolved.push((model, placements));
        }

        let mut stats = FrameStats {
            groups: resolved.len(),
            ..Default::default()
        };
        backend.begin_frame(observer.view_matrix(), self.projection_matrix)?;
        for (model, placements) in resolved {
            backend.bind_model(model)?;
            stats.binds += 1;
            for placement in placements {
                backend.load_transform(placement.model_matrix());
                backend.draw_indexed(model.index_count())?;
                stats.draw_calls += 1;
            }
            stats.objects += placements.len();
        }
        backend.end_frame()?;

        tracing::trace!(?stats, "frame rendered");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CommandRecorder, DrawCommand};
    use glam::Vec3;
    use tileworld_assets::{GeometryHandle, MaterialHandle};
    use tileworld_common::TileCoord;
    use tileworld_kernel::{FlatGenerator, TileGenerator};

    fn registry(models: u32) -> ModelRegistry {
        let mut reg = ModelRegistry::new();
        for i in 0..models {
            reg.register(
                format!("m{i}"),
                GeometryHandle { id: i, index_count: 36 },
                MaterialHandle(i),
            );
        }
        reg
    }

    fn renderer() -> BatchRenderer {
        BatchRenderer::new(&RenderConfig::default(), 1920, 1080)
    }

    #[test]
    fn objects_group_by_model_in_insertion_order() {
        let mut r = renderer();
        let models = [0, 1, 0, 2, 1, 0];
        for (i, m) in models.iter().enumerate() {
            r.add_object(&SpatialObject::at(ModelId(*m), Vec3::new(i as f32, 0.0, 0.0)));
        }

        assert_eq!(r.group_count(), 3);
        assert_eq!(r.pending_objects(), 6);
        let xs: Vec<f32> = r.batch(ModelId(0)).unwrap().iter().map(|p| p.position.x).collect();
        assert_eq!(xs, [0.0, 2.0, 5.0]);
    }

    #[test]
    fn frame_binds_each_model_once() {
        let reg = registry(3);
        let mut r = renderer();
        let mut rec = CommandRecorder::new();
        for i in 0..10 {
            r.add_object(&SpatialObject::at(ModelId(i % 3), Vec3::splat(i as f32)));
        }

        let stats = r.render_frame(&mut rec, &reg, &Observer::default()).unwrap();
        assert_eq!(
            stats,
            FrameStats {
                groups: 3,
                objects: 10,
                draw_calls: 10,
                binds: 3
            }
        );
        assert_eq!(rec.binds(), 3);
        assert_eq!(rec.draw_calls(), 10);
        assert_eq!(r.group_count(), 0);
        assert_eq!(r.pending_objects(), 0);
    }

    #[test]
    fn frame_uploads_view_projection_and_transforms() {
        let reg = registry(1);
        let mut r = renderer();
        let mut rec = CommandRecorder::new();
        let observer = Observer::new(Vec3::new(3.0, 2.0, 1.0), Vec3::new(10.0, 20.0, 0.0));
        let mut obj = SpatialObject::at(ModelId(0), Vec3::new(1.0, 2.0, 3.0));
        obj.rotate(Vec3::new(0.0, 90.0, 0.0));
        obj.rescale(1.0);
        r.add_object(&obj);

        r.render_frame(&mut rec, &reg, &observer).unwrap();
        let cmds = rec.commands();
        assert_eq!(
            cmds[0],
            DrawCommand::BeginFrame {
                view: observer.view_matrix(),
                projection: r.projection_matrix()
            }
        );
        assert!(matches!(cmds[1], DrawCommand::BindModel { .. }));
        match cmds[2] {
            DrawCommand::LoadTransform(m) => {
                let p = m.transform_point3(Vec3::X);
                assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5), "{p:?}");
            }
            ref other => panic!("expected transform, got {other:?}"),
        }
        assert_eq!(cmds[3], DrawCommand::DrawIndexed(36));
        assert_eq!(cmds[4], DrawCommand::EndFrame);
    }

    #[test]
    fn unknown_model_fails_before_drawing() {
        let reg = registry(1);
        let mut r = renderer();
        let mut rec = CommandRecorder::new();
        r.add_object(&SpatialObject::at(ModelId(0), Vec3::ZERO));
        r.add_object(&SpatialObject::at(ModelId(9), Vec3::ZERO));

        let err = r.render_frame(&mut rec, &reg, &Observer::default()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownModel(ModelId(9))));
        assert!(rec.commands().is_empty());
        assert_eq!(r.pending_objects(), 0);
    }

    #[test]
    fn empty_frame_still_clears_and_presents() {
        let reg = registry(0);
        let mut r = renderer();
        let mut rec = CommandRecorder::new();
        let stats = r.render_frame(&mut rec, &reg, &Observer::default()).unwrap();
        assert_eq!(stats, FrameStats::default());
        assert_eq!(rec.frames(), 1);
    }

    #[test]
    fn tiles_feed_every_object() {
        let tile = FlatGenerator::new(ModelId(0))
            .generate(TileCoord::new(0, 0), 4)
            .unwrap();
        let mut r = renderer();
        r.add_tile(&tile);
        assert_eq!(r.pending_objects(), 16);
        assert_eq!(r.group_count(), 1);
    }

    #[test]
    fn resize_updates_projection_only_on_change() {
        let mut r = renderer();
        let before = r.projection_matrix();
        assert!(!r.resize(1920, 1080));
        assert!(r.resize(800, 800));
        assert_ne!(r.projection_matrix(), before);
    }
}
