use glam::Mat4;
use tileworld_assets::{DrawableModel, GeometryHandle, MaterialHandle};

use crate::RenderError;

/// Low-level drawing operations the batch renderer drives.
///
/// Implementations own whatever GPU state a frame needs. One frame is
/// `begin_frame`, any number of `bind_model` / `load_transform` /
/// `draw_indexed` sequences, then `end_frame`.
pub trait DrawBackend {
    fn begin_frame(&mut self, view: Mat4, projection: Mat4) -> Result<(), RenderError>;

    /// Bind the geometry and material of a model for the draws that follow.
    fn bind_model(&mut self, model: &DrawableModel) -> Result<(), RenderError>;

    /// Set the model transform used by the next draw.
    fn load_transform(&mut self, transform: Mat4);

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError>;

    fn end_frame(&mut self) -> Result<(), RenderError>;
}

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    BeginFrame { view: Mat4, projection: Mat4 },
    BindModel { geometry: GeometryHandle, material: MaterialHandle },
    LoadTransform(Mat4),
    DrawIndexed(u32),
    EndFrame,
}

/// A backend that records calls instead of drawing. Used headless and in tests.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
    frames: u64,
    in_frame: bool,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Completed frames.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawIndexed(_)))
            .count()
    }

    pub fn binds(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::BindModel { .. }))
            .count()
    }

    /// Forget recorded commands, keeping the frame count.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawBackend for CommandRecorder {
    fn begin_frame(&mut self, view: Mat4, projection: Mat4) -> Result<(), RenderError> {
        if self.in_frame {
            return Err(RenderError::Backend("begin_frame inside a frame".into()));
        }
        self.in_frame = true;
        self.commands.push(DrawCommand::BeginFrame { view, projection });
        Ok(())
    }

    fn bind_model(&mut self, model: &DrawableModel) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::BindModel {
            geometry: model.geometry,
            material: model.material,
        });
        Ok(())
    }

    fn load_transform(&mut self, transform: Mat4) {
        self.commands.push(DrawCommand::LoadTransform(transform));
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::Backend("draw outside a frame".into()));
        }
        self.commands.push(DrawCommand::DrawIndexed(index_count));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.in_frame {
            return Err(RenderError::Backend("end_frame without begin_frame".into()));
        }
        self.in_frame = false;
        self.frames += 1;
        self.commands.push(DrawCommand::EndFrame);
        Ok(())
    }
}
