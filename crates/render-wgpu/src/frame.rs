use glam::Mat4;
use tileworld_assets::DrawableModel;
use tileworld_render::{DrawBackend, RenderError};

use crate::loader::GpuLoader;
use crate::renderer::WgpuRenderer;
use crate::vertex::{CameraUniform, InstanceRaw};

enum DrawOp {
    Bind(DrawableModel),
    Draw { index_count: u32, instance: u32 },
}

/// One frame of GPU drawing, driven by the batch renderer.
///
/// Calls are recorded as they arrive; `end_frame` uploads the collected
/// transforms and encodes a single render pass.
pub struct FramePass<'a> {
    renderer: &'a mut WgpuRenderer,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    loader: &'a GpuLoader,
    target: &'a wgpu::TextureView,
    transform: Mat4,
    instances: Vec<InstanceRaw>,
    ops: Vec<DrawOp>,
    begun: bool,
}

impl<'a> FramePass<'a> {
    pub(crate) fn new(
        renderer: &'a mut WgpuRenderer,
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        loader: &'a GpuLoader,
        target: &'a wgpu::TextureView,
    ) -> Self {
        Self {
            renderer,
            device,
            queue,
            loader,
            target,
            transform: Mat4::IDENTITY,
            instances: Vec::new(),
            ops: Vec::new(),
            begun: false,
        }
    }
}

impl DrawBackend for FramePass<'_> {
    fn begin_frame(&mut self, view: Mat4, projection: Mat4) -> Result<(), RenderError> {
        if self.begun {
            return Err(RenderError::Backend("frame already begun".into()));
        }
        self.begun = true;
        self.queue.write_buffer(
            &self.renderer.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::new(view, projection)),
        );
        Ok(())
    }

    fn bind_model(&mut self, model: &DrawableModel) -> Result<(), RenderError> {
        if self.loader.geometry(model.geometry).is_none() {
            return Err(RenderError::Backend(format!(
                "geometry {} is not resident",
                model.geometry.id
            )));
        }
        if self.loader.material(model.material).is_none() {
            return Err(RenderError::Backend(format!(
                "material {} is not resident",
                model.material.0
            )));
        }
        self.ops.push(DrawOp::Bind(*model));
        Ok(())
    }

    fn load_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        let instance = self.instances.len() as u32;
        self.instances.push(InstanceRaw::new(self.transform));
        self.ops.push(DrawOp::Draw {
            index_count,
            instance,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        if !self.begun {
            return Err(RenderError::Backend("end_frame without begin_frame".into()));
        }
        self.begun = false;

        self.renderer.reserve_instances(self.device, self.instances.len());
        if !self.instances.is_empty() {
            self.queue.write_buffer(
                &self.renderer.instance_buffer,
                0,
                bytemuck::cast_slice(&self.instances),
            );
        }

        let renderer = &*self.renderer;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("batch_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(renderer.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &renderer.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(renderer.pipeline());
            pass.set_bind_group(0, &renderer.camera_bind_group, &[]);
            pass.set_vertex_buffer(1, renderer.instance_buffer.slice(..));

            for op in &self.ops {
                match op {
                    DrawOp::Bind(model) => {
                        let (Some(geometry), Some(material)) = (
                            self.loader.geometry(model.geometry),
                            self.loader.material(model.material),
                        ) else {
                            return Err(RenderError::Backend("model released mid-frame".into()));
                        };
                        pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
                        pass.set_index_buffer(
                            geometry.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        pass.set_bind_group(1, &material.bind_group, &[]);
                    }
                    DrawOp::Draw {
                        index_count,
                        instance,
                    } => {
                        pass.draw_indexed(0..*index_count, 0, *instance..*instance + 1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.instances.clear();
        self.ops.clear();
        Ok(())
    }
}
