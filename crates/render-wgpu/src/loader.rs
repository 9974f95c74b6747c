use std::sync::Arc;

use tileworld_assets::{
    validate_mesh, AssetError, GeometryHandle, MaterialHandle, MeshData, ResourceLoader,
    RgbaImage,
};
use wgpu::util::DeviceExt;

use crate::vertex::interleave;

pub(crate) struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
}

pub(crate) struct GpuMaterial {
    pub texture: wgpu::Texture,
    pub bind_group: wgpu::BindGroup,
}

/// Uploads meshes and textures to the GPU and owns every buffer and
/// texture it creates until [`release_all`](ResourceLoader::release_all).
pub struct GpuLoader {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    geometries: Vec<Option<GpuGeometry>>,
    materials: Vec<Option<GpuMaterial>>,
    released: bool,
}

impl GpuLoader {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        // Nearest filtering keeps atlas cells crisp.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            device,
            queue,
            material_layout,
            sampler,
            geometries: Vec::new(),
            materials: Vec::new(),
            released: false,
        }
    }

    pub fn material_layout(&self) -> &wgpu::BindGroupLayout {
        &self.material_layout
    }

    pub(crate) fn geometry(&self, handle: GeometryHandle) -> Option<&GpuGeometry> {
        self.geometries.get(handle.id as usize)?.as_ref()
    }

    pub(crate) fn material(&self, handle: MaterialHandle) -> Option<&GpuMaterial> {
        self.materials.get(handle.0 as usize)?.as_ref()
    }
}

impl ResourceLoader for GpuLoader {
    fn upload_geometry(&mut self, mesh: &MeshData) -> Result<GeometryHandle, AssetError> {
        if self.released {
            return Err(AssetError::Released);
        }
        validate_mesh(mesh)?;

        let id = self.geometries.len() as u32;
        let vertices = interleave(mesh);
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("geometry_vertex_buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("geometry_index_buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.geometries.push(Some(GpuGeometry {
            vertex_buffer,
            index_buffer,
        }));

        tracing::debug!(id, vertices = vertices.len(), indices = mesh.indices.len(), "geometry uploaded");
        Ok(GeometryHandle {
            id,
            index_count: mesh.index_count(),
        })
    }

    fn upload_texture_rgba(&mut self, image: &RgbaImage) -> Result<MaterialHandle, AssetError> {
        if self.released {
            return Err(AssetError::Released);
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("material_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let id = self.materials.len() as u32;
        self.materials.push(Some(GpuMaterial {
            texture,
            bind_group,
        }));
        tracing::debug!(id, width = image.width, height = image.height, "texture uploaded");
        Ok(MaterialHandle(id))
    }

    fn release_all(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut freed = 0;
        for geometry in self.geometries.iter_mut().filter_map(Option::take) {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
            freed += 1;
        }
        for material in self.materials.iter_mut().filter_map(Option::take) {
            material.texture.destroy();
            freed += 1;
        }
        tracing::info!(freed, "GPU resources released");
    }

    fn live_resources(&self) -> usize {
        self.geometries.iter().flatten().count() + self.materials.iter().flatten().count()
    }
}
