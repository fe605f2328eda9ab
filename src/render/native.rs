use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bytemuck::bytes_of;
use glam::{Mat3, Vec3};
use log::warn;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::{Window, WindowId};

use super::common::{DrawItem, Frame, LightParams};
use super::shared::{GlobalUniform, ObjectConstants, SHADER};
use crate::mesh::{
    Mesh, CUBE_SIZE, FLOATS_PER_VERTEX, PLANE_SIZE, SPHERE_RADIUS, TORUS_RADIUS, TORUS_TUBE,
};
use crate::world::Geometry;

/// GPU renderer backed by wgpu that draws a [`Frame`].
pub struct Renderer {
    // Declared before `window` so the surface is dropped first.
    surface: wgpu::Surface,
    window: Arc<Window>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    objects: ObjectSlots,
    primitives: PrimitiveBuffers,
    mesh_cache: HashMap<String, MeshBuffers>,
    missing_meshes: HashSet<String>,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("window has zero area"));
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        // SAFETY: the renderer keeps the window alive for as long as the surface.
        let surface = unsafe { instance.create_surface(window.as_ref()) }
            .context("failed to create render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("orbit-device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("failed to create GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orbit-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let global_layout = uniform_layout::<GlobalUniform>(&device, "frame-layout", false);
        let object_layout = uniform_layout::<ObjectConstants>(&device, "entity-layout", true);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("orbit-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame-uniforms"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("orbit-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let primitives = PrimitiveBuffers::new(&device);
        let objects = ObjectSlots::new(&device, &object_layout, 64);

        Ok(Self {
            surface,
            window,
            device,
            queue,
            config,
            depth,
            pipeline,
            global_buffer,
            global_bind_group,
            object_layout,
            objects,
            primitives,
            mesh_cache: HashMap::new(),
            missing_meshes: HashSet::new(),
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    /// Resizes the swap chain to match the new dimensions.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, new_size.width, new_size.height);
    }

    /// Draws `frame`. Mesh entities are uploaded on first use through `mesh_for`.
    pub fn render<'m>(
        &mut self,
        frame: &Frame,
        mesh_for: impl Fn(&str) -> Option<&'m Mesh>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.write_globals(frame);

        for item in &frame.items {
            if let Geometry::Mesh { name, .. } = &item.geometry {
                self.ensure_mesh(name, &mesh_for);
            }
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("orbit-encoder"),
            });

        self.objects
            .reserve(&self.device, &self.object_layout, frame.items.len());
        let mut draws = Vec::with_capacity(frame.items.len());
        for item in &frame.items {
            let buffers = match &item.geometry {
                Geometry::Mesh { name, .. } => match self.mesh_cache.get(name) {
                    Some(buffers) => buffers,
                    None => continue,
                },
                primitive => self.primitives.get(primitive),
            };
            let offset = self.objects.offset(draws.len());
            let constants = entity_constants(item);
            self.queue
                .write_buffer(&self.objects.buffer, offset, bytes_of(&constants));
            draws.push((buffers, offset as u32));
        }

        let background = frame.background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(background.x),
                        g: f64::from(background.y),
                        b: f64::from(background.z),
                        a: 1.0,
                    }),
                    store: true,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            }),
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);
        for (buffers, offset) in &draws {
            pass.set_bind_group(1, &self.objects.bind_group, &[*offset]);
            pass.set_vertex_buffer(0, buffers.vertex.slice(..));
            pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..buffers.index_count, 0, 0..1);
        }
        drop(pass);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn write_globals(&self, frame: &Frame) {
        let ambient = frame.ambient.color * frame.ambient.intensity;
        let globals = GlobalUniform {
            view_proj: frame.camera.view_proj.to_cols_array_2d(),
            camera_position: frame.camera.position.extend(1.0).into(),
            ambient: ambient.extend(1.0).into(),
            light_direction: light_direction(&frame.directional).extend(0.0).into(),
            light_color: frame
                .directional
                .color
                .extend(frame.directional.intensity)
                .into(),
        };
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&globals));
    }

    fn ensure_mesh<'m>(&mut self, name: &str, mesh_for: &impl Fn(&str) -> Option<&'m Mesh>) {
        let known = self.mesh_cache.contains_key(name) || self.missing_meshes.contains(name);
        if known {
            return;
        }
        match mesh_for(name) {
            Some(mesh) if !mesh.indices.is_empty() => {
                let buffers = MeshBuffers::from_mesh(&self.device, mesh, name);
                self.mesh_cache.insert(name.to_string(), buffers);
            }
            _ => {
                warn!("no mesh data for {name}; skipping it");
                self.missing_meshes.insert(name.to_string());
            }
        }
    }
}

fn light_direction(light: &LightParams) -> Vec3 {
    let direction = light.position.normalize_or_zero();
    if direction == Vec3::ZERO {
        Vec3::Y
    } else {
        direction
    }
}

fn entity_constants(item: &DrawItem) -> ObjectConstants {
    let normal = Mat3::from_mat4(item.model).inverse().transpose();
    ObjectConstants {
        model: item.model.to_cols_array_2d(),
        normal: pad_columns(normal),
        color: item.material.color.extend(1.0).into(),
        material: [item.material.roughness, item.material.metalness, 0.0, 0.0],
    }
}

fn uniform_layout<T>(
    device: &wgpu::Device,
    label: &str,
    dynamic: bool,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
            },
            count: None,
        }],
    })
}

/// WGSL `mat3x4` layout: each column padded to a vec4.
fn pad_columns(matrix: Mat3) -> [[f32; 4]; 3] {
    [matrix.x_axis, matrix.y_axis, matrix.z_axis].map(|column| column.extend(0.0).into())
}

/// One uniform buffer holding every entity's constants at aligned offsets.
struct ObjectSlots {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
}

impl ObjectSlots {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let size = std::mem::size_of::<ObjectConstants>() as u64;
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment).max(1);
        let stride = (size + alignment - 1) / alignment * alignment;
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("entity-uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("entity-bind-group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(size),
                }),
            }],
        });
        Self {
            buffer,
            bind_group,
            stride,
            capacity,
        }
    }

    /// Grows the buffer (doubling) until `count` entities fit.
    fn reserve(&mut self, device: &wgpu::Device, layout: &wgpu::BindGroupLayout, count: usize) {
        if count <= self.capacity {
            return;
        }
        let mut capacity = self.capacity;
        while capacity < count {
            capacity *= 2;
        }
        *self = Self::new(device, layout, capacity);
    }

    fn offset(&self, slot: usize) -> u64 {
        self.stride * slot as u64
    }
}

/// Unit-sized primitive meshes shared by every entity of that shape.
struct PrimitiveBuffers {
    sphere: MeshBuffers,
    plane: MeshBuffers,
    torus: MeshBuffers,
    cuboid: MeshBuffers,
}

impl PrimitiveBuffers {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            sphere: MeshBuffers::from_mesh(device, &Mesh::sphere(SPHERE_RADIUS, 32, 16), "sphere"),
            plane: MeshBuffers::from_mesh(device, &Mesh::plane(PLANE_SIZE, PLANE_SIZE), "plane"),
            torus: MeshBuffers::from_mesh(
                device,
                &Mesh::torus(TORUS_RADIUS, TORUS_TUBE, 16, 48),
                "torus",
            ),
            cuboid: MeshBuffers::from_mesh(device, &Mesh::cuboid(Vec3::splat(CUBE_SIZE)), "cuboid"),
        }
    }

    fn get(&self, geometry: &Geometry) -> &MeshBuffers {
        match geometry {
            Geometry::Sphere => &self.sphere,
            Geometry::Plane => &self.plane,
            Geometry::Torus => &self.torus,
            Geometry::Cuboid | Geometry::Mesh { .. } => &self.cuboid,
        }
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &Mesh, label: &str) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_direction_points_at_the_light() {
        let light = LightParams {
            position: Vec3::new(0.0, 4.0, 0.0),
            color: Vec3::ONE,
            intensity: 1.0,
        };
        assert_eq!(light_direction(&light), Vec3::Y);
    }

    #[test]
    fn light_at_origin_falls_back_to_overhead() {
        let light = LightParams {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
        };
        assert_eq!(light_direction(&light), Vec3::Y);
    }

    #[test]
    fn normal_matrix_rows_are_padded() {
        let packed = pad_columns(Mat3::IDENTITY);
        assert_eq!(packed[0], [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(packed[2], [0.0, 0.0, 1.0, 0.0]);
    }
}
