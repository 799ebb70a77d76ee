//! Lit sphere rendering with depth testing and texture support.
//!
//! The mesh pass uses three bind groups:
//! - **Group 0**: Frame uniforms (view-projection, camera position, lights)
//! - **Group 1**: Model uniforms (model matrix, normal matrix, color, roughness),
//!   one slot per draw in a buffer bound with a dynamic offset
//! - **Group 2**: Texture and sampler for the mesh surface
//!
//! Two pipelines share these layouts and differ only in their color blend:
//! [`Blending::Normal`] uses alpha blending and [`Blending::Additive`] adds the
//! source color scaled by its alpha. Transparent draws test depth but do not
//! write it.
//!
//! # Depth Buffer
//!
//! The pass keeps its own depth buffer. Call [`MeshPass::ensure_depth_size`]
//! before rendering if the window may have been resized.

use glam::{Mat4, Vec3};

use crate::camera::Camera;
use crate::color::Color;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Vertex3d};
use crate::scene::{Blending, Light, LightKind};
use crate::texture::Texture;

/// Lights beyond this count (ambient ones excluded) are ignored.
pub const MAX_LIGHTS: usize = 4;

/// Depth format of the pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One point or directional light as the shader sees it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// `xyz` position, `w` is 1 for point lights and 0 for directional ones.
    pub position: [f32; 4],
    /// Linear color premultiplied by intensity; `a` is the cutoff distance.
    pub color: [f32; 4],
}

/// Per-frame uniforms: camera and lights.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub light_count: u32,
    /// Summed ambient light, linear rgb.
    pub ambient: [f32; 4],
    pub lights: [LightUniform; MAX_LIGHTS],
}

impl FrameUniforms {
    pub fn new(camera: &Camera, lights: &[Light]) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut slots = [LightUniform::default(); MAX_LIGHTS];
        let mut count = 0;

        for light in lights {
            let [r, g, b, _] = light.color.to_linear();
            let radiance = Vec3::new(r, g, b) * light.intensity;
            let (position, distance) = match light.kind {
                LightKind::Ambient => {
                    ambient += radiance;
                    continue;
                }
                LightKind::Point { position, distance } => (position.extend(1.0), distance),
                LightKind::Directional { position } => (position.extend(0.0), 0.0),
            };
            if count == MAX_LIGHTS {
                log::warn!("More than {MAX_LIGHTS} lights in the scene, extra lights ignored");
                break;
            }
            slots[count] = LightUniform {
                position: position.to_array(),
                color: radiance.extend(distance).to_array(),
            };
            count += 1;
        }

        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            light_count: count as u32,
            ambient: ambient.extend(1.0).to_array(),
            lights: slots,
        }
    }
}

/// Per-draw uniforms.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    /// Model matrix (object to world space transformation).
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    /// Linear rgb and opacity.
    pub color: [f32; 4],
    /// `x` roughness, `y` 1.0 when a texture is bound.
    pub params: [f32; 4],
}

impl ModelUniforms {
    pub fn new(model: Mat4, color: Color, opacity: f32, roughness: f32, textured: bool) -> Self {
        // A collapsed (zero-scale) matrix has no inverse.
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        let [r, g, b, _] = color.to_linear();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [r, g, b, opacity],
            params: [roughness, if textured { 1.0 } else { 0.0 }, 0.0, 0.0],
        }
    }
}

/// A mesh queued for rendering.
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub model: Mat4,
    pub color: Color,
    pub opacity: f32,
    pub roughness: f32,
    pub blending: Blending,
    /// Whether depth is written. Off for transparent meshes.
    pub depth_write: bool,
    /// Bind group from [`MeshPass::create_texture_bind_group`]. `None` uses plain white.
    pub texture: Option<&'a wgpu::BindGroup>,
}

/// Round `size` up to a multiple of `alignment`.
fn aligned(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// Renders lit spheres with depth testing.
pub struct MeshPass {
    pipelines: Pipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: usize,
    model_stride: u64,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    default_texture: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

/// One pipeline per blend mode and depth-write setting.
struct Pipelines {
    normal: wgpu::RenderPipeline,
    normal_no_depth_write: wgpu::RenderPipeline,
    additive: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, blending: Blending, depth_write: bool) -> &wgpu::RenderPipeline {
        match (blending, depth_write) {
            (Blending::Normal, true) => &self.normal,
            (Blending::Normal, false) => &self.normal_no_depth_write,
            (Blending::Additive, _) => &self.additive,
        }
    }
}

const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

impl MeshPass {
    const INITIAL_MODEL_CAPACITY: usize = 8;

    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // Frame uniform buffer (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Model uniform buffer (group 1), one aligned slot per draw
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let model_stride = aligned(
            std::mem::size_of::<ModelUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (model_buffer, model_bind_group) = Self::create_model_buffer(
            device,
            &model_layout,
            model_stride,
            Self::INITIAL_MODEL_CAPACITY,
        );

        // Texture bind group layout (group 2)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &model_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let create_pipeline = |label: &str, blend: wgpu::BlendState, depth_write: bool| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipelines = Pipelines {
            normal: create_pipeline("Mesh Pipeline", wgpu::BlendState::ALPHA_BLENDING, true),
            normal_no_depth_write: create_pipeline(
                "Transparent Mesh Pipeline",
                wgpu::BlendState::ALPHA_BLENDING,
                false,
            ),
            additive: create_pipeline("Additive Mesh Pipeline", ADDITIVE_BLENDING, false),
        };

        let white = Texture::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "Default White Texture");
        let default_texture =
            Self::texture_bind_group(device, &texture_bind_group_layout, &white);

        let depth_view = Self::create_depth_view(gpu);

        Self {
            pipelines,
            frame_buffer,
            frame_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_capacity: Self::INITIAL_MODEL_CAPACITY,
            model_stride,
            texture_bind_group_layout,
            default_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    fn create_model_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Creates the group 2 bind group for a texture.
    pub fn create_texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        Self::texture_bind_group(&gpu.device, &self.texture_bind_group_layout, texture)
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreates the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Upload uniforms for this frame. Must be called before the render pass
    /// that [`render`](Self::render) records into begins.
    pub fn prepare(&mut self, gpu: &GpuContext, camera: &Camera, lights: &[Light], draws: &[DrawCall]) {
        let frame = FrameUniforms::new(camera, lights);
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        if draws.len() > self.model_capacity {
            let capacity = draws.len().next_power_of_two();
            let (buffer, bind_group) = Self::create_model_buffer(
                &gpu.device,
                &self.model_layout,
                self.model_stride,
                capacity,
            );
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_capacity = capacity;
        }

        for (slot, call) in draws.iter().enumerate() {
            let uniforms = ModelUniforms::new(
                call.model,
                call.color,
                call.opacity,
                call.roughness,
                call.texture.is_some(),
            );
            gpu.queue.write_buffer(
                &self.model_buffer,
                slot as u64 * self.model_stride,
                bytemuck::bytes_of(&uniforms),
            );
        }
    }

    /// Record the draw calls passed to the last [`prepare`](Self::prepare).
    pub fn render(&self, render_pass: &mut wgpu::RenderPass, draws: &[DrawCall]) {
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (slot, call) in draws.iter().enumerate() {
            render_pass.set_pipeline(self.pipelines.get(call.blending, call.depth_write));
            let offset = (slot as u64 * self.model_stride) as u32;
            render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);
            render_pass.set_bind_group(2, call.texture.unwrap_or(&self.default_texture), &[]);

            render_pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_the_shader() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 224);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 160);
    }

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned(160, 256), 256);
        assert_eq!(aligned(256, 256), 256);
        assert_eq!(aligned(300, 256), 512);
    }

    #[test]
    fn ambient_lights_are_summed() {
        let lights = [
            Light::ambient(Color::WHITE, 0.5),
            Light::point(Color::WHITE, 1.25, Vec3::new(0.0, 10.0, 10.0), 100.0),
            Light::ambient(Color::WHITE, 1.0),
        ];
        let frame = FrameUniforms::new(&Camera::default(), &lights);
        assert_eq!(frame.light_count, 1);
        assert!((frame.ambient[0] - 1.5).abs() < 1e-5);
        assert_eq!(frame.lights[0].position, [0.0, 10.0, 10.0, 1.0]);
        assert!((frame.lights[0].color[0] - 1.25).abs() < 1e-5);
        assert_eq!(frame.lights[0].color[3], 100.0);
    }

    #[test]
    fn directional_lights_have_zero_w() {
        let lights = [Light::directional(Color::WHITE, 1.0, Vec3::Y)];
        let frame = FrameUniforms::new(&Camera::default(), &lights);
        assert_eq!(frame.lights[0].position, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = vec![Light::directional(Color::WHITE, 1.0, Vec3::X); MAX_LIGHTS + 2];
        let frame = FrameUniforms::new(&Camera::default(), &lights);
        assert_eq!(frame.light_count as usize, MAX_LIGHTS);
    }

    #[test]
    fn zero_scale_model_keeps_a_finite_normal_matrix() {
        let uniforms = ModelUniforms::new(Mat4::ZERO, Color::WHITE, 1.0, 0.5, false);
        assert!(uniforms.normal_matrix.iter().flatten().all(|v| v.is_finite()));
        assert_eq!(uniforms.params, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn model_color_is_linear_with_opacity() {
        let uniforms = ModelUniforms::new(Mat4::IDENTITY, Color::RED, 0.25, 1.0, true);
        assert_eq!(uniforms.color, [1.0, 0.0, 0.0, 0.25]);
        assert_eq!(uniforms.params[1], 1.0);
    }
}
