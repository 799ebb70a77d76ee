use std::collections::HashMap;

use glam::Mat4;

use crate::color::Color;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::mesh_pass::{DrawCall, MeshPass};
use crate::scene::{Blending, Scene, Sphere};
use crate::texture::{Texture, TextureId, TextureImage};

/// What the renderer needs from one mesh entity, copied out of the scene.
#[derive(Clone, Debug)]
pub struct SceneItem {
    pub sphere: Sphere,
    pub model: Mat4,
    pub color: Color,
    pub opacity: f32,
    pub roughness: f32,
    pub blending: Blending,
    pub transparent: bool,
    pub map: Option<TextureImage>,
}

/// Mesh entities attached to the scene, in draw order.
///
/// Opaque meshes come first so transparent ones blend over them; within each
/// group the scene's insertion order is kept. Transparent meshes with no
/// opacity left are skipped.
pub fn collect_items(scene: &Scene) -> Vec<SceneItem> {
    let mut items: Vec<SceneItem> = scene
        .meshes()
        .into_iter()
        .filter_map(|entity| {
            let transform = scene.transform(entity)?;
            let material = scene.material(entity)?;
            let sphere = scene.sphere(entity)?;
            let opacity = material.effective_opacity();
            if material.transparent && opacity <= 0.0 {
                return None;
            }
            Some(SceneItem {
                sphere,
                model: transform.matrix(),
                color: material.color,
                opacity,
                roughness: material.roughness,
                blending: material.blending,
                transparent: material.transparent,
                map: material.map,
            })
        })
        .collect();
    items.sort_by_key(|item| item.transparent);
    items
}

/// Draws a [`Scene`] to the window surface.
///
/// Sphere meshes are built on first use and shared by every entity with the
/// same shape. Textures are uploaded the first frame they are drawn and
/// released once no attached mesh uses them.
pub struct SceneRenderer {
    mesh_pass: MeshPass,
    meshes: HashMap<Sphere, Mesh>,
    textures: HashMap<TextureId, (Texture, wgpu::BindGroup)>,
    clear_color: wgpu::Color,
}

impl SceneRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            mesh_pass: MeshPass::new(gpu),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            clear_color: wgpu::Color::BLACK,
        }
    }

    fn upload(&mut self, gpu: &GpuContext, items: &[SceneItem]) {
        for item in items {
            self.meshes
                .entry(item.sphere)
                .or_insert_with(|| Mesh::sphere(gpu, &item.sphere));

            if let Some(map) = &item.map {
                if !self.textures.contains_key(&map.id) {
                    log::debug!("Uploading texture {} ({}x{})", map.label, map.width, map.height);
                    let texture = Texture::from_image(gpu, map);
                    let bind_group = self.mesh_pass.create_texture_bind_group(gpu, &texture);
                    self.textures.insert(map.id, (texture, bind_group));
                }
            }
        }

        self.textures.retain(|id, _| {
            items
                .iter()
                .any(|item| item.map.as_ref().is_some_and(|map| map.id == *id))
        });
    }

    /// Render one frame.
    pub fn render(&mut self, gpu: &GpuContext, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        let items = collect_items(scene);
        self.upload(gpu, &items);
        self.mesh_pass.ensure_depth_size(gpu);

        let draws: Vec<DrawCall> = items
            .iter()
            .filter_map(|item| {
                Some(DrawCall {
                    mesh: self.meshes.get(&item.sphere)?,
                    model: item.model,
                    color: item.color,
                    opacity: item.opacity,
                    roughness: item.roughness,
                    blending: item.blending,
                    depth_write: !item.transparent,
                    texture: item
                        .map
                        .as_ref()
                        .and_then(|map| self.textures.get(&map.id))
                        .map(|(_, bind_group)| bind_group),
                })
            })
            .collect();

        let lights = scene.lights();
        self.mesh_pass.prepare(gpu, &scene.camera, &lights, &draws);

        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.mesh_pass.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.mesh_pass.render(&mut render_pass, &draws);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
