//! Sphere geometry, GPU meshes and spatial transforms.
//!
//! - [`Vertex3d`]: the vertex format used by every mesh (position, normal, UV)
//! - [`SphereGeometry`]: CPU-side UV sphere, generated from a [`Sphere`]
//! - [`Mesh`]: GPU-resident vertex and index buffers
//! - [`Transform`]: position, Euler rotation and scale of a scene entity
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::gpu::GpuContext;
use crate::scene::Sphere;

/// A vertex for 3D mesh rendering with position, normal, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// The 3D position of this vertex in model space.
    pub position: [f32; 3],
    /// The surface normal vector (normalized).
    pub normal: [f32; 3],
    /// Texture coordinates; `v = 0` is the top row of the image.
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout descriptor for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Vertex and index data of a UV sphere, before GPU upload.
///
/// Rows run from the north pole (`+Y`) to the south pole and columns wrap
/// around the equator, so an equirectangular image maps straight onto it.
/// The pole rows each collapse to a single point, so the triangles touching
/// a pole are emitted once instead of twice.
#[derive(Clone, Debug)]
pub struct SphereGeometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    pub fn new(sphere: &Sphere) -> Self {
        let radius = sphere.radius();
        let width = sphere.width_segments.max(3);
        let height = sphere.height_segments.max(2);

        let mut vertices = Vec::with_capacity(((width + 1) * (height + 1)) as usize);
        for iy in 0..=height {
            let v = iy as f32 / height as f32;
            let theta = v * std::f32::consts::PI;

            for ix in 0..=width {
                let u = ix as f32 / width as f32;
                let phi = u * std::f32::consts::TAU;

                let normal = Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                );
                let position = normal * radius;

                // Pole vertices sit halfway across their segment.
                let u_offset = if iy == 0 {
                    0.5 / width as f32
                } else if iy == height {
                    -0.5 / width as f32
                } else {
                    0.0
                };

                vertices.push(Vertex3d::new(
                    position.to_array(),
                    normal.normalize_or_zero().to_array(),
                    [u + u_offset, v],
                ));
            }
        }

        let stride = width + 1;
        let mut indices = Vec::with_capacity((width * height * 6) as usize);
        for iy in 0..height {
            for ix in 0..width {
                let a = iy * stride + ix + 1;
                let b = iy * stride + ix;
                let c = (iy + 1) * stride + ix;
                let d = (iy + 1) * stride + ix + 1;

                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// GPU-resident 3D mesh geometry with vertex and index buffers.
#[derive(Debug)]
pub struct Mesh {
    /// The GPU buffer containing vertex data.
    pub(crate) vertex_buffer: wgpu::Buffer,
    /// The GPU buffer containing index data (u32 indices).
    pub(crate) index_buffer: wgpu::Buffer,
    /// The number of indices in the mesh (determines draw call size).
    pub(crate) index_count: u32,
}

impl Mesh {
    /// Creates a mesh from raw vertex and index data.
    pub fn new(gpu: &GpuContext, vertices: &[Vertex3d], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Upload a sphere.
    pub fn sphere(gpu: &GpuContext, sphere: &Sphere) -> Self {
        let geometry = SphereGeometry::new(sphere);
        Self::new(gpu, &geometry.vertices, &geometry.indices)
    }
}

/// Position, rotation and scale of a scene entity.
///
/// Rotation is stored as XYZ Euler angles in radians so a single axis can be
/// animated on its own (the spin tween drives `rotation.y`). The matrix is
/// composed Scale → Rotate → Translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// World-space position (translation).
    pub position: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
    /// Scale factors for each axis.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform (origin, no rotation, unit scale).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Rotation as a quaternion.
    pub fn quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    /// Converts this transform to a 4×4 transformation matrix (SRT order).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globe_vertex_and_triangle_counts() {
        let geometry = SphereGeometry::new(&Sphere::GLOBE);
        assert_eq!(geometry.vertices.len(), 65 * 65);
        // Every quad is two triangles except the single one at each pole.
        assert_eq!(geometry.triangle_count(), 64 * 64 * 2 - 2 * 64);
        let max = *geometry.indices.iter().max().unwrap();
        assert!((max as usize) < geometry.vertices.len());
    }

    #[test]
    fn vertices_lie_on_the_radius() {
        let geometry = SphereGeometry::new(&Sphere::new(3.0, 16, 8));
        for vertex in &geometry.vertices {
            let length = Vec3::from_array(vertex.position).length();
            assert!((length - 3.0).abs() < 1e-4, "vertex off the surface: {length}");
            let normal = Vec3::from_array(vertex.normal);
            assert!((normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn rows_run_north_to_south() {
        let geometry = SphereGeometry::new(&Sphere::new(1.0, 8, 4));
        let first = geometry.vertices.first().unwrap();
        let last = geometry.vertices.last().unwrap();
        assert!((first.position[1] - 1.0).abs() < 1e-6);
        assert!((last.position[1] + 1.0).abs() < 1e-6);
        assert_eq!(first.uv[1], 0.0);
        assert_eq!(last.uv[1], 1.0);
    }

    #[test]
    fn triangles_face_outwards() {
        let geometry = SphereGeometry::new(&Sphere::new(1.0, 12, 6));
        for tri in geometry.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(geometry.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "inward-facing triangle {tri:?}");
        }
    }

    #[test]
    fn transform_matrix_scales_then_translates() {
        let transform = Transform::new()
            .position(Vec3::new(1.0, 0.0, 0.0))
            .uniform_scale(2.0);
        let point = transform.matrix().transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert!((point - Vec3::new(3.0, 2.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn zero_scale_collapses_everything() {
        let transform = Transform::new().uniform_scale(0.0);
        let point = transform.matrix().transform_point3(Vec3::new(5.0, -2.0, 1.0));
        assert_eq!(point, Vec3::ZERO);
    }
}
