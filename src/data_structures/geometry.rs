//! CPU-side mesh geometry.
//!
//! [`Geometry`] holds interleaved [`ModelVertex`] data and a triangle index list.
//! The tessellations follow the usual sphere/box layouts so textures wrap the
//! same way they do in common web engines. Texture coordinates use the wgpu
//! convention: `v = 0` is the top row of the image.

use std::collections::HashSet;

use cgmath::{InnerSpace, Vector3};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn center(&self) -> Vector3<f32> {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// UV sphere with `width_segments` around and `height_segments` pole to pole.
    ///
    /// The first and last rings collapse onto the poles; their UVs are shifted by
    /// half a segment so the pole triangles sample the middle of their column.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        let mut grid = Vec::with_capacity(height_segments as usize + 1);

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let u_offset = if iy == 0 {
                0.5 / width_segments as f32
            } else if iy == height_segments {
                -0.5 / width_segments as f32
            } else {
                0.0
            };
            let theta = v * std::f32::consts::PI;
            let mut row = Vec::with_capacity(width_segments as usize + 1);
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * std::f32::consts::TAU;
                let position = Vector3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let normal = if position.magnitude2() > 0.0 {
                    position.normalize()
                } else {
                    Vector3::unit_y()
                };
                row.push(vertices.len() as u32);
                vertices.push(ModelVertex {
                    position: position.into(),
                    tex_coords: [u + u_offset, v],
                    normal: normal.into(),
                });
            }
            grid.push(row);
        }

        let mut indices = Vec::new();
        for iy in 0..height_segments as usize {
            for ix in 0..width_segments as usize {
                let a = grid[iy][ix + 1];
                let b = grid[iy][ix];
                let c = grid[iy + 1][ix];
                let d = grid[iy + 1][ix + 1];
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments as usize - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    /// Axis-aligned box centred on the origin, one quad per face.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let mut geometry = Self::default();
        // (u axis, v axis, w axis, u dir, v dir, plane width, plane height, plane depth)
        let planes: [(usize, usize, usize, f32, f32, f32, f32, f32); 6] = [
            (2, 1, 0, -1.0, -1.0, depth, height, width),
            (2, 1, 0, 1.0, -1.0, depth, height, -width),
            (0, 2, 1, 1.0, 1.0, width, depth, height),
            (0, 2, 1, 1.0, -1.0, width, depth, -height),
            (0, 1, 2, 1.0, -1.0, width, height, depth),
            (0, 1, 2, -1.0, -1.0, width, height, -depth),
        ];
        for (u, v, w, udir, vdir, plane_w, plane_h, plane_d) in planes {
            let start = geometry.vertices.len() as u32;
            for iy in 0..2u32 {
                let y = iy as f32 * plane_h - plane_h / 2.0;
                for ix in 0..2u32 {
                    let x = ix as f32 * plane_w - plane_w / 2.0;
                    let mut position = [0.0f32; 3];
                    position[u] = x * udir;
                    position[v] = y * vdir;
                    position[w] = plane_d / 2.0;
                    let mut normal = [0.0f32; 3];
                    normal[w] = if plane_d > 0.0 { 1.0 } else { -1.0 };
                    geometry.vertices.push(ModelVertex {
                        position,
                        tex_coords: [ix as f32, iy as f32],
                        normal,
                    });
                }
            }
            let (a, b, c, d) = (start, start + 2, start + 3, start + 1);
            geometry.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
        geometry
    }

    /// Returns `None` for empty geometry.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let first: Vector3<f32> = self.vertices.first()?.position.into();
        let bbox = self.vertices.iter().fold(
            Aabb {
                min: first,
                max: first,
            },
            |acc, vertex| Aabb {
                min: Vector3::new(
                    acc.min.x.min(vertex.position[0]),
                    acc.min.y.min(vertex.position[1]),
                    acc.min.z.min(vertex.position[2]),
                ),
                max: Vector3::new(
                    acc.max.x.max(vertex.position[0]),
                    acc.max.y.max(vertex.position[1]),
                    acc.max.z.max(vertex.position[2]),
                ),
            },
        );
        Some(bbox)
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        for vertex in &mut self.vertices {
            vertex.position = (Vector3::from(vertex.position) + offset).into();
        }
    }

    /// Moves the geometry so that its bounding box is centred on the origin.
    pub fn center(&mut self) {
        if let Some(bbox) = self.bounding_box() {
            self.translate(-bbox.center());
        }
    }

    /// Per-triangle normals for unshared (non-indexed style) vertex lists.
    pub fn compute_flat_normals(&mut self) {
        for tri in self.indices.chunks_exact(3) {
            let a: Vector3<f32> = self.vertices[tri[0] as usize].position.into();
            let b: Vector3<f32> = self.vertices[tri[1] as usize].position.into();
            let c: Vector3<f32> = self.vertices[tri[2] as usize].position.into();
            let n = (c - b).cross(a - b);
            let n = if n.magnitude2() > 0.0 {
                n.normalize()
            } else {
                Vector3::unit_z()
            };
            for &i in tri {
                self.vertices[i as usize].normal = n.into();
            }
        }
    }

    /// Unique triangle edges as a line list, used for wireframe rendering.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(self.indices.len() * 2);
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = (a.min(b), a.max(b));
                if seen.insert(key) {
                    lines.extend_from_slice(&[a, b]);
                }
            }
        }
        lines
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
