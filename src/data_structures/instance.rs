//! Object transforms for GPU rendering.
//!
//! Each scene object owns one [`Instance`]; its raw form occupies one slot of
//! the renderer's transform buffer, read by the mesh shader with instance step
//! mode.

use cgmath::{Euler, Matrix, Quaternion, Rad, SquareMatrix};

use crate::data_structures::geometry::Vertex;

/// Position, Euler rotation (XYZ order) and scale of a scene object.
///
/// Rotation is stored as Euler angles rather than a quaternion because the
/// animation increments individual axes every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: Euler<Rad<f32>>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: Euler::new(Rad(0.0), Rad(0.0), Rad(0.0)),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        Quaternion::from(self.rotation)
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.quaternion())
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let model = self.to_matrix();
        // inverse transpose keeps normals perpendicular under non-uniform scale
        let normal = model
            .invert()
            .map(|inv| inv.transpose())
            .unwrap_or_else(cgmath::Matrix4::identity);
        let normal = cgmath::Matrix3::from_cols(
            normal.x.truncate(),
            normal.y.truncate(),
            normal.z.truncate(),
        );
        InstanceRaw {
            model: model.into(),
            normal: normal.into(),
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

/**
 * A mat4 takes four vertex slots and the normal mat3 another three, all stepping
 * per instance. Locations start after the three `ModelVertex` attributes.
 */
impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Vector3, Vector4};

    use super::*;

    #[test]
    fn matrix_scales_then_rotates_then_translates() {
        let instance = Instance {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Euler::new(Rad(0.0), Rad(std::f32::consts::FRAC_PI_2), Rad(0.0)),
            scale: Vector3::new(2.0, 1.0, 1.0),
        };
        let p = instance.to_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        // (2, 0, 0) turned a quarter around +y lands on -z
        assert!((p.x - 1.0).abs() < 1e-5, "{p:?}");
        assert!((p.y - 2.0).abs() < 1e-5, "{p:?}");
        assert!((p.z - 1.0).abs() < 1e-5, "{p:?}");
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let instance = Instance {
            scale: Vector3::new(1.0, 1.0, 0.5),
            ..Default::default()
        };
        let raw = instance.to_raw();
        assert!((raw.normal[2][2] - 2.0).abs() < 1e-5);
        assert!((raw.normal[0][0] - 1.0).abs() < 1e-5);
        assert!((raw.model[2][2] - 0.5).abs() < 1e-5);
    }
}
