use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::scene::Light;

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// One directional light plus hemisphere fill, as the mesh shader expects.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Unit vector from the surface towards the light.
    pub direction: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub hemisphere_intensity: f32,
    pub sky_color: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub ground_color: [f32; 3],
    _padding2: u32,
}

impl LightUniform {
    /// Folds the scene lights into a uniform. Later lights of the same kind
    /// replace earlier ones.
    pub fn from_lights(lights: &[Light]) -> Self {
        let mut uniform = Self::zeroed_default();
        for light in lights {
            match light {
                Light::Directional(d) => {
                    let dir = Vector3::from(d.position);
                    let dir = if dir.magnitude2() > 0.0 {
                        dir.normalize()
                    } else {
                        Vector3::unit_y()
                    };
                    uniform.direction = dir.into();
                    uniform.color = d.color;
                    uniform.intensity = d.intensity;
                }
                Light::Hemisphere(h) => {
                    uniform.sky_color = h.sky;
                    uniform.ground_color = h.ground;
                    uniform.hemisphere_intensity = h.intensity;
                }
            }
        }
        uniform
    }

    fn zeroed_default() -> Self {
        Self {
            direction: [0.0, 1.0, 0.0],
            intensity: 0.0,
            color: [1.0; 3],
            hemisphere_intensity: 0.0,
            sky_color: [1.0; 3],
            _padding: 0,
            ground_color: [1.0; 3],
            _padding2: 0,
        }
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, uniform: LightUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("light_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene::{DirectionalLight, HemisphereLight};

    #[test]
    fn uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>(), 64);
    }

    #[test]
    fn directional_position_becomes_unit_direction() {
        let uniform = LightUniform::from_lights(&[
            Light::Directional(DirectionalLight {
                color: [1.0; 3],
                intensity: 1.0,
                position: [-100.0, 10.0, 50.0],
            }),
            Light::Hemisphere(HemisphereLight {
                sky: [1.0; 3],
                ground: [1.0; 3],
                intensity: 0.05,
            }),
        ]);
        let d = Vector3::from(uniform.direction);
        assert!((d.magnitude() - 1.0).abs() < 1e-6);
        assert!(d.x < 0.0 && d.y > 0.0 && d.z > 0.0);
        assert_eq!(uniform.hemisphere_intensity, 0.05);
        assert_eq!(uniform.intensity, 1.0);
    }
}
