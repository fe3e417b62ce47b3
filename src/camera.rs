//! Perspective camera and orbit controls.
//!
//! The [`OrbitController`] keeps the camera on a sphere around its target.
//! Pointer drags and wheel steps only queue motion; [`OrbitController::update`]
//! applies a fraction of the queued rotation every frame and decays the rest,
//! which is what makes the camera glide to a stop after the pointer is released.

use std::f32::consts::PI;

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;

/// cgmath builds OpenGL clip space (z in -1..1); wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle off the poles so `look_at` never degenerates.
const POLAR_EPS: f32 = 0.000001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P, target: P) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

/// GPU side of the camera: the uniform, its buffer and bind group.
#[derive(Debug)]
pub struct CameraResources {
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, uniform: CameraUniform) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, camera: &Camera, projection: &Projection) {
        self.uniform.update_view_proj(camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Radius, polar angle from +y (`phi`) and azimuth around +y from +z (`theta`).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_vector(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            theta: v.x.atan2(v.z),
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    fn to_vector(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Damped orbit around a fixed target. Panning is not supported.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitController {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    /// Per wheel step dolly ratio is `0.95^zoom_speed`.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
}

impl OrbitController {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// A pointer drag of `(dx, dy)` pixels. A drag across the full viewport
    /// height turns the camera once around.
    pub fn handle_drag(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.rotate_left(2.0 * PI * dx * self.rotate_speed / height);
        self.rotate_up(2.0 * PI * dy * self.rotate_speed / height);
    }

    /// One wheel step. Positive `delta` scrolls away from the user and moves
    /// the camera closer.
    pub fn handle_wheel(&mut self, delta: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed);
        if delta > 0.0 {
            self.scale *= zoom_scale;
        } else if delta < 0.0 {
            self.scale /= zoom_scale;
        }
    }

    /// Whether queued rotation is still being played out.
    pub fn is_moving(&self) -> bool {
        self.delta_theta.abs() > f32::EPSILON || self.delta_phi.abs() > f32::EPSILON
    }

    /// Applies one frame of queued motion to `camera` and decays the queue.
    pub fn update(&mut self, camera: &mut Camera) {
        let offset = camera.position - camera.target;
        let mut spherical = Spherical::from_vector(offset);

        spherical.theta += self.delta_theta * self.damping_factor;
        spherical.phi += self.delta_phi * self.damping_factor;
        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(POLAR_EPS, PI - POLAR_EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        camera.position = Point3::from_vec(camera.target.to_vec() + spherical.to_vector());

        self.delta_theta *= 1.0 - self.damping_factor;
        self.delta_phi *= 1.0 - self.damping_factor;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn spherical_roundtrip_of_camera_offset() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let back = Spherical::from_vector(v).to_vector();
        assert!(approx(v.x, back.x) && approx(v.y, back.y) && approx(v.z, back.z));
    }

    #[test]
    fn update_without_input_keeps_camera_still() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(0.05);
        controller.update(&mut camera);
        assert!(approx(camera.position.z, 5.0));
        assert!(approx(camera.position.x, 0.0));
    }

    #[test]
    fn drag_glides_and_decays() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(0.05);
        controller.handle_drag(100.0, 0.0, 600.0);
        let total = -2.0 * PI * 100.0 / 600.0;

        controller.update(&mut camera);
        let first = Spherical::from_vector(camera.position - camera.target).theta;
        assert!(approx(first, total * 0.05));

        for _ in 0..500 {
            controller.update(&mut camera);
        }
        let settled = Spherical::from_vector(camera.position - camera.target);
        assert!(approx(settled.theta, total));
        assert!(approx(settled.radius, 5.0));
        assert!(!controller.is_moving());
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(1.0);
        controller.rotate_up(10.0);
        controller.update(&mut camera);
        let offset = camera.position - camera.target;
        assert!(approx(offset.magnitude(), 5.0));
        assert!(Spherical::from_vector(offset).phi < 0.01);
        assert!(camera.position.x.is_finite() && camera.position.z.is_finite());
    }

    #[test]
    fn wheel_dollies_towards_target() {
        let mut camera = Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0));
        let mut controller = OrbitController::new(0.05);
        controller.handle_wheel(1.0);
        controller.update(&mut camera);
        assert!(approx(camera.position.z, 4.75));
        controller.handle_wheel(-1.0);
        controller.update(&mut camera);
        assert!(approx(camera.position.z, 5.0));
    }

    #[test]
    fn projection_resize_updates_aspect() {
        let mut projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
        assert!(approx(projection.aspect, 800.0 / 600.0));
        projection.resize(1920, 1080);
        assert!(approx(projection.aspect, 1920.0 / 1080.0));
    }
}
