//! Render pipelines.
//!
//! - `mesh` draws lit or unlit scene meshes, filled or as wireframe lines
//! - `light` holds the light uniform shared by every mesh
//! - `gui` draws the flat debug overlay
//! - `caption` draws the overlay text (`ui` feature)

#[cfg(feature = "ui")]
pub mod caption;
pub mod gui;
pub mod light;
pub mod mesh;

/// Every pipeline the renderer switches between.
#[derive(Debug)]
pub struct Pipelines {
    pub mesh: wgpu::RenderPipeline,
    pub wireframe: wgpu::RenderPipeline,
    pub gui: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        material_layout: &wgpu::BindGroupLayout,
        camera_layout: &wgpu::BindGroupLayout,
        light_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            mesh: mesh::mk_mesh_pipeline(
                device,
                config,
                material_layout,
                camera_layout,
                light_layout,
                wgpu::PrimitiveTopology::TriangleList,
            ),
            wireframe: mesh::mk_mesh_pipeline(
                device,
                config,
                material_layout,
                camera_layout,
                light_layout,
                wgpu::PrimitiveTopology::LineList,
            ),
            gui: gui::mk_gui_pipeline(device, config),
        }
    }
}
