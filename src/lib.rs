//! moonscape
//!
//! A single 3D scene on wgpu and winit, for native and WASM: a displaced,
//! bump mapped moon, a textured cube hidden inside it, five thousand stars, an
//! extruded "Moon" label, damped orbit controls and a small debug panel with a
//! wireframe toggle.
//!
//! High-level modules
//! - `camera`: camera, projection, uniforms and the damped orbit controller
//! - `config`: every constant of the scene in one struct
//! - `context`: GPU and window context that owns device, queue and pipelines
//! - `data_structures`: geometry, materials, transforms, the scene arena and text extrusion
//! - `flow`: the winit event loop that drives the scene
//! - `gui`: the debug panel
//! - `pipelines`: render pipelines and their shaders (mesh, light, gui, and caption with `ui`)
//! - `render`: GPU mirror of the scene and render composition
//! - `resources`: asynchronous texture and font loading
//! - `stage`: the scene composition and its per-frame animation
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gui;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod stage;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    if let Err(e) = flow::run(config::SceneConfig::from_env()) {
        log::error!("{e:#}");
    }
}
