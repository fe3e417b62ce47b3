//! Scene constants.
//!
//! Every number the composition uses lives in [`SceneConfig`]. The defaults
//! describe the moon scene; tests and embedders override single fields with
//! struct update syntax.

use cgmath::Deg;

/// Extrusion parameters for the 3D text label.
#[derive(Clone, Debug, PartialEq)]
pub struct TextConfig {
    pub text: String,
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
    /// Scale applied to the finished mesh along z.
    pub depth_scale: f32,
    /// Vertical offset of the finished mesh.
    pub offset_y: f32,
    pub color: [f32; 3],
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            text: "Moon".to_string(),
            size: 0.5,
            depth: 0.2,
            curve_segments: 12,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_offset: 0.0,
            bevel_segments: 5,
            depth_scale: 0.5,
            offset_y: 2.75,
            color: hex_rgb(0xa6a6a6),
        }
    }
}

/// Relative asset paths, resolved against `asset_root` natively and against the
/// page origin on the web.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPaths {
    pub moon: String,
    pub displacement: String,
    pub meme: String,
    pub font: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            moon: "textures/moon.jpg".to_string(),
            displacement: "textures/displacement.jpg".to_string(),
            meme: "textures/meme.png".to_string(),
            font: "fonts/moonscape_sans.typeface.json".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub asset_root: String,
    pub assets: AssetPaths,

    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub camera_z: f32,
    pub damping_factor: f32,
    pub clear_colour: wgpu::Color,

    pub moon_radius: f32,
    pub moon_segments: (u32, u32),
    pub displacement_scale: f32,
    pub bump_scale: f32,
    pub moon_shininess: f32,
    /// Per-frame moon rotation increments about y and x.
    pub moon_spin: (f32, f32),

    pub cube_size: f32,

    pub star_count: usize,
    pub star_spread: f32,
    pub star_radius: f32,
    pub star_segments: (u32, u32),
    /// Seed for the starfield. `None` draws one from the OS.
    pub seed: Option<u64>,

    pub text: TextConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            assets: AssetPaths::default(),
            fovy: Deg(75.0),
            znear: 0.1,
            zfar: 1000.0,
            camera_z: 5.0,
            damping_factor: 0.05,
            clear_colour: wgpu::Color::BLACK,
            moon_radius: 2.0,
            moon_segments: (60, 60),
            displacement_scale: 0.08,
            bump_scale: 0.03,
            moon_shininess: 0.0,
            moon_spin: (0.002, 0.0001),
            cube_size: 1.5,
            star_count: 5000,
            star_spread: 300.0,
            star_radius: 0.05,
            star_segments: (16, 16),
            seed: None,
            text: TextConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Defaults, with `MOONSCAPE_ASSETS` overriding the asset root.
    pub fn from_env() -> Self {
        #[allow(unused_mut)]
        let mut config = Self::default();
        #[cfg(not(target_arch = "wasm32"))]
        if let Ok(root) = std::env::var("MOONSCAPE_ASSETS") {
            log::info!("Using asset root {root}");
            config.asset_root = root;
        }
        config
    }
}

/// `0xRRGGBB` to float RGB in 0..=1. No colour-space conversion is applied.
pub fn hex_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
