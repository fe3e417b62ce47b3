//! The moon scene.
//!
//! [`Stage`] is the application context: it owns the scene, the camera and its
//! controller, the texture registry and the debug panel, and is passed to
//! everything that initialises or advances the scene. It does not touch the
//! GPU, so the whole composition can be built and driven in tests.
//!
//! Construction adds the lights, the moon, the meme cube and the starfield
//! straight away. Textures are only reserved; the text label appears when the
//! font arrives through [`Stage::on_font_loaded`].

use cgmath::{Rad, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    camera::{Camera, OrbitController, Projection},
    config::{SceneConfig, hex_rgb},
    data_structures::{
        geometry::Geometry,
        material::Material,
        scene::{DirectionalLight, HemisphereLight, Light, MaterialId, Mesh, ObjectId, Scene},
        text::TextGeometry,
    },
    gui::{Caption, DebugPanel},
    pipelines::gui::GuiVertex,
    resources::{
        AssetEvent,
        font::Font,
        texture::{ColorSpace, TextureHandle, TextureRegistry},
    },
};

/// Pointer state between press and release.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pointer {
    Idle,
    /// Dragging the camera, last cursor position in physical pixels.
    Orbiting((f64, f64)),
    /// Pressed on the panel; moves are ignored until release.
    OnPanel,
}

#[derive(Debug)]
pub struct Stage {
    config: SceneConfig,
    scene: Scene,
    textures: TextureRegistry,
    camera: Camera,
    projection: Projection,
    controller: OrbitController,
    panel: DebugPanel,
    pointer: Pointer,
    /// Finger that drives the pointer; other fingers are ignored.
    touch: Option<u64>,
    surface_size: (u32, u32),
    pixel_ratio: f64,
    moon: ObjectId,
    cube: ObjectId,
    text: Option<ObjectId>,
    moon_material: MaterialId,
}

impl Stage {
    /// Builds the scene with a starfield drawn from `config.seed`, or from the
    /// OS when no seed is set.
    pub fn from_config(config: SceneConfig, width: u32, height: u32) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self::new(config, width, height, &mut rng)
    }

    pub fn new<R: Rng + ?Sized>(config: SceneConfig, width: u32, height: u32, rng: &mut R) -> Self {
        let mut scene = Scene::new();
        let mut textures = TextureRegistry::new();

        let camera = Camera::new((0.0, 0.0, config.camera_z), (0.0, 0.0, 0.0));
        let projection = Projection::new(width, height, config.fovy, config.znear, config.zfar);
        let controller = OrbitController::new(config.damping_factor);

        scene.add_light(Light::Directional(DirectionalLight {
            color: hex_rgb(0xffffff),
            intensity: 1.0,
            position: [-100.0, 10.0, 50.0],
        }));
        scene.add_light(Light::Hemisphere(HemisphereLight {
            sky: hex_rgb(0xffffff),
            ground: hex_rgb(0xffffff),
            intensity: 0.05,
        }));

        let moon_map = textures.reserve(config.assets.moon.clone(), ColorSpace::Srgb);
        // one image drives both the displacement and the bump
        let relief = textures.reserve(config.assets.displacement.clone(), ColorSpace::Linear);
        let meme_map = textures.reserve(config.assets.meme.clone(), ColorSpace::Srgb);

        let cube_geometry =
            scene.add_geometry(Geometry::cuboid(config.cube_size, config.cube_size, config.cube_size));
        let cube_material = scene.add_material(Material::standard(hex_rgb(0xffffff)).with_map(meme_map));
        let cube = scene.add(Mesh::new("meme", cube_geometry, cube_material));

        let (width_segments, height_segments) = config.moon_segments;
        let moon_geometry =
            scene.add_geometry(Geometry::sphere(config.moon_radius, width_segments, height_segments));
        let moon_material = scene.add_material(
            Material::phong(hex_rgb(0xffffff))
                .with_map(moon_map)
                .with_displacement(relief, config.displacement_scale)
                .with_bump(relief, config.bump_scale)
                .with_shininess(config.moon_shininess),
        );
        let moon = scene.add(Mesh::new("moon", moon_geometry, moon_material));

        let mut panel = DebugPanel::new();
        panel.add_checkbox("Wireframe", moon_material, &scene);

        let (width_segments, height_segments) = config.star_segments;
        let star_geometry =
            scene.add_geometry(Geometry::sphere(config.star_radius, width_segments, height_segments));
        let star_material = scene.add_material(Material::standard(hex_rgb(0xffffff)));
        for position in Self::starfield(rng, &config) {
            let mut star = Mesh::new("star", star_geometry, star_material);
            star.transform.position = position;
            scene.add(star);
        }

        log::info!(
            "scene populated: {} objects, {} textures pending",
            scene.len(),
            textures.len()
        );

        Self {
            config,
            scene,
            textures,
            camera,
            projection,
            controller,
            panel,
            pointer: Pointer::Idle,
            touch: None,
            surface_size: (width, height),
            pixel_ratio: 1.0,
            moon,
            cube,
            text: None,
            moon_material,
        }
    }

    /// `config.star_count` positions, each coordinate uniform in
    /// `[-spread / 2, spread / 2]`.
    pub fn starfield<R: Rng + ?Sized>(rng: &mut R, config: &SceneConfig) -> Vec<Vector3<f32>> {
        let spread = config.star_spread;
        let mut coordinate = || spread * (0.5 - rng.random::<f32>());
        (0..config.star_count)
            .map(|_| Vector3::new(coordinate(), coordinate(), coordinate()))
            .collect()
    }

    /// Applies a new surface size straight away. Zero sizes (a minimised
    /// window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        log::debug!("resize to {width}x{height}");
        self.surface_size = (width, height);
        self.projection.resize(width, height);
    }

    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        self.pixel_ratio = pixel_ratio;
    }

    /// One frame of animation: spin the moon and let the orbit glide.
    pub fn animate(&mut self) {
        let (spin_y, spin_x) = self.config.moon_spin;
        if let Some(moon) = self.scene.object_mut(self.moon) {
            let rotation = &mut moon.transform.rotation;
            rotation.y += Rad(spin_y);
            rotation.x += Rad(spin_x);
        }
        self.controller.update(&mut self.camera);
    }

    pub fn handle_asset(&mut self, event: AssetEvent) {
        match event {
            AssetEvent::TextureLoaded { handle, image } => self.on_texture_loaded(handle, image),
            AssetEvent::TextureFailed { handle } => self.on_texture_failed(handle),
            AssetEvent::FontLoaded(font) => self.on_font_loaded(&font),
        }
    }

    pub fn on_texture_loaded(&mut self, handle: TextureHandle, image: image::RgbaImage) {
        if !self.textures.resolve(handle, image) {
            log::warn!("ignoring image for {handle:?}, which is not pending");
        }
    }

    pub fn on_texture_failed(&mut self, handle: TextureHandle) {
        self.textures.fail(handle);
    }

    /// Builds and attaches the text label.
    pub fn on_font_loaded(&mut self, font: &Font) {
        if self.text.is_some() {
            log::warn!("font loaded twice, keeping the existing label");
            return;
        }

        let text = &self.config.text;
        let geometry = TextGeometry::build(font, text);
        if geometry.vertices.is_empty() {
            log::warn!("font {} has no outlines for {:?}", font.family_name, text.text);
            return;
        }
        let geometry = self.scene.add_geometry(geometry);
        let material = self.scene.add_material(Material::basic(text.color));
        let mut mesh = Mesh::new("text", geometry, material);
        mesh.transform.scale.z = text.depth_scale;
        mesh.transform.position.y = text.offset_y;
        self.text = Some(self.scene.add(mesh));
        log::info!("text label {:?} added", text.text);
    }

    /// Pointer press at `cursor` (physical pixels). A press on a panel row
    /// toggles it; a press elsewhere on the panel is swallowed; anything else
    /// starts an orbit drag.
    pub fn pointer_pressed(&mut self, cursor: (f64, f64)) {
        let width = self.surface_size.0;
        if let Some(idx) = self.panel.hit_test(cursor, width, self.pixel_ratio) {
            if let Some(value) = self.panel.toggle(idx, &mut self.scene) {
                log::debug!("{} set to {value}", self.panel.checkboxes[idx].label);
            }
            self.pointer = Pointer::OnPanel;
        } else if self.panel.contains(cursor, width, self.pixel_ratio) {
            self.pointer = Pointer::OnPanel;
        } else {
            self.pointer = Pointer::Orbiting(cursor);
        }
    }

    pub fn pointer_moved(&mut self, cursor: (f64, f64)) {
        if let Pointer::Orbiting(last) = self.pointer {
            let dx = (cursor.0 - last.0) as f32;
            let dy = (cursor.1 - last.1) as f32;
            self.controller
                .handle_drag(dx, dy, self.surface_size.1 as f32);
            self.pointer = Pointer::Orbiting(cursor);
        }
    }

    pub fn pointer_released(&mut self) {
        self.pointer = Pointer::Idle;
    }

    /// A finger went down. The first finger acts like the left mouse button.
    pub fn touch_started(&mut self, id: u64, position: (f64, f64)) {
        if self.touch.is_none() {
            self.touch = Some(id);
            self.pointer_pressed(position);
        }
    }

    pub fn touch_moved(&mut self, id: u64, position: (f64, f64)) {
        if self.touch == Some(id) {
            self.pointer_moved(position);
        }
    }

    pub fn touch_ended(&mut self, id: u64) {
        if self.touch == Some(id) {
            self.touch = None;
            self.pointer_released();
        }
    }

    /// Wheel input in lines; positive scrolls towards the scene.
    pub fn wheel(&mut self, lines: f32) {
        if lines != 0.0 {
            self.controller.handle_wheel(lines.signum());
        }
    }

    /// Debug panel geometry for the current surface.
    pub fn overlay(&self) -> (Vec<GuiVertex>, Vec<u32>) {
        self.panel.mesh(self.surface_size, self.pixel_ratio)
    }

    /// Debug panel text for the current surface.
    pub fn captions(&self) -> Vec<Caption> {
        self.panel.captions(self.surface_size.0, self.pixel_ratio)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn panel(&self) -> &DebugPanel {
        &self.panel
    }

    /// Sets checkbox `idx` of the debug panel.
    pub fn set_control(&mut self, idx: usize, value: bool) {
        self.panel.set(idx, value, &mut self.scene);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    pub fn moon(&self) -> ObjectId {
        self.moon
    }

    pub fn cube(&self) -> ObjectId {
        self.cube
    }

    pub fn text(&self) -> Option<ObjectId> {
        self.text
    }

    pub fn moon_material(&self) -> MaterialId {
        self.moon_material
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        let config = SceneConfig {
            star_count: 10,
            seed: Some(7),
            ..Default::default()
        };
        Stage::from_config(config, 800, 600)
    }

    #[test]
    fn drag_outside_the_panel_orbits() {
        let mut stage = stage();
        let before = stage.camera().position;
        stage.pointer_pressed((100.0, 300.0));
        stage.pointer_moved((160.0, 300.0));
        stage.pointer_released();
        stage.animate();
        assert_ne!(stage.camera().position, before);
    }

    #[test]
    fn press_on_the_panel_toggles_and_does_not_orbit() {
        let mut stage = stage();
        let before = stage.camera().position;
        stage.pointer_pressed((700.0, 30.0));
        stage.pointer_moved((600.0, 200.0));
        stage.pointer_released();
        stage.animate();
        let moved = stage.camera().position - before;
        assert!(moved.x.abs() < 1e-4 && moved.y.abs() < 1e-4 && moved.z.abs() < 1e-4);
        let moon = stage.moon_material();
        assert!(stage.scene().material(moon).unwrap().wireframe);
    }

    #[test]
    fn zero_resize_is_ignored() {
        let mut stage = stage();
        stage.resize(0, 0);
        assert_eq!(stage.surface_size(), (800, 600));
    }

    #[test]
    fn relief_texture_is_shared_by_displacement_and_bump() {
        let stage = stage();
        let moon = stage.scene().material(stage.moon_material()).unwrap();
        assert_eq!(moon.displacement_map, moon.bump_map);
        assert_eq!(stage.textures().len(), 3);
        let relief = stage.textures().get(moon.bump_map.unwrap()).unwrap();
        assert_eq!(relief.color_space, ColorSpace::Linear);
    }
}
