use moonscape::{config::SceneConfig, resources::font::Font, stage::Stage};

pub(crate) const WIDTH: u32 = 800;
pub(crate) const HEIGHT: u32 = 600;

/// Typeface shipped with the demo assets.
const FONT_JSON: &str = include_str!("../../assets/fonts/moonscape_sans.typeface.json");

pub(crate) fn asset_root() -> String {
    format!("{}/assets", env!("CARGO_MANIFEST_DIR"))
}

/// Default scene with a fixed starfield seed and the crate's own asset folder.
pub(crate) fn seeded_config(seed: u64) -> SceneConfig {
    SceneConfig {
        asset_root: asset_root(),
        seed: Some(seed),
        ..Default::default()
    }
}

pub(crate) fn stage() -> Stage {
    Stage::from_config(seeded_config(42), WIDTH, HEIGHT)
}

/// A stage with fewer stars, for tests that do not look at the starfield.
pub(crate) fn small_stage() -> Stage {
    let config = SceneConfig {
        star_count: 25,
        ..seeded_config(42)
    };
    Stage::from_config(config, WIDTH, HEIGHT)
}

pub(crate) fn font() -> Font {
    Font::from_json(FONT_JSON).expect("bundled typeface parses")
}

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
