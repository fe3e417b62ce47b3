use std::time::Duration;

use moonscape::{
    config::SceneConfig,
    resources::{self, AssetEvent, spawn_asset_loads},
};
use tokio::sync::mpsc;

use crate::common::test_utils;

mod common;

/// Runs every load for `config` and collects the events until all loads are
/// done.
async fn drain_loads(config: SceneConfig) -> Vec<AssetEvent> {
    let stage = moonscape::stage::Stage::from_config(
        SceneConfig {
            star_count: 0,
            ..config
        },
        test_utils::WIDTH,
        test_utils::HEIGHT,
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let sink = move |event: AssetEvent| {
        let _ = tx.send(event);
    };
    spawn_asset_loads(
        &tokio::runtime::Handle::current(),
        stage.config(),
        stage.textures(),
        sink,
    );

    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn missing_root_fails_every_texture_and_drops_the_font() {
    let events = drain_loads(SceneConfig {
        asset_root: "/definitely/not/here".to_string(),
        ..test_utils::seeded_config(1)
    })
    .await;

    assert_eq!(events.len(), 3, "{events:?}");
    assert!(events.iter().all(|e| matches!(e, AssetEvent::TextureFailed { .. })));
}

#[tokio::test]
async fn bundled_font_loads_from_the_asset_root() {
    let events = drain_loads(test_utils::seeded_config(1)).await;
    let fonts = events
        .iter()
        .filter(|e| matches!(e, AssetEvent::FontLoaded(_)))
        .count();
    assert_eq!(fonts, 1, "{events:?}");
    // one event per texture, loaded or not
    let textures = events.len() - fonts;
    assert_eq!(textures, 3);
}

#[test]
fn failed_textures_stay_failed_on_the_stage() {
    let mut stage = test_utils::small_stage();
    let moon = stage.scene().material(stage.moon_material()).unwrap().clone();
    let map = moon.map.unwrap();

    stage.handle_asset(AssetEvent::TextureFailed { handle: map });
    assert!(!stage.textures().is_loaded(map));
    let generation = stage.textures().generation();

    stage.handle_asset(AssetEvent::TextureLoaded {
        handle: map,
        image: image::RgbaImage::new(2, 2),
    });
    assert!(!stage.textures().is_loaded(map));
    assert_eq!(stage.textures().generation(), generation);
    assert_eq!(stage.textures().pending().count(), 2);
}

#[test]
fn loaded_texture_is_shared_by_every_material_slot_using_it() {
    let mut stage = test_utils::small_stage();
    let moon = stage.scene().material(stage.moon_material()).unwrap().clone();
    let relief = moon.bump_map.unwrap();

    stage.on_texture_loaded(relief, image::RgbaImage::new(4, 4));
    assert!(stage.textures().is_loaded(relief));
    assert!(stage.textures().is_loaded(moon.displacement_map.unwrap()));
    assert!(!stage.textures().is_loaded(moon.map.unwrap()));
}

#[tokio::test]
async fn loading_a_missing_file_is_an_error() {
    let root = test_utils::asset_root();
    assert!(resources::load_binary(&root, "textures/nope.png").await.is_err());
    assert!(resources::texture::load_image(&root, "fonts/moonscape_sans.typeface.json")
        .await
        .is_err());
    let font = resources::load_font(&root, "fonts/moonscape_sans.typeface.json")
        .await
        .unwrap();
    assert!(font.glyph('M').is_some());
}

#[tokio::test]
async fn default_font_path_names_the_bundled_typeface() {
    let config = SceneConfig::default();
    assert!(config.assets.font.ends_with("moonscape_sans.typeface.json"));
    let font = resources::load_font(&test_utils::asset_root(), &config.assets.font)
        .await
        .unwrap();
    assert_eq!(font.family_name, "Moonscape Sans");
}
