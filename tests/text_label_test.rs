use moonscape::{
    config::TextConfig,
    data_structures::{material::MaterialKind, text::TextGeometry},
};

use crate::common::test_utils::{self, approx};

mod common;

#[test]
fn font_arrival_adds_a_centred_text_label() {
    let mut stage = test_utils::small_stage();
    let before = stage.scene().len();

    stage.on_font_loaded(&test_utils::font());

    let id = stage.text().expect("text label added");
    assert_eq!(stage.scene().len(), before + 1);
    let mesh = stage.scene().object(id).unwrap();
    assert_eq!(mesh.name, "text");
    assert!(approx(mesh.transform.position.y, 2.75));
    assert!(approx(mesh.transform.scale.z, 0.5));

    let material = stage.scene().material(mesh.material).unwrap();
    assert_eq!(material.kind, MaterialKind::Basic);

    let bbox = stage
        .scene()
        .geometry(mesh.geometry)
        .and_then(|g| g.bounding_box())
        .unwrap();
    let centre = bbox.center();
    assert!(approx(centre.x, 0.0) && approx(centre.y, 0.0) && approx(centre.z, 0.0));
    assert!(bbox.size().x > 0.5, "{bbox:?}");
    // depth plus a bevel on either face
    assert!((bbox.size().z - 0.26).abs() < 1e-3, "{bbox:?}");
}

#[test]
fn second_font_keeps_the_existing_label() {
    let mut stage = test_utils::small_stage();
    let font = test_utils::font();
    stage.on_font_loaded(&font);
    let first = stage.text();
    let count = stage.scene().len();

    stage.on_font_loaded(&font);
    assert_eq!(stage.text(), first);
    assert_eq!(stage.scene().len(), count);
}

#[test]
fn panel_captions_do_not_wait_for_the_scene_font() {
    let mut stage = test_utils::small_stage();
    let before = stage.captions();
    assert_eq!(before.len(), 2);
    stage.on_font_loaded(&test_utils::font());
    assert_eq!(stage.captions(), before);
}

#[test]
fn text_without_outlines_is_skipped() {
    let mut config = test_utils::seeded_config(1);
    config.star_count = 0;
    config.text = TextConfig {
        text: "   ".to_string(),
        ..Default::default()
    };
    let mut stage = moonscape::stage::Stage::from_config(config, 640, 480);
    stage.on_font_loaded(&test_utils::font());
    assert!(stage.text().is_none());
}

#[test]
fn bevel_less_text_is_exactly_as_deep_as_configured() {
    let config = TextConfig {
        bevel_enabled: false,
        ..Default::default()
    };
    let geometry = TextGeometry::build(&test_utils::font(), &config);
    assert!(!geometry.vertices.is_empty());
    assert_eq!(geometry.vertices.len() % 3, 0);
    let bbox = geometry.bounding_box().unwrap();
    assert!(approx(bbox.size().z, 0.2));
}
