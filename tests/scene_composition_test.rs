use moonscape::{
    data_structures::{material::MaterialKind, scene::Light},
    stage::Stage,
};

use crate::common::test_utils::{self, approx};

mod common;

#[test]
fn fresh_stage_holds_moon_cube_and_stars_but_no_text() {
    let stage = test_utils::stage();
    let scene = stage.scene();

    assert_eq!(scene.object(stage.moon()).unwrap().name, "moon");
    assert_eq!(scene.object(stage.cube()).unwrap().name, "meme");
    assert!(stage.text().is_none());
    assert!(scene.find("text").is_none());

    let stars = scene.objects().filter(|(_, m)| m.name == "star").count();
    assert_eq!(stars, 5000);
    assert_eq!(scene.len(), 5002);
}

#[test]
fn stars_stay_inside_the_spread_cube() {
    let stage = test_utils::stage();
    let half = stage.config().star_spread / 2.0;
    assert!(approx(half, 150.0));

    for (_, star) in stage.scene().objects().filter(|(_, m)| m.name == "star") {
        let p = star.transform.position;
        for c in [p.x, p.y, p.z] {
            assert!(c.abs() <= half, "star at {p:?}");
        }
    }
}

#[test]
fn stars_share_one_geometry_and_material() {
    let stage = test_utils::stage();
    let mut stars = stage.scene().objects().filter(|(_, m)| m.name == "star");
    let (_, first) = stars.next().unwrap();
    assert!(stars.all(|(_, m)| m.geometry == first.geometry && m.material == first.material));
    let material = stage.scene().material(first.material).unwrap();
    assert_eq!(material.kind, MaterialKind::Standard);
    assert_eq!(material.color, [1.0, 1.0, 1.0]);
}

#[test]
fn same_seed_gives_same_starfield() {
    let config = test_utils::seeded_config(3);
    let a = Stage::from_config(config.clone(), 800, 600);
    let b = Stage::from_config(config, 800, 600);
    let positions = |s: &Stage| -> Vec<_> {
        s.scene()
            .objects()
            .filter(|(_, m)| m.name == "star")
            .map(|(_, m)| m.transform.position)
            .collect()
    };
    assert_eq!(positions(&a), positions(&b));

    let c = Stage::from_config(test_utils::seeded_config(4), 800, 600);
    assert_ne!(positions(&a), positions(&c));
}

#[test]
fn moon_material_uses_relief_for_displacement_and_bump() {
    let stage = test_utils::stage();
    let moon = stage.scene().material(stage.moon_material()).unwrap();
    assert_eq!(moon.kind, MaterialKind::Phong);
    assert!(moon.map.is_some());
    assert_eq!(moon.displacement_map, moon.bump_map);
    assert!(approx(moon.displacement_scale, 0.08));
    assert!(approx(moon.bump_scale, 0.03));
    assert!(!moon.wireframe);
}

#[test]
fn lights_are_a_directional_key_and_a_dim_hemisphere() {
    let stage = test_utils::stage();
    let lights = stage.scene().lights();
    assert_eq!(lights.len(), 2);
    match &lights[0] {
        Light::Directional(sun) => {
            assert_eq!(sun.position, [-100.0, 10.0, 50.0]);
            assert!(approx(sun.intensity, 1.0));
        }
        other => panic!("expected a directional light, got {other:?}"),
    }
    match &lights[1] {
        Light::Hemisphere(fill) => assert!(approx(fill.intensity, 0.05)),
        other => panic!("expected a hemisphere light, got {other:?}"),
    }
}

#[test]
fn camera_starts_on_the_z_axis_looking_at_the_origin() {
    let stage = test_utils::stage();
    let camera = stage.camera();
    assert_eq!(camera.position, cgmath::Point3::new(0.0, 0.0, 5.0));
    assert_eq!(camera.target, cgmath::Point3::new(0.0, 0.0, 0.0));
    assert!(approx(stage.projection().aspect, 800.0 / 600.0));
}
