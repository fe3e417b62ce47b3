use cgmath::{InnerSpace, Rad};

use crate::common::test_utils::{self, approx};

mod common;

#[test]
fn wireframe_toggle_touches_only_the_moon_material() {
    let mut stage = test_utils::small_stage();
    let revision = stage.scene().revision();

    stage.set_control(0, true);

    let changed: Vec<_> = stage
        .scene()
        .materials_changed_since(revision)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(changed, vec![stage.moon_material()]);
    for (id, material) in stage.scene().materials() {
        assert_eq!(material.wireframe, id == stage.moon_material(), "{id:?}");
    }
    assert!(stage.panel().checkboxes[0].value);

    stage.set_control(0, false);
    assert!(stage.scene().materials().all(|(_, m)| !m.wireframe));
}

#[test]
fn clicking_the_checkbox_row_flips_it_back_and_forth() {
    let mut stage = test_utils::small_stage();
    let (width, _) = stage.surface_size();
    let row = (width as f64 - 100.0, 45.0);

    stage.pointer_pressed(row);
    stage.pointer_released();
    assert!(stage.scene().material(stage.moon_material()).unwrap().wireframe);

    stage.pointer_pressed(row);
    stage.pointer_released();
    assert!(!stage.scene().material(stage.moon_material()).unwrap().wireframe);
}

#[test]
fn resize_updates_aspect_and_surface() {
    let mut stage = test_utils::small_stage();
    stage.resize(1920, 1080);
    assert_eq!(stage.surface_size(), (1920, 1080));
    assert!(approx(stage.projection().aspect, 1920.0 / 1080.0));

    stage.resize(1920, 0);
    assert_eq!(stage.surface_size(), (1920, 1080));
}

#[test]
fn animate_spins_the_moon_a_fixed_step_per_frame() {
    let mut stage = test_utils::small_stage();
    let frames = 100;
    for _ in 0..frames {
        stage.animate();
    }
    let moon = stage.scene().object(stage.moon()).unwrap();
    let Rad(y) = moon.transform.rotation.y;
    let Rad(x) = moon.transform.rotation.x;
    assert!(approx(y, 0.002 * frames as f32), "{y}");
    assert!(approx(x, 0.0001 * frames as f32), "{x}");

    let cube = stage.scene().object(stage.cube()).unwrap();
    assert_eq!(cube.transform.rotation.y, Rad(0.0));
}

#[test]
fn animate_without_input_leaves_the_camera_in_place() {
    let mut stage = test_utils::small_stage();
    let start = stage.camera().position;
    for _ in 0..10 {
        stage.animate();
    }
    assert!((stage.camera().position - start).magnitude() < 1e-4);
}

#[test]
fn orbit_keeps_distance_and_glides_after_release() {
    let mut stage = test_utils::small_stage();
    stage.pointer_pressed((100.0, 300.0));
    stage.pointer_moved((200.0, 320.0));
    stage.pointer_released();

    stage.animate();
    let after_one = stage.camera().position;
    stage.animate();
    let after_two = stage.camera().position;
    assert_ne!(after_one, after_two);

    let distance = (after_two - stage.camera().target).magnitude();
    assert!(approx(distance, 5.0), "{distance}");
}

#[test]
fn wheel_moves_the_camera_closer() {
    let mut stage = test_utils::small_stage();
    stage.wheel(3.0);
    stage.animate();
    let distance = (stage.camera().position - stage.camera().target).magnitude();
    assert!(distance < 5.0);
}

#[test]
fn overlay_is_only_quads() {
    let stage = test_utils::small_stage();
    let (vertices, indices) = stage.overlay();
    // background, title bar and one checkbox
    assert_eq!(vertices.len(), 3 * 4);
    assert_eq!(indices.len(), 3 * 6);
}

#[test]
fn captions_follow_the_panel_on_resize() {
    let mut stage = test_utils::small_stage();
    let (width, _) = stage.surface_size();
    let before = stage.captions();
    stage.resize(width + 200, 600);
    let after = stage.captions();
    assert_eq!(after.len(), before.len());
    for (a, b) in after.iter().zip(&before) {
        assert_eq!(a.text, b.text);
        assert!(approx(a.left - b.left, 200.0), "{} -> {}", b.left, a.left);
        assert_eq!(a.top, b.top);
    }
}

#[test]
fn one_finger_drag_orbits_like_the_mouse() {
    let mut stage = test_utils::small_stage();
    let start = stage.camera().position;
    stage.touch_started(7, (100.0, 300.0));
    stage.touch_moved(7, (200.0, 320.0));
    stage.touch_ended(7);
    stage.animate();
    assert!((stage.camera().position - start).magnitude() > 1e-4);
}

#[test]
fn second_finger_does_not_steer_the_orbit() {
    let mut stage = test_utils::small_stage();
    let start = stage.camera().position;
    stage.touch_started(1, (100.0, 300.0));
    stage.touch_started(2, (400.0, 300.0));
    stage.touch_moved(2, (600.0, 100.0));
    stage.touch_ended(2);
    stage.touch_ended(1);
    stage.animate();
    assert!((stage.camera().position - start).magnitude() < 1e-4);
}

#[test]
fn tapping_the_checkbox_row_toggles_wireframe() {
    let mut stage = test_utils::small_stage();
    let (width, _) = stage.surface_size();
    stage.touch_started(3, (width as f64 - 100.0, 45.0));
    stage.touch_ended(3);
    assert!(stage.scene().material(stage.moon_material()).unwrap().wireframe);
}
