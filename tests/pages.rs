//! End-to-end checks over every registered page.
//!
//! Run with: cargo test --test pages

use gallery::asset::Assets;
use gallery::binding::{apply_to_target, read_back, Binding};
use gallery::material::Material;
use gallery::page::Demo;
use gallery::panel::ControlKind;
use gallery::param::{ParamState, ParamValue};
use gallery::registry;
use gallery::scene_graph::{Geometry, MeshInstance, SceneEntity, SceneGraph};
use gallery::scripting::ScriptEngine;

fn demo(id: &str) -> Demo {
    let page = registry::create(id).unwrap_or_else(|| panic!("no page {}", id));
    Demo::new(page, Assets::default())
}

fn cube() -> MeshInstance {
    MeshInstance::new(
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        },
        Material::lambert(0xff0000),
    )
}

#[test]
fn test_every_page_mounts_runs_and_unmounts_clean() {
    for (id, _, _) in registry::pages() {
        let mut demo = demo(id);
        demo.mount().unwrap();
        assert!(!demo.scene().is_empty(), "{} built nothing", id);
        assert!(demo.stage().active_camera().is_some(), "{} has no camera", id);

        demo.run(120, 1.0 / 60.0);
        assert_eq!(demo.report().frames, 120);

        demo.unmount();
        assert!(demo.scene().is_empty(), "{} left entities behind", id);
        assert!(demo.stage().frames.is_empty(), "{} left frame callbacks", id);
    }
}

#[test]
fn test_every_default_is_a_valid_panel_value() {
    for (id, _, _) in registry::pages() {
        let mut demo = demo(id);
        demo.mount().unwrap();
        let defaults = demo.state().clone();
        for (path, value) in defaults.values() {
            let editable = match demo.panel().find(&path) {
                Some(control) => !matches!(
                    control.kind,
                    ControlKind::Button | ControlKind::Text { read_only: true }
                ),
                None => false,
            };
            if editable {
                demo.edit(&path, value.clone())
                    .unwrap_or_else(|e| panic!("{}: {}", id, e));
                assert_eq!(demo.state().get(&path), Some(value), "{}: {}", id, path);
            }
        }
        demo.unmount();
    }
}

#[test]
fn test_unrelated_keys_are_skipped() {
    let state = ParamState::new()
        .with("opacity", 0.5)
        .with("visible", true)
        .with("cubeCount", 5.0);
    let mut target = cube();

    apply_to_target(&state, &mut target);
    apply_to_target(&state, &mut target);
    assert_eq!(target.material.opacity, 0.5);
    assert!(target.visible);

    let mut seen = ParamState::new()
        .with("opacity", 1.0)
        .with("visible", false)
        .with("cubeCount", 0.0);
    read_back(&mut seen, &target);
    assert_eq!(seen.get("opacity"), Some(&ParamValue::Number(0.5)));
    assert_eq!(seen.get("visible"), Some(&ParamValue::Bool(true)));
    assert_eq!(seen.get("cubeCount"), Some(&ParamValue::Number(0.0)));
}

#[test]
fn test_binding_follows_rebind() {
    let mut scene = SceneGraph::new();
    let first = scene.spawn(cube());
    let mut binding = Binding::new(first);
    scene.destroy(first);

    let state = ParamState::new().with("opacity", 0.25);
    assert_eq!(binding.apply(&state, &mut scene), 0);

    let second = scene.spawn(cube());
    binding.rebind(second);
    binding.apply(&state, &mut scene);
    assert_eq!(scene.material(second).unwrap().opacity, 0.25);
}

#[test]
fn test_script_changes_page_state() {
    let mut engine = ScriptEngine::new();
    engine
        .load_script("fn update(frame, params) { #{ rotationSpeed: 0.5 } }")
        .unwrap();

    let mut demo = demo("chapter01/materials-animation");
    demo.set_script(engine);
    demo.mount().unwrap();
    assert_eq!(demo.state().number("rotationSpeed"), Some(0.02));

    demo.frame(1.0 / 60.0);
    assert_eq!(demo.state().number("rotationSpeed"), Some(0.5));
    demo.unmount();
}

#[test]
fn test_buttons_route_through_edit() {
    let mut demo = demo("chapter02/basic-scene");
    demo.mount().unwrap();
    let before = demo.scene().meshes().count();

    demo.edit("addCube", ParamValue::Bool(true)).unwrap();
    demo.press("addCube").unwrap();
    assert_eq!(demo.scene().meshes().count(), before + 2);
    demo.press("removeCube").unwrap();
    assert_eq!(demo.scene().meshes().count(), before + 1);

    // The count never drops below zero.
    demo.press("removeCube").unwrap();
    demo.press("removeCube").unwrap();
    assert_eq!(demo.scene().meshes().count(), before);
    assert_eq!(demo.state().number("cubeCount"), Some(0.0));
    assert!(demo.press("noSuchButton").is_err());
    demo.unmount();
}

#[test]
fn test_reported_params_feed_back_in() {
    for (id, _, _) in registry::pages() {
        let mut demo = demo(id);
        demo.mount().unwrap();
        demo.run(5, 1.0 / 60.0);
        let params = demo.report().params;
        demo.edit_all(&params)
            .unwrap_or_else(|e| panic!("{}: {}", id, e));
        assert_eq!(demo.state(), &params, "{}", id);
        demo.unmount();
    }
}

#[test]
fn test_script_overrides_are_bounded_by_the_panel() {
    let mut engine = ScriptEngine::new();
    engine
        .load_script("fn update(frame, params) { #{ count: 200000.0, opacity: -5.0 } }")
        .unwrap();
    let mut demo = demo("chapter07/rainy-scene");
    demo.set_script(engine);
    demo.mount().unwrap();
    demo.frame(1.0 / 60.0);

    assert_eq!(demo.state().number("count"), Some(3000.0));
    assert_eq!(demo.state().number("opacity"), Some(0.0));
    let particles: usize = demo
        .scene()
        .scene_entities()
        .filter_map(|(_, e)| match e {
            SceneEntity::Points(p) => Some(p.len()),
            _ => None,
        })
        .sum();
    assert_eq!(particles, 3000);
    demo.unmount();
}

#[test]
fn test_script_cannot_pick_an_unknown_choice() {
    let mut engine = ScriptEngine::new();
    engine
        .load_script(r#"fn update(frame, params) { #{ selectedMesh: "banana" } }"#)
        .unwrap();
    let mut demo = demo("chapter04/mesh-normal-material");
    demo.set_script(engine);
    demo.mount().unwrap();
    demo.run(2, 1.0 / 60.0);

    assert_eq!(
        demo.state().get("selectedMesh"),
        Some(&ParamValue::Text("sphere".into()))
    );
    assert!(demo.scene().meshes().all(|(_, m)| m.name != "banana"));
    demo.unmount();
}
