//! Chapter 2: the basic components of a scene.

use std::f32::consts::FRAC_PI_4;

use anyhow::Result;
use glam::Vec3;

use super::{ground_plane, Spawned};
use crate::animation::{SlotId, Spin};
use crate::binding::Binding;
use crate::camera::Camera;
use crate::color::Color;
use crate::lighting::{Light, LightKind};
use crate::material::Material;
use crate::page::{Page, Stage};
use crate::panel::{ControlSpec, Folder, Panel};
use crate::param::ParamState;
use crate::particle::Rng;
use crate::scene_graph::{EntityId, Geometry, MeshInstance, Transform};

const PLANE_WIDTH: f32 = 60.0;
const PLANE_HEIGHT: f32 = 40.0;
const MAX_CUBES: f64 = 100.0;

// ============================================================================
// Basic scene
// ============================================================================

/// A plane with a variable number of randomly placed spinning cubes.
pub struct BasicScene {
    spawned: Spawned,
    cubes: Vec<EntityId>,
    spin: Option<SlotId>,
    speed: f32,
    rng: Rng,
    seed: u64,
}

impl BasicScene {
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    /// Cube placement is drawn from `seed`, so runs are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            spawned: Spawned::new(),
            cubes: Vec::new(),
            spin: None,
            speed: 0.02,
            rng: Rng::new(seed),
            seed,
        }
    }

    pub fn cube_count(&self) -> usize {
        self.cubes.len()
    }

    fn random_cube(&mut self, index: usize) -> MeshInstance {
        let size = (self.rng.next_f32() * 3.0).ceil().max(1.0);
        let x = -30.0 + (self.rng.next_f32() * PLANE_WIDTH).round();
        let y = (self.rng.next_f32() * 5.0).round();
        let z = -20.0 + (self.rng.next_f32() * PLANE_HEIGHT).round();
        let color = (self.rng.next_f32() * 0xffffff as f32) as u32;

        MeshInstance::new(
            Geometry::Box {
                width: size,
                height: size,
                depth: size,
            },
            Material::lambert(color),
        )
        .named(&format!("cube-{}", index))
        .with_transform(Transform::at(x, y, z))
        .casting_shadow()
    }

    /// Grow or shrink the cube list to `count`. Existing cubes keep their
    /// placement; shrinking drops the newest ones.
    fn reconcile(&mut self, count: usize, stage: &mut Stage) {
        if count == self.cubes.len() {
            return;
        }
        while self.cubes.len() > count {
            if let Some(id) = self.cubes.pop() {
                stage.dispose(id);
            }
        }
        while self.cubes.len() < count {
            let cube = self.random_cube(self.cubes.len());
            self.cubes.push(stage.scene.spawn(cube));
        }
        log::debug!("basic scene now has {} cubes", self.cubes.len());

        if self.cubes.is_empty() {
            // The frame loop drops a callback once its last target is gone.
            self.spin = None;
            return;
        }
        let retargeted = self
            .spin
            .map(|slot| stage.frames.retarget(slot, self.cubes.clone()))
            .unwrap_or(false);
        if !retargeted {
            self.spin = Some(stage.frames.register_many(
                "cubes",
                self.cubes.clone(),
                Spin::new(Vec3::ONE, self.speed),
            ));
        }
    }
}

impl Default for BasicScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for BasicScene {
    fn id(&self) -> &'static str {
        "chapter02/basic-scene"
    }

    fn title(&self) -> &'static str {
        "Basic scene"
    }

    fn chapter(&self) -> u32 {
        2
    }

    fn defaults(&self) -> ParamState {
        ParamState::new()
            .with("cubeCount", 0.0)
            .with("rotationSpeed", 0.02)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .control("cubeCount", ControlSpec::number(0.0, MAX_CUBES, 1.0))
            .control("rotationSpeed", ControlSpec::number(0.0, 0.5, 0.01))
            .control("addCube", ControlSpec::button().labelled("Add Cube"))
            .control("removeCube", ControlSpec::button().labelled("Remove Cube"))
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        self.rng = Rng::new(self.seed);
        stage.scene.background = Color::BLACK;

        self.spawned.spawn(
            stage,
            ground_plane(PLANE_WIDTH, PLANE_HEIGHT, Material::lambert(0xffffff)),
        );
        self.spawned.spawn(
            stage,
            Light::spot(0xffffff)
                .with_intensity(1.2)
                .with_distance(150.0)
                .at(-40.0, 60.0, -10.0)
                .with_shadow(),
        );
        self.spawned.spawn(stage, Light::ambient(0x3c3c3c));

        let camera = stage.spawn_camera(Camera::perspective(45.0, [-30.0, 40.0, 30.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        if let Some(speed) = state.number("rotationSpeed") {
            self.speed = speed as f32;
            if let Some(slot) = self.spin {
                stage.frames.set_speed(slot, self.speed);
            }
        }
        if let Some(count) = state.number("cubeCount") {
            self.reconcile(count.clamp(0.0, MAX_CUBES) as usize, stage);
        }
    }

    fn action(&mut self, name: &str, state: &mut ParamState, _stage: &mut Stage) -> bool {
        let count = state.number("cubeCount").unwrap_or(0.0);
        let next = match name {
            "addCube" => (count + 1.0).min(MAX_CUBES),
            "removeCube" => (count - 1.0).max(0.0),
            _ => return false,
        };
        state.set("cubeCount", next);
        true
    }

    fn unmount(&mut self, stage: &mut Stage) {
        stage.dispose_all(self.cubes.drain(..));
        self.spawned.dispose_all(stage);
        self.spin = None;
    }
}

// ============================================================================
// Mesh properties
// ============================================================================

/// A box drawn twice (wireframe and translucent) whose transform is edited
/// from the panel.
#[derive(Default)]
pub struct MeshProperties {
    spawned: Spawned,
    shapes: Binding,
}

impl MeshProperties {
    pub fn new() -> Self {
        Self::default()
    }
}

fn axis_group(value: f64) -> [(&'static str, f64); 3] {
    [("x", value), ("y", value), ("z", value)]
}

fn axis_folder(title: &str, min: f64, max: f64) -> Folder {
    ["x", "y", "z"].iter().fold(Folder::new(title), |folder, axis| {
        folder.control(
            &format!("{}.{}", title, axis),
            ControlSpec::number(min, max, 0.1),
        )
    })
}

impl Page for MeshProperties {
    fn id(&self) -> &'static str {
        "chapter02/mesh-properties"
    }

    fn title(&self) -> &'static str {
        "Mesh properties"
    }

    fn chapter(&self) -> u32 {
        2
    }

    fn defaults(&self) -> ParamState {
        ParamState::new()
            .with_group("scale", axis_group(1.0))
            .with_group("position", axis_group(0.0))
            .with_group("rotation", axis_group(0.0))
            .with_group("translate", axis_group(0.0))
            .with("visible", true)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .folder(axis_folder("scale", 0.0, 5.0))
            .folder(axis_folder("position", -10.0, 10.0))
            .folder(axis_folder("rotation", -4.0, 4.0))
            .folder(axis_folder("translate", -10.0, 10.0).control("translate", ControlSpec::button()))
            .control("visible", ControlSpec::boolean())
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;
        self.spawned.spawn(
            stage,
            ground_plane(PLANE_WIDTH, PLANE_HEIGHT, Material::lambert(0xffffff)),
        );

        let shape = |material| {
            MeshInstance::new(
                Geometry::Box {
                    width: 5.0,
                    height: 8.0,
                    depth: 3.0,
                },
                material,
            )
        };
        let wireframe = self.spawned.spawn(
            stage,
            shape(Material::basic(0x000000).with_wireframe()).named("wireframe"),
        );
        let solid = self.spawned.spawn(
            stage,
            shape(Material::lambert(0x44ff44).with_opacity(0.6))
                .named("solid")
                .casting_shadow(),
        );
        self.shapes.rebind_many([wireframe, solid]);

        self.spawned.spawn(stage, Light::ambient(0x494949));
        let mut spot = Light::spot(0xffffff)
            .with_distance(180.0)
            .at(-40.0, 30.0, 30.0)
            .with_shadow();
        if let LightKind::Spot { angle, .. } = &mut spot.kind {
            *angle = FRAC_PI_4;
        }
        self.spawned.spawn(stage, spot);

        let camera = stage.spawn_camera(Camera::perspective(45.0, [-20.0, 25.0, 20.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        self.shapes.apply(state, &mut stage.scene);
    }

    /// Move the shapes by the translate offset, then pull their new position
    /// back into the panel.
    fn action(&mut self, name: &str, state: &mut ParamState, stage: &mut Stage) -> bool {
        if name != "translate" {
            return false;
        }
        let axis = |a: &str| state.number(&format!("translate.{}", a)).unwrap_or(0.0) as f32;
        let offset = Vec3::new(axis("x"), axis("y"), axis("z"));
        for &id in self.shapes.targets() {
            if let Some(entity) = stage.scene.get_mut(id) {
                entity.transform_mut().position += offset;
            }
        }
        self.shapes.read_back(state, &stage.scene);
        true
    }

    fn unmount(&mut self, stage: &mut Stage) {
        self.spawned.dispose_all(stage);
        self.shapes = Binding::unbound();
    }
}
