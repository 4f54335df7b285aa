//! Chapter 1: a first animated scene.

use anyhow::Result;
use glam::Vec3;

use super::{ground_plane, Spawned};
use crate::animation::{Bounce, SlotId, Spin};
use crate::camera::Camera;
use crate::color::Color;
use crate::lighting::Light;
use crate::material::Material;
use crate::page::{Page, Stage};
use crate::panel::{ControlSpec, Panel};
use crate::param::ParamState;
use crate::scene_graph::{Geometry, MeshInstance, Transform};

/// A spinning cube and a bouncing sphere on a plane, with speed sliders.
#[derive(Default)]
pub struct MaterialsAnimation {
    spawned: Spawned,
    spin: Option<SlotId>,
    bounce: Option<SlotId>,
}

impl MaterialsAnimation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Page for MaterialsAnimation {
    fn id(&self) -> &'static str {
        "chapter01/materials-animation"
    }

    fn title(&self) -> &'static str {
        "Materials, light and animation"
    }

    fn chapter(&self) -> u32 {
        1
    }

    fn defaults(&self) -> ParamState {
        ParamState::new()
            .with("rotationSpeed", 0.02)
            .with("bouncingSpeed", 0.05)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .control("rotationSpeed", ControlSpec::number(0.0, 0.5, 0.01))
            .control("bouncingSpeed", ControlSpec::number(0.0, 0.5, 0.01))
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;

        let mut plane = ground_plane(60.0, 20.0, Material::lambert(0xffffff));
        plane.transform.position = Vec3::new(15.0, 0.0, 0.0);
        self.spawned.spawn(stage, plane);

        let cube = self.spawned.spawn(
            stage,
            MeshInstance::new(
                Geometry::Box {
                    width: 4.0,
                    height: 4.0,
                    depth: 4.0,
                },
                Material::lambert(0xff0000),
            )
            .named("cube")
            .with_transform(Transform::at(-4.0, 4.0, 0.0))
            .casting_shadow(),
        );
        self.spin = Some(stage.frames.register("cube", cube, Spin::new(Vec3::ONE, 0.02)));

        let sphere = self.spawned.spawn(
            stage,
            MeshInstance::new(
                Geometry::Sphere {
                    radius: 4.0,
                    segments: 20,
                },
                Material::lambert(0x7777ff),
            )
            .named("sphere")
            .with_transform(Transform::at(20.0, 4.0, 2.0))
            .casting_shadow(),
        );
        self.bounce = Some(stage.frames.register(
            "sphere",
            sphere,
            Bounce::new(2.0, 10.0, 0.05).with_orbit(20.0, 10.0),
        ));

        self.spawned
            .spawn(stage, Light::spot(0xffffff).at(-10.0, 20.0, -5.0).with_shadow());
        self.spawned.spawn(stage, Light::ambient(0x353535));

        let camera = stage.spawn_camera(Camera::perspective(45.0, [-30.0, 40.0, 30.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        if let (Some(slot), Some(speed)) = (self.spin, state.number("rotationSpeed")) {
            stage.frames.set_speed(slot, speed as f32);
        }
        if let (Some(slot), Some(speed)) = (self.bounce, state.number("bouncingSpeed")) {
            stage.frames.set_speed(slot, speed as f32);
        }
    }

    fn unmount(&mut self, stage: &mut Stage) {
        self.spawned.dispose_all(stage);
        self.spin = None;
        self.bounce = None;
    }
}
