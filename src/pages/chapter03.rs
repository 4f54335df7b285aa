//! Chapter 3: lights.

use anyhow::Result;

use super::{ground_plane, Spawned};
use crate::animation::{Orbit, SlotId};
use crate::binding::Binding;
use crate::camera::Camera;
use crate::color::Color;
use crate::lighting::Light;
use crate::material::Material;
use crate::page::{Page, Stage};
use crate::panel::{ControlSpec, Panel};
use crate::param::ParamState;
use crate::scene_graph::{Geometry, MeshInstance, Transform};

/// A small village lit by a point light that orbits it.
#[derive(Default)]
pub struct PointLight {
    spawned: Spawned,
    ambient: Binding,
    point: Binding,
    orbit: Option<SlotId>,
}

impl PointLight {
    pub fn new() -> Self {
        Self::default()
    }
}

fn solid(geometry: Geometry, color: u32, x: f32, y: f32, z: f32) -> MeshInstance {
    MeshInstance::new(geometry, Material::phong(color))
        .with_transform(Transform::at(x, y, z))
        .casting_shadow()
        .receiving_shadow()
}

fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    Geometry::Box {
        width,
        height,
        depth,
    }
}

impl Page for PointLight {
    fn id(&self) -> &'static str {
        "chapter03/point-light"
    }

    fn title(&self) -> &'static str {
        "Point light"
    }

    fn chapter(&self) -> u32 {
        3
    }

    fn defaults(&self) -> ParamState {
        ParamState::new()
            .with("ambientColor", Color::from_u32(0x0c0c0c))
            .with("pointColor", Color::from_u32(0xccffcc))
            .with("distance", 100.0)
            .with("intensity", 1.0)
            .with("rotationSpeed", 0.01)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .control("ambientColor", ControlSpec::color())
            .control("pointColor", ControlSpec::color())
            .control("intensity", ControlSpec::number(0.0, 3.0, 0.1))
            .control("distance", ControlSpec::number(0.0, 100.0, 1.0))
            .control("rotationSpeed", ControlSpec::number(0.01, 0.1, 0.01))
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;

        // Bounding walls
        let wall = 0xa0522d;
        for (geometry, x, z) in [
            (cuboid(70.0, 2.0, 2.0), 15.0, -25.0),
            (cuboid(70.0, 2.0, 2.0), 15.0, 25.0),
            (cuboid(2.0, 2.0, 50.0), -19.0, 0.0),
            (cuboid(2.0, 2.0, 50.0), 49.0, 0.0),
        ] {
            self.spawned
                .spawn(stage, solid(geometry, wall, x, 1.0, z).named("wall"));
        }

        let mut ground = ground_plane(70.0, 50.0, Material::phong(0x9acd32));
        ground.transform.position.x = 15.0;
        self.spawned.spawn(stage, ground);

        // House
        self.spawned.spawn(
            stage,
            solid(
                Geometry::Cone {
                    radius: 5.0,
                    height: 4.0,
                },
                0x8b7213,
                25.0,
                8.0,
                0.0,
            )
            .named("roof"),
        );
        self.spawned.spawn(
            stage,
            solid(
                Geometry::Cylinder {
                    radius_top: 5.0,
                    radius_bottom: 5.0,
                    height: 6.0,
                },
                0xffe4c4,
                25.0,
                3.0,
                0.0,
            )
            .named("house"),
        );

        // Tree
        self.spawned.spawn(
            stage,
            solid(cuboid(1.0, 8.0, 1.0), 0x8b4513, -10.0, 4.0, 0.0).named("trunk"),
        );
        self.spawned.spawn(
            stage,
            solid(
                Geometry::Sphere {
                    radius: 4.0,
                    segments: 16,
                },
                0x00ff00,
                -10.0,
                12.0,
                0.0,
            )
            .named("leaves"),
        );

        let point = self.spawned.spawn(
            stage,
            Light::point(0xccffcc).with_decay(0.1).with_shadow(),
        );
        let marker = self.spawned.spawn(
            stage,
            MeshInstance::new(
                Geometry::Sphere {
                    radius: 0.2,
                    segments: 8,
                },
                Material::basic(0xac6c25),
            )
            .named("light-marker"),
        );
        self.orbit = Some(stage.frames.register_many(
            "point light",
            vec![point, marker],
            Orbit::new(14.0, 25.0, 5.0, 0.01),
        ));
        self.point.rebind(point);

        let ambient = self.spawned.spawn(stage, Light::ambient(0x0c0c0c));
        self.ambient.rebind(ambient);

        let camera = stage.spawn_camera(Camera::perspective(45.0, [-30.0, 40.0, 30.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        let ambient = state.project(&[("ambientColor", "color"), ("intensity", "intensity")]);
        self.ambient.apply(&ambient, &mut stage.scene);

        let point = state.project(&[("pointColor", "color"), ("distance", "distance")]);
        self.point.apply(&point, &mut stage.scene);

        if let (Some(slot), Some(speed)) = (self.orbit, state.number("rotationSpeed")) {
            stage.frames.set_speed(slot, speed as f32);
        }
    }

    fn unmount(&mut self, stage: &mut Stage) {
        self.spawned.dispose_all(stage);
        self.ambient = Binding::unbound();
        self.point = Binding::unbound();
        self.orbit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Assets;
    use crate::lighting::LightKind;
    use crate::page::Demo;
    use crate::param::ParamValue;
    use crate::scene_graph::SceneEntity;

    fn light<'a>(demo: &'a Demo, name: &str) -> &'a Light {
        demo.scene()
            .scene_entities()
            .find_map(|(_, e)| match e {
                SceneEntity::Light(l) if l.kind_name() == name => Some(l),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_panel_fields_reach_their_lights() {
        let mut demo = Demo::new(Box::new(PointLight::new()), Assets::default());
        demo.mount().unwrap();

        demo.edit("ambientColor", ParamValue::Text("#ff0000".into())).unwrap();
        demo.edit("intensity", ParamValue::Number(2.0)).unwrap();
        demo.edit("distance", ParamValue::Number(40.0)).unwrap();

        let ambient = light(&demo, "ambient_light");
        assert_eq!(ambient.color, Color::new(1.0, 0.0, 0.0));
        assert_eq!(ambient.intensity, 2.0);

        let point = light(&demo, "point_light");
        assert_eq!(point.color, Color::from_u32(0xccffcc));
        assert_eq!(point.intensity, 1.0);
        match point.kind {
            LightKind::Point { distance, decay } => {
                assert_eq!(distance, 40.0);
                assert!((decay - 0.1).abs() < 1e-6);
            }
            _ => panic!("expected a point light"),
        }
    }

    #[test]
    fn test_marker_follows_the_light() {
        let mut demo = Demo::new(Box::new(PointLight::new()), Assets::default());
        demo.mount().unwrap();
        demo.edit("rotationSpeed", ParamValue::Number(0.1)).unwrap();

        for _ in 0..200 {
            demo.frame(1.0 / 60.0);
            let light_pos = light(&demo, "point_light").transform.position;
            let marker = demo
                .scene()
                .meshes()
                .find(|(_, m)| m.name == "light-marker")
                .unwrap()
                .1;
            assert_eq!(marker.transform.position, light_pos);
            assert_eq!(light_pos.y, 5.0);
            assert!(light_pos.z.abs() <= 25.0 + 1e-4);
        }
    }
}
