//! Chapter 7: particles, sprites and point clouds.
//!
//! Rain and snow share one page type. Rain is a single point system; snow
//! is four systems with different sprites under one group. Changing `count`
//! respawns the systems, so the binding is re-established against the new
//! entities.

use anyhow::Result;

use super::Spawned;
use crate::animation::Precipitation;
use crate::asset::{AssetHandle, AssetState};
use crate::binding::Binding;
use crate::camera::Camera;
use crate::color::Color;
use crate::material::{Material, MaterialKind};
use crate::page::{Page, Stage};
use crate::panel::{ControlSpec, Panel};
use crate::param::ParamState;
use crate::particle::{ParticleSystem, PrecipitationConfig, PrecipitationKind};
use crate::scene_graph::{EntityId, Group, SceneEntity};

/// One sprite texture and the system drawn with it.
#[derive(Debug)]
struct Layer {
    texture: &'static str,
    request: Option<AssetHandle>,
    /// Texture path once it loaded.
    map: Option<String>,
    system: Option<EntityId>,
}

impl Layer {
    fn new(texture: &'static str) -> Self {
        Self {
            texture,
            request: None,
            map: None,
            system: None,
        }
    }
}

/// A precipitation scene.
pub struct WeatherScene {
    kind: PrecipitationKind,
    spawned: Spawned,
    layers: Vec<Layer>,
    /// The system (rain) or group (snow) holding the particles.
    root: Option<EntityId>,
    points: Binding,
    count: Option<usize>,
}

impl WeatherScene {
    pub fn rainy() -> Self {
        Self::new(PrecipitationKind::Rain, &["raindrop-3.png"])
    }

    pub fn snowy() -> Self {
        Self::new(
            PrecipitationKind::Snow,
            &[
                "snowflake1_t.png",
                "snowflake2_t.png",
                "snowflake3_t.png",
                "snowflake5_t.png",
            ],
        )
    }

    fn new(kind: PrecipitationKind, textures: &[&'static str]) -> Self {
        Self {
            kind,
            spawned: Spawned::new(),
            layers: textures.iter().map(|&t| Layer::new(t)).collect(),
            root: None,
            points: Binding::unbound(),
            count: None,
        }
    }

    fn default_count(&self) -> f64 {
        match self.kind {
            PrecipitationKind::Rain => 1500.0,
            PrecipitationKind::Snow => 600.0,
        }
    }

    /// Particles in each layer for a total of `count`.
    fn per_layer(&self, count: usize) -> usize {
        count / self.layers.len().max(1)
    }

    /// Replace the particle systems with `count` particles in total.
    fn rebuild(&mut self, count: usize, state: &ParamState, stage: &mut Stage) {
        if let Some(root) = self.root.take() {
            stage.dispose(root);
        }

        let per_layer = self.per_layer(count);
        let group = match self.kind {
            PrecipitationKind::Snow => Some(stage.scene.spawn(Group::named("snow"))),
            PrecipitationKind::Rain => None,
        };

        let mut systems = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let config = match self.kind {
                PrecipitationKind::Rain => PrecipitationConfig::rain(per_layer),
                PrecipitationKind::Snow => PrecipitationConfig::snow(per_layer),
            }
            .with_seed(i as u64 + 1);

            let mut material = Material::points(3.0);
            if let Some(map) = &layer.map {
                material = material.with_map(map);
            }
            let system = ParticleSystem::spawn(config, material);
            let id = match group {
                Some(group) => stage.scene.spawn_child(group, system),
                None => stage.scene.spawn(system),
            };
            layer.system = Some(id);
            systems.push(id);
        }

        stage
            .frames
            .register_many("precipitation", systems.clone(), Precipitation);
        self.points.rebind_many(systems.iter().copied());
        self.points.apply(state, &mut stage.scene);
        self.root = group.or_else(|| systems.first().copied());
        self.count = Some(count);
        log::debug!(
            "spawned {} particles in {} systems",
            per_layer * systems.len(),
            systems.len()
        );
    }
}

fn set_map(stage: &mut Stage, system: EntityId, path: &str) {
    if let Some(SceneEntity::Points(points)) = stage.scene.get_mut(system) {
        if let MaterialKind::Points { map, .. } = &mut points.material.kind {
            *map = Some(path.to_string());
        }
    }
}

impl Page for WeatherScene {
    fn id(&self) -> &'static str {
        match self.kind {
            PrecipitationKind::Rain => "chapter07/rainy-scene",
            PrecipitationKind::Snow => "chapter07/snowy-scene",
        }
    }

    fn title(&self) -> &'static str {
        match self.kind {
            PrecipitationKind::Rain => "Rainy scene",
            PrecipitationKind::Snow => "Snowy scene",
        }
    }

    fn chapter(&self) -> u32 {
        7
    }

    fn defaults(&self) -> ParamState {
        let size = match self.kind {
            PrecipitationKind::Rain => 3.0,
            PrecipitationKind::Snow => 10.0,
        };
        ParamState::new()
            .with("count", self.default_count())
            .with("size", size)
            .with("transparent", true)
            .with("opacity", 0.6)
            .with("color", Color::WHITE)
            .with("sizeAttenuation", true)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .control("count", ControlSpec::number(100.0, 3000.0, 100.0))
            .control("size", ControlSpec::number(0.0, 30.0, 1.0))
            .control("transparent", ControlSpec::boolean())
            .control("opacity", ControlSpec::number(0.0, 1.0, 0.1))
            .control("color", ControlSpec::color())
            .control("sizeAttenuation", ControlSpec::boolean())
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;
        for layer in &mut self.layers {
            layer.request = Some(stage.assets.request_texture(layer.texture));
            layer.map = None;
        }
        let camera = stage.spawn_camera(
            Camera::perspective(45.0, [20.0, 40.0, 110.0]).looking_at([20.0, 30.0, 0.0]),
        );
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        let count = state.number("count").unwrap_or(self.default_count()).max(0.0) as usize;
        if self.count != Some(count) {
            self.rebuild(count, state, stage);
        } else {
            self.points.apply(state, &mut stage.scene);
        }
    }

    fn on_frame(&mut self, _state: &ParamState, stage: &mut Stage) {
        for i in 0..self.layers.len() {
            let Some(request) = self.layers[i].request else {
                continue;
            };
            match stage.assets.texture(request) {
                AssetState::Pending => continue,
                AssetState::Ready(info) => {
                    let layer = &mut self.layers[i];
                    log::info!(
                        "sprite {} ready ({}x{})",
                        layer.texture,
                        info.width,
                        info.height
                    );
                    layer.map = Some(layer.texture.to_string());
                    if let Some(system) = layer.system {
                        set_map(stage, system, layer.texture);
                    }
                }
                // Untextured points are still drawn.
                AssetState::Failed(e) => {
                    log::warn!("sprite {} unavailable: {}", self.layers[i].texture, e)
                }
            }
            stage.assets.release(request);
            self.layers[i].request = None;
        }
    }

    fn unmount(&mut self, stage: &mut Stage) {
        if let Some(root) = self.root.take() {
            stage.dispose(root);
        }
        for layer in &mut self.layers {
            if let Some(request) = layer.request.take() {
                stage.assets.release(request);
            }
            layer.system = None;
        }
        self.spawned.dispose_all(stage);
        self.points = Binding::unbound();
        self.count = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Assets;
    use crate::page::Demo;
    use crate::param::ParamValue;

    fn systems(demo: &Demo) -> Vec<(EntityId, &ParticleSystem)> {
        demo.scene()
            .scene_entities()
            .filter_map(|(id, e)| match e {
                SceneEntity::Points(p) => Some((id, p)),
                _ => None,
            })
            .collect()
    }

    fn empty_root(name: &str) -> Assets {
        let dir = std::env::temp_dir().join(format!("gallery-ch07-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        Assets::new(dir)
    }

    #[test]
    fn test_rain_defaults() {
        let mut demo = Demo::new(Box::new(WeatherScene::rainy()), empty_root("rain"));
        demo.mount().unwrap();
        let rain = systems(&demo);
        assert_eq!(rain.len(), 1);
        let system = rain[0].1;
        assert_eq!(system.len(), 1500);
        assert!((system.material.opacity - 0.6).abs() < 1e-6);
        assert!(system.material.transparent);
    }

    #[test]
    fn test_count_change_rebinds() {
        let mut demo = Demo::new(Box::new(WeatherScene::rainy()), empty_root("rebind"));
        demo.mount().unwrap();
        let before = systems(&demo)[0].0;

        demo.edit("count", ParamValue::Number(300.0)).unwrap();
        demo.edit("opacity", ParamValue::Number(0.3)).unwrap();
        let after = systems(&demo);
        assert_eq!(after.len(), 1);
        assert_ne!(after[0].0, before);
        assert_eq!(after[0].1.len(), 300);
        assert!((after[0].1.material.opacity - 0.3).abs() < 1e-6);
        assert!(!demo.scene().exists(before));
    }

    #[test]
    fn test_particles_stay_in_bounds() {
        let mut demo = Demo::new(Box::new(WeatherScene::snowy()), empty_root("bounds"));
        demo.mount().unwrap();
        demo.run(400, 1.0 / 60.0);
        for (_, system) in systems(&demo) {
            for p in &system.particles {
                assert!(p.position.x.abs() <= 20.0 + 1e-4);
                assert!(p.position.z.abs() <= 20.0 + 1e-4);
                assert!(p.position.y >= 0.0 - 1.0 && p.position.y <= 60.0);
            }
        }
    }

    #[test]
    fn test_snow_layers_share_a_group() {
        let mut demo = Demo::new(Box::new(WeatherScene::snowy()), empty_root("snow"));
        demo.mount().unwrap();
        let snow = systems(&demo);
        assert_eq!(snow.len(), 4);
        let parent = demo.scene().parent(snow[0].0);
        assert!(parent.is_some());
        for (id, system) in &snow {
            assert_eq!(demo.scene().parent(*id), parent);
            assert_eq!(system.len(), 150);
        }

        demo.unmount();
        assert!(demo.scene().is_empty());
    }

    #[test]
    fn test_sprite_texture_is_attached_when_loaded() {
        let dir = std::env::temp_dir().join(format!("gallery-ch07-sprite-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::new(4, 4).save(dir.join("raindrop-3.png")).unwrap();

        let mut demo = Demo::new(Box::new(WeatherScene::rainy()), Assets::new(&dir));
        demo.mount().unwrap();
        demo.frame(0.016);
        let (_, system) = systems(&demo)[0];
        match &system.material.kind {
            MaterialKind::Points { map, .. } => assert_eq!(map.as_deref(), Some("raindrop-3.png")),
            other => panic!("expected a points material, got {:?}", other),
        }

        // A rebuilt system keeps the sprite.
        demo.edit("count", ParamValue::Number(200.0)).unwrap();
        let (_, system) = systems(&demo)[0];
        assert!(matches!(&system.material.kind, MaterialKind::Points { map: Some(_), .. }));
    }
}
