//! The gallery's demo pages, one module per book chapter.
//!
//! Pages share a few building blocks: the entity ledger every page disposes
//! at unmount, the ground plane most scenes stand on, and the common
//! material folder.

pub mod chapter01;
pub mod chapter02;
pub mod chapter03;
pub mod chapter04;
pub mod chapter07;

use std::f32::consts::FRAC_PI_2;

use crate::binding::Bindable;
use crate::material::Material;
use crate::page::Stage;
use crate::panel::{ControlSpec, Folder};
use crate::param::ParamState;
use crate::scene_graph::{EntityId, Geometry, MeshInstance, SceneEntity, Transform};

/// Material properties exposed by the shared material folder.
pub const MATERIAL_KEYS: &[&str] = &[
    "name",
    "opacity",
    "transparent",
    "visible",
    "side",
    "colorWrite",
    "flatShading",
    "premultipliedAlpha",
    "dithering",
    "shadowSide",
    "vertexColors",
    "fog",
];

/// Every entity a page put on the stage.
#[derive(Debug, Default)]
pub struct Spawned {
    ids: Vec<EntityId>,
}

impl Spawned {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a top-level entity and record it.
    pub fn spawn(&mut self, stage: &mut Stage, entity: impl Into<SceneEntity>) -> EntityId {
        let id = stage.scene.spawn(entity);
        self.ids.push(id);
        id
    }

    /// Record an entity spawned some other way (e.g. the camera).
    pub fn push(&mut self, id: EntityId) {
        self.ids.push(id);
    }

    /// Dispose one recorded entity ahead of unmount.
    pub fn dispose(&mut self, stage: &mut Stage, id: EntityId) {
        self.ids.retain(|&other| other != id);
        stage.dispose(id);
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dispose everything recorded.
    pub fn dispose_all(&mut self, stage: &mut Stage) {
        stage.dispose_all(self.ids.drain(..));
    }
}

/// A horizontal plane that receives shadows.
pub fn ground_plane(width: f32, height: f32, material: Material) -> MeshInstance {
    MeshInstance::new(Geometry::Plane { width, height }, material)
        .named("ground")
        .with_transform(Transform::default().rotated(-FRAC_PI_2, 0.0, 0.0))
        .receiving_shadow()
}

/// The folder of properties every material shares.
pub fn material_folder(title: &str) -> Folder {
    let sides = || ControlSpec::choice([0, 1, 2]);
    Folder::new(title)
        .control("type", ControlSpec::read_only())
        .control("name", ControlSpec::text())
        .control("opacity", ControlSpec::number(0.0, 1.0, 0.01))
        .control("transparent", ControlSpec::boolean())
        .control("visible", ControlSpec::boolean())
        .control("side", sides())
        .control("colorWrite", ControlSpec::boolean())
        .control("flatShading", ControlSpec::boolean())
        .control("premultipliedAlpha", ControlSpec::boolean())
        .control("dithering", ControlSpec::boolean())
        .control("shadowSide", sides())
        .control("vertexColors", ControlSpec::choice([0, 1, 2]))
        .control("fog", ControlSpec::boolean())
}

/// Initial folder values, read from the material itself.
pub fn material_defaults(material: &Material) -> ParamState {
    let mut state = ParamState::new().with("type", material.kind.name());
    for key in MATERIAL_KEYS {
        if let Some(value) = material.property(key) {
            state.set(key, value);
        }
    }
    state
}
