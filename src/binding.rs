//! Live parameter binding between panel state and scene objects.
//!
//! Every scene object exposes a set of named, independently settable
//! properties through [`Bindable`]. [`apply_to_target`] walks a parameter state
//! and writes each value whose key names one of those properties, applying
//! the small set of known coercions (numeric enums, hex colors, bool/number
//! interchange). Keys the target does not know are skipped: the same state
//! also drives page-level controls such as `cubeCount`.

use glam::Vec3;

use crate::color::Color;
use crate::param::{ParamState, ParamValue};
use crate::scene_graph::{EntityId, SceneGraph, Transform};

/// A scene object with named settable properties.
pub trait Bindable {
    /// Write one property. Returns false when the key is unknown or the
    /// value cannot be coerced, leaving the object unchanged.
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool;

    /// Read one property back in panel form.
    fn property(&self, key: &str) -> Option<ParamValue>;
}

/// Write every known key of `state` into `target`.
/// Returns the number of properties written.
pub fn apply_to_target(state: &ParamState, target: &mut dyn Bindable) -> usize {
    state
        .values()
        .into_iter()
        .filter(|(path, value)| target.set_property(path, value))
        .count()
}

/// Write `state` into each target in turn.
pub fn apply_to_targets<'a, I>(state: &ParamState, targets: I) -> usize
where
    I: IntoIterator<Item = &'a mut dyn Bindable>,
{
    targets
        .into_iter()
        .map(|target| apply_to_target(state, target))
        .sum()
}

/// Pull current property values from `target` into every matching key of
/// `state`. Keys the target does not expose are left untouched.
pub fn read_back(state: &mut ParamState, target: &dyn Bindable) -> usize {
    let mut updated = 0;
    for path in state.paths() {
        if let Some(value) = target.property(&path) {
            if state.set(&path, value) {
                updated += 1;
            }
        }
    }
    updated
}

// ============================================================================
// Handle-based binding
// ============================================================================

/// Which part of an entity a binding writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindScope {
    /// The entity's own properties (falling through to its material).
    #[default]
    Object,
    /// Only the entity's material.
    Material,
}

/// A binding from parameter state to scene entities referenced by id.
///
/// The targets are resolved through the scene graph on every apply, so a
/// disposed entity is skipped instead of being written through a stale
/// reference.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    targets: Vec<EntityId>,
    scope: BindScope,
}

impl Binding {
    pub fn new(target: EntityId) -> Self {
        Self {
            targets: vec![target],
            scope: BindScope::Object,
        }
    }

    pub fn many(targets: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            scope: BindScope::Object,
        }
    }

    /// A binding with no target yet (e.g. a model still loading).
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: BindScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn targets(&self) -> &[EntityId] {
        &self.targets
    }

    pub fn is_bound(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Re-establish the binding against a new target identity.
    pub fn rebind(&mut self, target: EntityId) {
        self.targets = vec![target];
    }

    pub fn rebind_many(&mut self, targets: impl IntoIterator<Item = EntityId>) {
        self.targets = targets.into_iter().collect();
    }

    /// Apply `state` to every live target. Missing targets are a silent no-op.
    pub fn apply(&self, state: &ParamState, scene: &mut SceneGraph) -> usize {
        let mut written = 0;
        for &id in &self.targets {
            written += match self.scope {
                BindScope::Object => scene
                    .get_mut(id)
                    .map(|entity| apply_to_target(state, entity))
                    .unwrap_or(0),
                BindScope::Material => scene
                    .material_mut(id)
                    .map(|material| apply_to_target(state, material))
                    .unwrap_or(0),
            };
        }
        written
    }

    /// Read the first live target's properties back into `state`.
    pub fn read_back(&self, state: &mut ParamState, scene: &SceneGraph) -> usize {
        for &id in &self.targets {
            let target: Option<&dyn Bindable> = match self.scope {
                BindScope::Object => scene.get(id).map(|e| e as &dyn Bindable),
                BindScope::Material => scene.material(id).map(|m| m as &dyn Bindable),
            };
            if let Some(target) = target {
                return read_back(state, target);
            }
        }
        0
    }
}

// ============================================================================
// Coercions
// ============================================================================

/// Numeric coercion. Booleans read as 0/1.
pub fn number(value: &ParamValue) -> Option<f32> {
    value.as_f64().map(|v| v as f32)
}

/// Boolean coercion. Numbers are true when non-zero.
pub fn flag(value: &ParamValue) -> Option<bool> {
    value.as_bool()
}

/// Color coercion from a hex string, packed number or color value.
pub fn color(value: &ParamValue) -> Option<Color> {
    value.as_color()
}

/// Integer index for enum-like properties. Select widgets hand over their
/// option as a string, so `"2"` is accepted as well as `2`.
pub fn index(value: &ParamValue) -> Option<i64> {
    let v = value.as_f64()?;
    if v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

/// Write one component (`x`, `y` or `z`) of a vector.
pub fn set_component(v: &mut Vec3, component: &str, value: &ParamValue) -> bool {
    let Some(n) = number(value) else {
        return false;
    };
    match component {
        "x" => v.x = n,
        "y" => v.y = n,
        "z" => v.z = n,
        _ => return false,
    }
    true
}

pub fn component(v: Vec3, component: &str) -> Option<ParamValue> {
    match component {
        "x" => Some(v.x.into()),
        "y" => Some(v.y.into()),
        "z" => Some(v.z.into()),
        _ => None,
    }
}

/// Transform keys shared by every spatial object:
/// `position.*`, `rotation.*`, `scale.*` and a uniform `scale`.
pub fn set_transform_property(t: &mut Transform, key: &str, value: &ParamValue) -> bool {
    match key.split_once('.') {
        Some(("position", c)) => set_component(&mut t.position, c, value),
        Some(("rotation", c)) => set_component(&mut t.rotation, c, value),
        Some(("scale", c)) => set_component(&mut t.scale, c, value),
        None if key == "scale" => match number(value) {
            Some(s) => {
                t.scale = Vec3::splat(s);
                true
            }
            None => false,
        },
        _ => false,
    }
}

pub fn transform_property(t: &Transform, key: &str) -> Option<ParamValue> {
    match key.split_once('.')? {
        ("position", c) => component(t.position, c),
        ("rotation", c) => component(t.rotation, c),
        ("scale", c) => component(t.scale, c),
        _ => None,
    }
}
