//! Scene graph for the demo pages.
//!
//! Entities are created by pages, attached to the scene to be rendered, and
//! destroyed when the page unmounts. Every entity is addressed by an
//! [`EntityId`] handle; a handle to a destroyed entity simply resolves to
//! nothing.

use std::collections::HashMap;

use glam::Vec3;
use serde::Serialize;

use crate::binding::{self, Bindable};
use crate::camera::Camera;
use crate::color::Color;
use crate::lighting::Light;
use crate::material::Material;
use crate::param::ParamValue;
use crate::particle::ParticleSystem;

/// Unique identifier for scene entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub u64);

/// Transform component for scene entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3, // Euler angles in radians
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vec3::new(x, y, z);
        self
    }

    pub fn scaled(mut self, s: f32) -> Self {
        self.scale = Vec3::splat(s);
        self
    }
}

/// Geometry descriptors. Tessellation is the renderer's job; custom geometry
/// carries its own vertices (e.g. a loaded model).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Box { width: f32, height: f32, depth: f32 },
    Sphere { radius: f32, segments: u32 },
    Plane { width: f32, height: f32 },
    Cone { radius: f32, height: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32 },
    Custom(CustomGeometry),
}

/// Indexed triangle geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomGeometry {
    #[serde(skip)]
    pub positions: Vec<Vec3>,
    #[serde(skip)]
    pub normals: Vec<Vec3>,
    #[serde(skip)]
    pub indices: Vec<u32>,
    pub vertex_count: usize,
}

impl CustomGeometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let vertex_count = positions.len();
        Self {
            positions,
            normals: Vec::new(),
            indices,
            vertex_count,
        }
    }

    /// Recompute smooth vertex normals by accumulating area-weighted face
    /// normals. Triangles referencing out-of-range vertices are skipped.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let (pa, pb, pc) = (self.positions[a], self.positions[b], self.positions[c]);
            let face = (pb - pa).cross(pc - pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals.into_iter().map(|n| n.normalize_or_zero()).collect();
    }
}

/// A mesh instance - geometry plus its own material and transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshInstance {
    pub name: String,
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshInstance {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            name: String::new(),
            geometry,
            material,
            transform: Transform::default(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn casting_shadow(mut self) -> Self {
        self.cast_shadow = true;
        self
    }

    pub fn receiving_shadow(mut self) -> Self {
        self.receive_shadow = true;
        self
    }
}

impl Bindable for MeshInstance {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        if binding::set_transform_property(&mut self.transform, key, value) {
            return true;
        }
        match key {
            "visible" => binding::flag(value).map(|v| self.visible = v).is_some(),
            "castShadow" => binding::flag(value).map(|v| self.cast_shadow = v).is_some(),
            "receiveShadow" => binding::flag(value).map(|v| self.receive_shadow = v).is_some(),
            _ => self.material.set_property(key, value),
        }
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        if let Some(v) = binding::transform_property(&self.transform, key) {
            return Some(v);
        }
        match key {
            "visible" => Some(self.visible.into()),
            "castShadow" => Some(self.cast_shadow.into()),
            "receiveShadow" => Some(self.receive_shadow.into()),
            _ => self.material.property(key),
        }
    }
}

/// A polyline with optional per-vertex colors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStrip {
    #[serde(skip)]
    pub points: Vec<Vec3>,
    #[serde(skip)]
    pub colors: Vec<Color>,
    pub material: Material,
    pub transform: Transform,
    pub visible: bool,
}

impl LineStrip {
    pub fn new(material: Material) -> Self {
        Self {
            points: Vec::new(),
            colors: Vec::new(),
            material,
            transform: Transform::default(),
            visible: true,
        }
    }

    /// Replace the vertices in place, keeping the entity identity.
    pub fn set_points(&mut self, points: Vec<Vec3>, colors: Vec<Color>) {
        self.points = points;
        self.colors = colors;
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl Bindable for LineStrip {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        if binding::set_transform_property(&mut self.transform, key, value) {
            return true;
        }
        match key {
            "visible" => binding::flag(value).map(|v| self.visible = v).is_some(),
            _ => self.material.set_property(key, value),
        }
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        if let Some(v) = binding::transform_property(&self.transform, key) {
            return Some(v);
        }
        match key {
            "visible" => Some(self.visible.into()),
            _ => self.material.property(key),
        }
    }
}

/// A transform-only node grouping children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
}

impl Group {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            transform: Transform::default(),
            visible: true,
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new()
        }
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl Bindable for Group {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        if binding::set_transform_property(&mut self.transform, key, value) {
            return true;
        }
        match key {
            "visible" => binding::flag(value).map(|v| self.visible = v).is_some(),
            _ => false,
        }
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        match key {
            "visible" => Some(self.visible.into()),
            _ => binding::transform_property(&self.transform, key),
        }
    }
}

/// A scene entity. The variant set is closed; code that needs a specific kind
/// matches on it instead of probing runtime types.
#[derive(Debug, Clone)]
pub enum SceneEntity {
    Mesh(MeshInstance),
    Line(LineStrip),
    Points(ParticleSystem),
    Light(Light),
    Camera(Camera),
    Group(Group),
}

impl SceneEntity {
    /// Get a reference to the entity's transform.
    pub fn transform(&self) -> &Transform {
        match self {
            SceneEntity::Mesh(m) => &m.transform,
            SceneEntity::Line(l) => &l.transform,
            SceneEntity::Points(p) => &p.transform,
            SceneEntity::Light(l) => &l.transform,
            SceneEntity::Camera(c) => &c.transform,
            SceneEntity::Group(g) => &g.transform,
        }
    }

    /// Get a mutable reference to the entity's transform.
    pub fn transform_mut(&mut self) -> &mut Transform {
        match self {
            SceneEntity::Mesh(m) => &mut m.transform,
            SceneEntity::Line(l) => &mut l.transform,
            SceneEntity::Points(p) => &mut p.transform,
            SceneEntity::Light(l) => &mut l.transform,
            SceneEntity::Camera(c) => &mut c.transform,
            SceneEntity::Group(g) => &mut g.transform,
        }
    }

    /// Check if the entity is visible. Cameras are never drawn.
    pub fn visible(&self) -> bool {
        match self {
            SceneEntity::Mesh(m) => m.visible,
            SceneEntity::Line(l) => l.visible,
            SceneEntity::Points(p) => p.visible,
            SceneEntity::Light(l) => l.visible,
            SceneEntity::Camera(_) => false,
            SceneEntity::Group(g) => g.visible,
        }
    }

    /// Set the entity's visibility.
    pub fn set_visible(&mut self, visible: bool) {
        match self {
            SceneEntity::Mesh(m) => m.visible = visible,
            SceneEntity::Line(l) => l.visible = visible,
            SceneEntity::Points(p) => p.visible = visible,
            SceneEntity::Light(l) => l.visible = visible,
            SceneEntity::Camera(_) => {}
            SceneEntity::Group(g) => g.visible = visible,
        }
    }

    pub fn material(&self) -> Option<&Material> {
        match self {
            SceneEntity::Mesh(m) => Some(&m.material),
            SceneEntity::Line(l) => Some(&l.material),
            SceneEntity::Points(p) => Some(&p.material),
            _ => None,
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        match self {
            SceneEntity::Mesh(m) => Some(&mut m.material),
            SceneEntity::Line(l) => Some(&mut l.material),
            SceneEntity::Points(p) => Some(&mut p.material),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SceneEntity::Mesh(_) => "mesh",
            SceneEntity::Line(_) => "line",
            SceneEntity::Points(_) => "points",
            SceneEntity::Light(l) => l.kind_name(),
            SceneEntity::Camera(_) => "camera",
            SceneEntity::Group(_) => "group",
        }
    }

    fn name(&self) -> &str {
        match self {
            SceneEntity::Mesh(m) => &m.name,
            SceneEntity::Group(g) => &g.name,
            _ => "",
        }
    }
}

impl Bindable for SceneEntity {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        match self {
            SceneEntity::Mesh(m) => m.set_property(key, value),
            SceneEntity::Line(l) => l.set_property(key, value),
            SceneEntity::Points(p) => p.set_property(key, value),
            SceneEntity::Light(l) => l.set_property(key, value),
            SceneEntity::Camera(c) => c.set_property(key, value),
            SceneEntity::Group(g) => g.set_property(key, value),
        }
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        match self {
            SceneEntity::Mesh(m) => m.property(key),
            SceneEntity::Line(l) => l.property(key),
            SceneEntity::Points(p) => p.property(key),
            SceneEntity::Light(l) => l.property(key),
            SceneEntity::Camera(c) => c.property(key),
            SceneEntity::Group(g) => g.property(key),
        }
    }
}

impl From<MeshInstance> for SceneEntity {
    fn from(m: MeshInstance) -> Self {
        SceneEntity::Mesh(m)
    }
}

impl From<LineStrip> for SceneEntity {
    fn from(l: LineStrip) -> Self {
        SceneEntity::Line(l)
    }
}

impl From<ParticleSystem> for SceneEntity {
    fn from(p: ParticleSystem) -> Self {
        SceneEntity::Points(p)
    }
}

impl From<Light> for SceneEntity {
    fn from(l: Light) -> Self {
        SceneEntity::Light(l)
    }
}

impl From<Camera> for SceneEntity {
    fn from(c: Camera) -> Self {
        SceneEntity::Camera(c)
    }
}

impl From<Group> for SceneEntity {
    fn from(g: Group) -> Self {
        SceneEntity::Group(g)
    }
}

// ============================================================================
// Tree view
// ============================================================================

/// A view of a subtree: meshes and other objects are leaves, groups branch.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneNode {
    Leaf(EntityId),
    Branch(EntityId, Vec<SceneNode>),
}

impl SceneNode {
    pub fn id(&self) -> EntityId {
        match self {
            SceneNode::Leaf(id) | SceneNode::Branch(id, _) => *id,
        }
    }
}

/// Call `f` on every mesh in the subtree, depth first.
/// Returns the number of meshes visited.
pub fn visit_meshes(
    scene: &mut SceneGraph,
    node: &SceneNode,
    f: &mut dyn FnMut(EntityId, &mut MeshInstance),
) -> usize {
    match node {
        SceneNode::Leaf(id) => match scene.get_mut(*id) {
            Some(SceneEntity::Mesh(mesh)) => {
                f(*id, mesh);
                1
            }
            _ => 0,
        },
        SceneNode::Branch(_, children) => {
            let mut visited = 0;
            for child in children {
                visited += visit_meshes(scene, child, f);
            }
            visited
        }
    }
}

// ============================================================================
// Scene graph
// ============================================================================

/// Serializable summary of one entity, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub parent: Option<EntityId>,
    pub visible: bool,
    pub transform: Transform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// The scene graph - owns every entity created by the mounted page.
#[derive(Debug)]
pub struct SceneGraph {
    entities: HashMap<EntityId, SceneEntity>,
    /// Entities that have been added to the scene (will be rendered).
    scene_entities: Vec<EntityId>,
    /// Child -> parent links. Parents are always groups.
    parents: HashMap<EntityId, EntityId>,
    /// Next entity ID to assign.
    next_id: u64,
    pub background: Color,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            scene_entities: Vec::new(),
            parents: HashMap::new(),
            next_id: 1,
            background: Color::BLACK,
        }
    }

    /// Generate a new unique entity ID. IDs are never reused.
    fn new_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an entity and return its ID.
    /// The entity is NOT added to the scene automatically.
    pub fn create(&mut self, entity: impl Into<SceneEntity>) -> EntityId {
        let id = self.new_id();
        self.entities.insert(id, entity.into());
        id
    }

    /// Create an entity and add it to the scene.
    pub fn spawn(&mut self, entity: impl Into<SceneEntity>) -> EntityId {
        let id = self.create(entity);
        self.add_to_scene(id);
        id
    }

    /// Create an entity as a child of `parent` and add it to the scene.
    pub fn spawn_child(&mut self, parent: EntityId, entity: impl Into<SceneEntity>) -> EntityId {
        let id = self.spawn(entity);
        self.set_parent(id, parent);
        id
    }

    /// Add an entity to the scene (make it renderable).
    /// Returns true if the entity was added, false if already in scene or doesn't exist.
    pub fn add_to_scene(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        if self.scene_entities.contains(&id) {
            return false;
        }
        self.scene_entities.push(id);
        true
    }

    /// Remove an entity from the scene (stop rendering it).
    /// The entity still exists and can be re-added.
    pub fn remove_from_scene(&mut self, id: EntityId) -> bool {
        if let Some(pos) = self.scene_entities.iter().position(|&e| e == id) {
            self.scene_entities.remove(pos);
            true
        } else {
            false
        }
    }

    /// Destroy an entity and its whole subtree.
    /// Returns false if the entity did not exist.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            return false;
        }
        for child in self.children(id) {
            self.destroy(child);
        }
        self.remove_from_scene(id);
        self.parents.remove(&id);
        self.entities.remove(&id).is_some()
    }

    /// Attach `child` under the group `parent`.
    /// Fails if either is missing, the parent is not a group, or the link
    /// would create a cycle.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> bool {
        if child == parent || !self.exists(child) {
            return false;
        }
        if !matches!(self.entities.get(&parent), Some(SceneEntity::Group(_))) {
            return false;
        }
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return false;
            }
            cursor = self.parents.get(&id).copied();
        }
        self.parents.insert(child, parent);
        true
    }

    pub fn clear_parent(&mut self, child: EntityId) {
        self.parents.remove(&child);
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    /// Direct children in creation order.
    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        let mut children: Vec<EntityId> = self
            .parents
            .iter()
            .filter(|(_, &p)| p == id)
            .map(|(&c, _)| c)
            .collect();
        children.sort();
        children
    }

    /// Build the tree view rooted at `id`.
    pub fn tree(&self, id: EntityId) -> Option<SceneNode> {
        match self.entities.get(&id)? {
            SceneEntity::Group(_) => Some(SceneNode::Branch(
                id,
                self.children(id)
                    .into_iter()
                    .filter_map(|c| self.tree(c))
                    .collect(),
            )),
            _ => Some(SceneNode::Leaf(id)),
        }
    }

    /// Get a reference to an entity by ID.
    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SceneEntity> {
        self.entities.get_mut(&id)
    }

    pub fn material(&self, id: EntityId) -> Option<&Material> {
        self.entities.get(&id)?.material()
    }

    pub fn material_mut(&mut self, id: EntityId) -> Option<&mut Material> {
        self.entities.get_mut(&id)?.material_mut()
    }

    /// Get all entities currently in the scene (for rendering).
    pub fn scene_entities(&self) -> impl Iterator<Item = (EntityId, &SceneEntity)> {
        self.scene_entities
            .iter()
            .filter_map(|&id| self.entities.get(&id).map(|e| (id, e)))
    }

    /// Get all mesh instances in the scene.
    pub fn meshes(&self) -> impl Iterator<Item = (EntityId, &MeshInstance)> {
        self.scene_entities().filter_map(|(id, entity)| {
            if let SceneEntity::Mesh(mesh) = entity {
                Some((id, mesh))
            } else {
                None
            }
        })
    }

    /// Clear all entities and the scene.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.scene_entities.clear();
        self.parents.clear();
    }

    /// Check if an entity exists.
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Check if an entity is in the scene.
    pub fn is_in_scene(&self, id: EntityId) -> bool {
        self.scene_entities.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Summaries of every entity in the scene, in insertion order.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.scene_entities()
            .map(|(id, entity)| {
                let material = entity.material();
                let (color, opacity) = match entity {
                    SceneEntity::Light(l) => (Some(l.color), Some(l.intensity)),
                    _ => (
                        material.and_then(|m| m.property("color")).and_then(|c| c.as_color()),
                        material.map(|m| m.opacity),
                    ),
                };
                let count = match entity {
                    SceneEntity::Points(p) => Some(p.particles.len()),
                    SceneEntity::Line(l) => Some(l.point_count()),
                    _ => None,
                };
                EntitySnapshot {
                    id,
                    kind: entity.kind_name(),
                    name: entity.name().to_string(),
                    parent: self.parent(id),
                    visible: entity.visible(),
                    transform: *entity.transform(),
                    color,
                    opacity,
                    count,
                }
            })
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
