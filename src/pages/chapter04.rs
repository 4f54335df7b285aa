//! Chapter 4: materials.

use anyhow::Result;
use glam::Vec3;

use super::{ground_plane, material_defaults, material_folder, Spawned};
use crate::animation::{Spin, UniformClock};
use crate::asset::{AssetHandle, AssetState, ModelData};
use crate::binding::{BindScope, Bindable, Binding};
use crate::camera::Camera;
use crate::color::Color;
use crate::curve::{curve_colors, gosper, MAX_ORDER};
use crate::lighting::Light;
use crate::material::{Material, VertexColors};
use crate::page::{Page, Stage};
use crate::panel::{ControlSpec, Folder, Panel};
use crate::param::ParamState;
use crate::scene_graph::{
    visit_meshes, EntityId, Geometry, Group, LineStrip, MeshInstance, SceneEntity, SceneGraph,
    Transform,
};

const GOPHER_PATH: &str = "obj/gopher.obj";
const MESH_CHOICES: [&str; 4] = ["gopher", "cube", "sphere", "plane"];

fn ambient_and_spot(spawned: &mut Spawned, stage: &mut Stage, spot_z: f32) {
    spawned.spawn(stage, Light::ambient(0x0c0c0c));
    spawned.spawn(
        stage,
        Light::spot(0xffffff).at(-40.0, 60.0, spot_z).with_shadow(),
    );
}

// ============================================================================
// Normal material
// ============================================================================

/// Which mesh the normal material page currently shows.
#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Primitive(String),
    /// The gopher was selected but its model is not usable (yet).
    Fallback,
    Model,
}

/// A normal material on a selectable mesh, including a loaded OBJ model.
pub struct MeshNormalMaterial {
    spawned: Spawned,
    material: Binding,
    shown: Option<(EntityId, Shown)>,
    gopher: Option<AssetHandle>,
    warned: bool,
}

impl MeshNormalMaterial {
    pub fn new() -> Self {
        Self {
            spawned: Spawned::new(),
            material: Binding::unbound().with_scope(BindScope::Material),
            shown: None,
            gopher: None,
            warned: false,
        }
    }

    fn primitive(kind: &str) -> MeshInstance {
        let geometry = match kind {
            "cube" => Geometry::Box {
                width: 15.0,
                height: 15.0,
                depth: 15.0,
            },
            "plane" => Geometry::Plane {
                width: 14.0,
                height: 14.0,
            },
            _ => Geometry::Sphere {
                radius: 14.0,
                segments: 20,
            },
        };
        MeshInstance::new(geometry, Material::normal())
            .named(kind)
            .with_transform(Transform::at(0.0, 3.0, 2.0))
    }

    /// Model state of the gopher request, warning once when it failed.
    fn gopher_state(&mut self, stage: &Stage) -> AssetState<()> {
        let Some(handle) = self.gopher else {
            return AssetState::Failed("model was not requested".to_string());
        };
        match stage.assets.model(handle) {
            AssetState::Ready(_) => AssetState::Ready(()),
            AssetState::Pending => AssetState::Pending,
            AssetState::Failed(e) => {
                if !self.warned {
                    log::warn!("gopher model unavailable, keeping the sphere: {}", e);
                    self.warned = true;
                }
                AssetState::Failed(e)
            }
        }
    }

    /// Replace the shown mesh with `selected`, carrying its rotation over.
    fn show(&mut self, selected: &str, state: &ParamState, stage: &mut Stage) {
        let mut rotation = 0.0;
        if let Some((old, _)) = self.shown.take() {
            if let Some(entity) = stage.scene.get(old) {
                rotation = entity.transform().rotation.y;
            }
            stage.dispose(old);
        }

        let model_ready = selected == "gopher"
            && matches!(self.gopher_state(stage), AssetState::Ready(()));
        let (id, shown) = match (selected, model_ready, self.gopher) {
            ("gopher", true, Some(handle)) => match stage.assets.model(handle) {
                AssetState::Ready(model) => (spawn_model(&mut stage.scene, model), Shown::Model),
                _ => (stage.scene.spawn(Self::primitive("sphere")), Shown::Fallback),
            },
            ("gopher", _, _) => (stage.scene.spawn(Self::primitive("sphere")), Shown::Fallback),
            (kind, _, _) => (
                stage.scene.spawn(Self::primitive(kind)),
                Shown::Primitive(kind.to_string()),
            ),
        };

        if let Some(entity) = stage.scene.get_mut(id) {
            entity.transform_mut().rotation.y = rotation;
        }
        stage.frames.register("selected mesh", id, Spin::new(Vec3::Y, 0.01));

        self.material.rebind_many(mesh_ids(&mut stage.scene, id));
        self.material.apply(state, &mut stage.scene);
        log::debug!("normal material page shows {:?}", shown);
        self.shown = Some((id, shown));
    }

    fn needs_swap(&self, selected: &str) -> bool {
        match &self.shown {
            None => true,
            Some((_, Shown::Primitive(kind))) => kind != selected,
            Some((_, Shown::Fallback | Shown::Model)) => selected != "gopher",
        }
    }
}

impl Default for MeshNormalMaterial {
    fn default() -> Self {
        Self::new()
    }
}

/// Instantiate a model as a group of meshes, with the normal material and
/// recomputed normals applied over the whole subtree.
fn spawn_model(scene: &mut SceneGraph, model: &ModelData) -> EntityId {
    let mut group = Group::named(&model.name);
    group.transform = Transform::at(-10.0, 0.0, 0.0).scaled(5.0);
    let root = scene.spawn(group);
    for part in &model.parts {
        scene.spawn_child(
            root,
            MeshInstance::new(Geometry::Custom(part.geometry.clone()), Material::basic(0xffffff))
                .named(&part.name),
        );
    }

    if let Some(tree) = scene.tree(root) {
        let material = Material::normal();
        visit_meshes(scene, &tree, &mut |_, mesh: &mut MeshInstance| {
            mesh.material = material.clone();
            if let Geometry::Custom(geometry) = &mut mesh.geometry {
                geometry.compute_vertex_normals();
            }
        });
    }
    root
}

/// Every mesh in the subtree rooted at `id`.
fn mesh_ids(scene: &mut SceneGraph, id: EntityId) -> Vec<EntityId> {
    let mut ids = Vec::new();
    if let Some(tree) = scene.tree(id) {
        visit_meshes(scene, &tree, &mut |mesh_id, _: &mut MeshInstance| {
            ids.push(mesh_id)
        });
    }
    ids
}

fn selected_mesh(state: &ParamState) -> &str {
    state
        .get("selectedMesh")
        .and_then(|v| v.as_str())
        .unwrap_or("sphere")
}

impl Page for MeshNormalMaterial {
    fn id(&self) -> &'static str {
        "chapter04/mesh-normal-material"
    }

    fn title(&self) -> &'static str {
        "Mesh normal material"
    }

    fn chapter(&self) -> u32 {
        4
    }

    fn defaults(&self) -> ParamState {
        let mut state = material_defaults(&Material::normal());
        state.set("selectedMesh", "sphere");
        state
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .folder(material_folder("Material"))
            .control("selectedMesh", ControlSpec::choice(MESH_CHOICES))
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;
        self.warned = false;
        self.gopher = Some(stage.assets.request_obj(GOPHER_PATH));

        let mut ground = ground_plane(100.0, 100.0, Material::basic(0x777777));
        ground.transform.position.y = -20.0;
        ground.receive_shadow = false;
        self.spawned.spawn(stage, ground);
        ambient_and_spot(&mut self.spawned, stage, -10.0);

        let camera = stage.spawn_camera(
            Camera::perspective(45.0, [-20.0, 30.0, 40.0]).looking_at([10.0, 0.0, 0.0]),
        );
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        let selected = selected_mesh(state);
        if self.needs_swap(selected) {
            self.show(selected, state, stage);
        } else {
            self.material.apply(state, &mut stage.scene);
        }
    }

    fn on_frame(&mut self, state: &ParamState, stage: &mut Stage) {
        if !matches!(self.shown, Some((_, Shown::Fallback))) {
            return;
        }
        if let AssetState::Ready(()) = self.gopher_state(stage) {
            log::info!("gopher model ready, replacing the fallback");
            self.show("gopher", state, stage);
        }
    }

    fn unmount(&mut self, stage: &mut Stage) {
        if let Some((id, _)) = self.shown.take() {
            stage.dispose(id);
        }
        if let Some(handle) = self.gopher.take() {
            stage.assets.release(handle);
        }
        self.spawned.dispose_all(stage);
        self.material = Binding::unbound().with_scope(BindScope::Material);
    }
}

// ============================================================================
// Shader material
// ============================================================================

/// A spinning box drawn with a custom shader whose uniforms are editable.
#[derive(Default)]
pub struct ShaderMaterial {
    spawned: Spawned,
    material: Binding,
}

impl ShaderMaterial {
    pub fn new() -> Self {
        Self::default()
    }

    fn material() -> Material {
        let mut material = Material::shader(&[("time", 0.2), ("scale", 0.2), ("alpha", 0.6)]);
        material.transparent = true;
        material
    }
}

impl Page for ShaderMaterial {
    fn id(&self) -> &'static str {
        "chapter04/shader-material"
    }

    fn title(&self) -> &'static str {
        "Mesh shader material"
    }

    fn chapter(&self) -> u32 {
        4
    }

    fn defaults(&self) -> ParamState {
        let material = Self::material();
        let mut state = material_defaults(&material);
        for key in ["wireframe", "wireframeLinewidth", "alpha", "scale"] {
            if let Some(value) = material.property(key) {
                state.set(key, value);
            }
        }
        state
    }

    fn panel(&self) -> Panel {
        Panel::new().folder(material_folder("Material")).folder(
            Folder::new("Shader")
                .control("wireframe", ControlSpec::boolean())
                .control("wireframeLinewidth", ControlSpec::number(0.0, 5.0, 0.01))
                .control("alpha", ControlSpec::number(0.0, 1.0, 0.01))
                .control("scale", ControlSpec::number(0.0, 1.0, 0.01)),
        )
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;
        let cube = self.spawned.spawn(
            stage,
            MeshInstance::new(
                Geometry::Box {
                    width: 15.0,
                    height: 15.0,
                    depth: 15.0,
                },
                Self::material(),
            )
            .named("shader-box")
            .with_transform(Transform::at(0.0, 3.0, 2.0)),
        );
        stage.frames.register("spin", cube, Spin::new(Vec3::Y, 0.01));
        stage.frames.register("time", cube, UniformClock::new("time", 0.01));
        self.material = Binding::new(cube).with_scope(BindScope::Material);

        ambient_and_spot(&mut self.spawned, stage, -19.0);
        let camera = stage.spawn_camera(Camera::perspective(45.0, [-30.0, 40.0, 30.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        self.material.apply(state, &mut stage.scene);
    }

    fn unmount(&mut self, stage: &mut Stage) {
        self.spawned.dispose_all(stage);
        self.material = Binding::unbound();
    }
}

// ============================================================================
// Line material
// ============================================================================

/// A colored Gosper curve drawn as a line strip.
#[derive(Default)]
pub struct LineMaterial {
    spawned: Spawned,
    line: Option<EntityId>,
    /// `(order, size)` the line currently holds.
    built: Option<(u32, f32)>,
}

impl LineMaterial {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Curve vertices lie in the xz plane; the curve's own depth becomes y.
fn curve_line(order: u32, size: f32) -> (Vec<Vec3>, Vec<Color>) {
    let points = gosper(order, size);
    let colors = curve_colors(&points);
    let vertices = points.iter().map(|p| Vec3::new(p.x, p.z, p.y)).collect();
    (vertices, colors)
}

impl Page for LineMaterial {
    fn id(&self) -> &'static str {
        "chapter04/line-material"
    }

    fn title(&self) -> &'static str {
        "Line material"
    }

    fn chapter(&self) -> u32 {
        4
    }

    fn defaults(&self) -> ParamState {
        ParamState::new().with("order", 4.0).with("size", 60.0)
    }

    fn panel(&self) -> Panel {
        Panel::new()
            .control("order", ControlSpec::number(1.0, MAX_ORDER as f64, 1.0))
            .control("size", ControlSpec::number(1.0, 100.0, 1.0))
    }

    fn mount(&mut self, stage: &mut Stage) -> Result<()> {
        stage.scene.background = Color::BLACK;

        let mut material = Material::line_basic(0xffffff);
        material.vertex_colors = VertexColors::Vertex;
        let mut line = LineStrip::new(material);
        line.transform = Transform::at(25.0, -30.0, -60.0);
        let line = self.spawned.spawn(stage, line);
        stage.frames.register("spin", line, Spin::new(Vec3::Z, 0.01));
        self.line = Some(line);

        ambient_and_spot(&mut self.spawned, stage, -10.0);
        let camera = stage.spawn_camera(Camera::perspective(45.0, [-30.0, 40.0, 30.0]));
        self.spawned.push(camera);
        Ok(())
    }

    fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
        let order = state.number("order").unwrap_or(4.0).clamp(1.0, MAX_ORDER as f64) as u32;
        let size = state.number("size").unwrap_or(60.0) as f32;
        if self.built == Some((order, size)) {
            return;
        }
        let Some(SceneEntity::Line(line)) = self.line.and_then(|id| stage.scene.get_mut(id)) else {
            return;
        };
        let (points, colors) = curve_line(order, size);
        log::debug!("gosper curve order {} size {}: {} points", order, size, points.len());
        line.set_points(points, colors);
        self.built = Some((order, size));
    }

    fn unmount(&mut self, stage: &mut Stage) {
        self.spawned.dispose_all(stage);
        self.line = None;
        self.built = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Assets;
    use crate::material::{MaterialKind, Side};
    use crate::page::Demo;
    use crate::param::ParamValue;

    const TETRA: &str = "o gopher\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 1\n\
                         f 1 3 2\nf 1 2 4\nf 1 4 3\nf 2 3 4\n";

    fn asset_root(name: &str, with_model: bool) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gallery-ch04-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(dir.join("obj")).unwrap();
        if with_model {
            std::fs::write(dir.join(GOPHER_PATH), TETRA).unwrap();
        }
        dir
    }

    fn shown_meshes(demo: &Demo) -> Vec<&MeshInstance> {
        demo.scene()
            .meshes()
            .map(|(_, m)| m)
            .filter(|m| m.name != "ground")
            .collect()
    }

    #[test]
    fn test_selected_mesh_swaps_primitives() {
        let mut demo = Demo::new(
            Box::new(MeshNormalMaterial::new()),
            Assets::new(asset_root("swap", false)),
        );
        demo.mount().unwrap();
        assert_eq!(shown_meshes(&demo)[0].name, "sphere");

        demo.run(10, 0.016);
        demo.edit("selectedMesh", ParamValue::Text("cube".into())).unwrap();
        let shown = shown_meshes(&demo);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].name, "cube");
        assert!((shown[0].transform.rotation.y - 0.1).abs() < 1e-4);
        assert!(matches!(shown[0].material.kind, MaterialKind::Normal));
    }

    #[test]
    fn test_material_folder_edits_shown_mesh() {
        let mut demo = Demo::new(
            Box::new(MeshNormalMaterial::new()),
            Assets::new(asset_root("folder", false)),
        );
        demo.mount().unwrap();
        demo.edit("side", ParamValue::Text("2".into())).unwrap();
        demo.edit("opacity", ParamValue::Number(0.5)).unwrap();
        demo.edit("selectedMesh", ParamValue::Text("plane".into())).unwrap();

        let shown = shown_meshes(&demo);
        assert_eq!(shown[0].material.side, Side::Double);
        assert_eq!(shown[0].material.opacity, 0.5);
    }

    #[test]
    fn test_gopher_loads_after_fallback() {
        let mut demo = Demo::new(
            Box::new(MeshNormalMaterial::new()),
            Assets::new(asset_root("gopher", true)),
        );
        demo.mount().unwrap();
        demo.edit("selectedMesh", ParamValue::Text("gopher".into())).unwrap();
        assert_eq!(shown_meshes(&demo)[0].name, "sphere");

        demo.frame(0.016);
        let shown = shown_meshes(&demo);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].name, "gopher");
        assert!(matches!(shown[0].material.kind, MaterialKind::Normal));
        match &shown[0].geometry {
            Geometry::Custom(g) => assert_eq!(g.normals.len(), g.vertex_count),
            other => panic!("expected model geometry, got {:?}", other),
        }

        demo.unmount();
        assert!(demo.scene().is_empty());
    }

    #[test]
    fn test_missing_gopher_keeps_sphere() {
        let mut demo = Demo::new(
            Box::new(MeshNormalMaterial::new()),
            Assets::new(asset_root("missing", false)),
        );
        demo.mount().unwrap();
        demo.edit("selectedMesh", ParamValue::Text("gopher".into())).unwrap();
        demo.run(5, 0.016);
        assert_eq!(shown_meshes(&demo)[0].name, "sphere");
    }

    #[test]
    fn test_shader_uniforms_bind_and_tick() {
        let mut demo = Demo::new(Box::new(ShaderMaterial::new()), Assets::default());
        demo.mount().unwrap();
        demo.edit("alpha", ParamValue::Number(0.25)).unwrap();
        demo.edit("scale", ParamValue::Number(0.5)).unwrap();
        demo.edit("wireframe", ParamValue::Bool(true)).unwrap();
        demo.run(10, 0.016);

        let (_, cube) = demo.scene().meshes().next().unwrap();
        assert_eq!(cube.material.uniform("alpha"), Some(0.25));
        assert_eq!(cube.material.uniform("scale"), Some(0.5));
        assert!(cube.material.wireframe);
        assert!((cube.material.uniform("time").unwrap() - 0.3).abs() < 1e-4);
        // The uniform named `scale` must not touch the transform.
        assert_eq!(cube.transform.scale, Vec3::ONE);
    }

    #[test]
    fn test_line_rebuilds_in_place() {
        let mut demo = Demo::new(Box::new(LineMaterial::new()), Assets::default());
        demo.mount().unwrap();
        let line_count = |demo: &Demo| {
            demo.scene()
                .scene_entities()
                .find_map(|(id, e)| match e {
                    SceneEntity::Line(l) => Some((id, l.point_count(), l.colors.len())),
                    _ => None,
                })
                .unwrap()
        };

        let (id, points, colors) = line_count(&demo);
        assert_eq!(points, 2 * 7usize.pow(4));
        assert_eq!(points, colors);

        demo.edit("order", ParamValue::Number(2.0)).unwrap();
        let (same_id, points, _) = line_count(&demo);
        assert_eq!(same_id, id);
        assert_eq!(points, 2 * 49);
    }
}
