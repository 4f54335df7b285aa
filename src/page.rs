//! Demo pages and the headless driver that runs them.
//!
//! A [`Page`] builds its scene on a [`Stage`] at mount, receives its parameter
//! state after every edit, and disposes everything it created at unmount.
//! [`Demo`] owns the page together with its stage, parameter state, panel and
//! optional script, and drives the mount / frame / edit / unmount cycle.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;

use crate::animation::{FrameContext, FrameLoop};
use crate::asset::Assets;
use crate::camera::Camera;
use crate::panel::{ControlKind, Panel};
use crate::param::{ParamState, ParamValue};
use crate::scene_graph::{EntityId, EntitySnapshot, SceneEntity, SceneGraph};
use crate::scripting::ScriptEngine;

/// Everything a page builds on.
pub struct Stage {
    pub scene: SceneGraph,
    pub frames: FrameLoop,
    pub assets: Assets,
    /// Camera the page looks through, if it placed one.
    pub camera: Option<EntityId>,
}

impl Stage {
    pub fn new(assets: Assets) -> Self {
        Self {
            scene: SceneGraph::new(),
            frames: FrameLoop::new(),
            assets,
            camera: None,
        }
    }

    /// Spawn a camera and make it the active one.
    pub fn spawn_camera(&mut self, camera: Camera) -> EntityId {
        let id = self.scene.spawn(camera);
        self.camera = Some(id);
        id
    }

    /// Destroy an entity (and its subtree) and stop animating it.
    pub fn dispose(&mut self, id: EntityId) {
        for child in self.scene.children(id) {
            self.dispose(child);
        }
        self.frames.detach_entity(id);
        self.scene.destroy(id);
        if self.camera == Some(id) {
            self.camera = None;
        }
    }

    pub fn dispose_all(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        for id in ids {
            self.dispose(id);
        }
    }

    pub fn active_camera(&self) -> Option<&Camera> {
        match self.scene.get(self.camera?)? {
            SceneEntity::Camera(camera) => Some(camera),
            _ => None,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(Assets::default())
    }
}

/// One demo page of the gallery.
pub trait Page {
    /// Stable identifier, `chapterNN/name`.
    fn id(&self) -> &'static str;

    fn title(&self) -> &'static str;

    fn chapter(&self) -> u32;

    /// Initial parameter state.
    fn defaults(&self) -> ParamState;

    /// Controls exposed for the parameter state.
    fn panel(&self) -> Panel;

    /// Build the scene.
    fn mount(&mut self, stage: &mut Stage) -> Result<()>;

    /// Push the current parameter state into the scene.
    fn apply(&mut self, state: &ParamState, stage: &mut Stage);

    /// Handle a panel button. Returns false for unknown actions.
    fn action(&mut self, _name: &str, _state: &mut ParamState, _stage: &mut Stage) -> bool {
        false
    }

    /// Per-frame hook run before the frame callbacks (e.g. to pick up a
    /// model that finished loading).
    fn on_frame(&mut self, _state: &ParamState, _stage: &mut Stage) {}

    /// Dispose everything the page created.
    fn unmount(&mut self, stage: &mut Stage);
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub page: String,
    pub frames: u64,
    pub params: ParamState,
    pub entities: Vec<EntitySnapshot>,
}

/// A mounted page with its state.
pub struct Demo {
    page: Box<dyn Page>,
    stage: Stage,
    state: ParamState,
    panel: Panel,
    script: Option<ScriptEngine>,
    mounted: bool,
}

impl Demo {
    pub fn new(page: Box<dyn Page>, assets: Assets) -> Self {
        let state = page.defaults();
        let panel = page.panel();
        Self {
            page,
            stage: Stage::new(assets),
            state,
            panel,
            script: None,
            mounted: false,
        }
    }

    /// Drive the page's parameters from a script as well as the panel.
    pub fn set_script(&mut self, script: ScriptEngine) {
        if !script.has_script() {
            log::warn!("{}: attached script has nothing loaded", self.page.id());
        }
        self.script = Some(script);
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn state(&self) -> &ParamState {
        &self.state
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.stage.scene
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Build the scene and apply the current state.
    pub fn mount(&mut self) -> Result<()> {
        if self.mounted {
            bail!("page {} is already mounted", self.page.id());
        }
        self.page
            .mount(&mut self.stage)
            .with_context(|| format!("failed to mount {}", self.page.id()))?;
        self.page.apply(&self.state, &mut self.stage);
        self.mounted = true;
        log::info!(
            "mounted {} ({} entities)",
            self.page.id(),
            self.stage.scene.len()
        );
        Ok(())
    }

    /// Run one frame: resolve assets, page hook, frame callbacks, script.
    /// An unmounted demo does not advance.
    pub fn frame(&mut self, dt: f32) -> FrameContext {
        if !self.mounted {
            return FrameContext {
                frame: self.stage.frames.frame(),
                ..FrameContext::default()
            };
        }
        self.stage.assets.poll();
        self.page.on_frame(&self.state, &mut self.stage);
        let ctx = self.stage.frames.tick(&mut self.stage.scene, dt);

        if let Some(script) = &mut self.script {
            if let Some(overrides) = script.update(ctx.frame, &self.state) {
                let accepted = self.panel.coerce_overrides(&self.state, &overrides);
                let changed = self.state.merge(&accepted);
                if !changed.is_empty() {
                    log::debug!("frame {}: script changed {:?}", ctx.frame, changed);
                    self.page.apply(&self.state, &mut self.stage);
                }
            }
        }
        ctx
    }

    /// Run `count` frames of `dt` seconds.
    pub fn run(&mut self, count: u64, dt: f32) {
        for _ in 0..count {
            self.frame(dt);
        }
    }

    /// Edit one field through its panel control, or press it if it is a
    /// button.
    pub fn edit(&mut self, path: &str, value: ParamValue) -> Result<()> {
        let control = self
            .panel
            .find(path)
            .ok_or_else(|| anyhow!("page {} has no control '{}'", self.page.id(), path))?;

        if control.kind == ControlKind::Button {
            return self.press(path);
        }
        if !self.panel.edit(&mut self.state, path, &value) {
            bail!("value {} is not valid for '{}'", value, path);
        }
        if self.mounted {
            self.page.apply(&self.state, &mut self.stage);
        }
        Ok(())
    }

    /// Apply every value of `params` through the panel. Read-only fields
    /// are accepted when they match the current value, so a report's params
    /// can be fed back in.
    pub fn edit_all(&mut self, params: &ParamState) -> Result<()> {
        for (path, value) in params.values() {
            let read_only = matches!(
                self.panel.find(&path).map(|c| &c.kind),
                Some(ControlKind::Text { read_only: true })
            );
            if read_only && self.state.get(&path) == Some(value) {
                continue;
            }
            self.edit(&path, value.clone())?;
        }
        Ok(())
    }

    /// Trigger a panel button.
    pub fn press(&mut self, name: &str) -> Result<()> {
        if !self.mounted {
            bail!("page {} is not mounted", self.page.id());
        }
        if !self
            .page
            .action(name, &mut self.state, &mut self.stage)
        {
            bail!("page {} has no action '{}'", self.page.id(), name);
        }
        self.page.apply(&self.state, &mut self.stage);
        Ok(())
    }

    pub fn report(&self) -> Report {
        Report {
            page: self.page.id().to_string(),
            frames: self.stage.frames.frame(),
            params: self.state.clone(),
            entities: self.stage.scene.snapshot(),
        }
    }

    /// Dispose the page's scene.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.page.unmount(&mut self.stage);
        self.stage.frames.clear();
        self.mounted = false;
        if !self.stage.scene.is_empty() {
            log::warn!(
                "{} left {} entities after unmount",
                self.page.id(),
                self.stage.scene.len()
            );
        }
        log::info!("unmounted {}", self.page.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Spin;
    use crate::binding::Binding;
    use crate::material::Material;
    use crate::panel::ControlSpec;
    use crate::scene_graph::{Geometry, MeshInstance};
    use glam::Vec3;

    /// A single spinning cube with an opacity slider.
    #[derive(Default)]
    struct CubePage {
        cube: Option<EntityId>,
        binding: Binding,
    }

    impl Page for CubePage {
        fn id(&self) -> &'static str {
            "test/cube"
        }

        fn title(&self) -> &'static str {
            "Cube"
        }

        fn chapter(&self) -> u32 {
            0
        }

        fn defaults(&self) -> ParamState {
            ParamState::new().with("opacity", 1.0)
        }

        fn panel(&self) -> Panel {
            Panel::new()
                .control("opacity", ControlSpec::number(0.0, 1.0, 0.1))
                .control("hide", ControlSpec::button())
        }

        fn mount(&mut self, stage: &mut Stage) -> Result<()> {
            let cube = stage.scene.spawn(MeshInstance::new(
                Geometry::Box {
                    width: 1.0,
                    height: 1.0,
                    depth: 1.0,
                },
                Material::basic(0xff0000),
            ));
            stage.frames.register("spin", cube, Spin::new(Vec3::Y, 0.1));
            self.binding.rebind(cube);
            self.cube = Some(cube);
            Ok(())
        }

        fn apply(&mut self, state: &ParamState, stage: &mut Stage) {
            self.binding.apply(state, &mut stage.scene);
        }

        fn action(&mut self, name: &str, _state: &mut ParamState, stage: &mut Stage) -> bool {
            match (name, self.cube) {
                ("hide", Some(cube)) => {
                    if let Some(entity) = stage.scene.get_mut(cube) {
                        entity.set_visible(false);
                    }
                    true
                }
                _ => false,
            }
        }

        fn unmount(&mut self, stage: &mut Stage) {
            if let Some(cube) = self.cube.take() {
                stage.dispose(cube);
            }
        }
    }

    #[test]
    fn test_demo_lifecycle() {
        let mut demo = Demo::new(Box::new(CubePage::default()), Assets::default());
        demo.mount().unwrap();
        assert!(demo.mount().is_err());

        demo.run(10, 1.0 / 60.0);
        let (_, cube) = demo.scene().meshes().next().unwrap();
        assert!((cube.transform.rotation.y - 1.0).abs() < 1e-5);

        demo.edit("opacity", ParamValue::Number(0.44)).unwrap();
        let (_, cube) = demo.scene().meshes().next().unwrap();
        assert!((cube.material.opacity - 0.4).abs() < 1e-6);

        assert!(demo.edit("missing", ParamValue::Number(1.0)).is_err());
        assert!(demo.edit("opacity", ParamValue::Text("abc".into())).is_err());

        demo.edit("hide", ParamValue::Bool(true)).unwrap();
        assert!(!demo.scene().meshes().next().unwrap().1.visible);

        demo.unmount();
        assert!(demo.scene().is_empty());
        assert!(demo.stage().frames.is_empty());
    }

    #[test]
    fn test_script_overrides_are_applied() {
        let mut script = ScriptEngine::new();
        script
            .load_script("fn update(frame, params) { #{ opacity: 0.5 } }")
            .unwrap();

        let mut demo = Demo::new(Box::new(CubePage::default()), Assets::default());
        demo.set_script(script);
        demo.mount().unwrap();
        demo.frame(0.016);

        assert_eq!(demo.state().number("opacity"), Some(0.5));
        let (_, cube) = demo.scene().meshes().next().unwrap();
        assert_eq!(cube.material.opacity, 0.5);
    }

    #[test]
    fn test_report_lists_entities() {
        let mut demo = Demo::new(Box::new(CubePage::default()), Assets::default());
        demo.mount().unwrap();
        demo.run(3, 0.016);
        let report = demo.report();
        assert_eq!(report.page, "test/cube");
        assert_eq!(report.frames, 3);
        assert_eq!(report.entities.len(), 1);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"kind\":\"mesh\""));
    }

    #[test]
    fn test_script_overrides_respect_the_panel() {
        let mut script = ScriptEngine::new();
        script
            .load_script("fn update(frame, params) { #{ opacity: 2.5, hide: true, extra: 3 } }")
            .unwrap();

        let mut demo = Demo::new(Box::new(CubePage::default()), Assets::default());
        demo.set_script(script);
        demo.mount().unwrap();
        demo.frame(0.016);

        assert_eq!(demo.state().number("opacity"), Some(1.0));
        assert_eq!(demo.state().get("hide"), None);
        assert_eq!(demo.state().number("extra"), Some(3.0));
        assert!(demo.scene().meshes().next().unwrap().1.visible);
    }

    #[test]
    fn test_unmounted_demo_does_not_advance() {
        let mut demo = Demo::new(Box::new(CubePage::default()), Assets::default());
        assert_eq!(demo.frame(0.016).frame, 0);
        assert!(demo.press("hide").is_err());

        demo.mount().unwrap();
        demo.run(2, 0.016);
        demo.unmount();
        assert_eq!(demo.frame(0.016).frame, demo.stage().frames.frame());
        assert!(demo.press("hide").is_err());
        assert!(demo.scene().is_empty());
    }
}
