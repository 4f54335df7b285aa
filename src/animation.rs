//! Per-frame procedural updates.
//!
//! A page registers [`FrameUpdate`] callbacks against one or more entities.
//! Each callback keeps its own tick state (phase, step count) which lives as
//! long as the registration, so it survives parameter edits but restarts on
//! remount. Increments are per frame, not per second, matching the pacing of
//! the demos at their nominal frame rate.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::scene_graph::{EntityId, SceneEntity, SceneGraph};

/// Timing information handed to every callback.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameContext {
    /// Frame number, starting at 1 for the first tick.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Seconds since the loop started.
    pub elapsed: f32,
}

/// Accumulated tick state for one animated object.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickCell {
    value: f32,
}

impl TickCell {
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    pub fn get(&self) -> f32 {
        self.value
    }

    pub fn advance(&mut self, by: f32) -> f32 {
        self.value += by;
        self.value
    }

    pub fn set(&mut self, value: f32) {
        self.value = value;
    }
}

/// A per-frame update bound to scene entities.
///
/// `advance` runs once per frame; `apply` then writes the result into each
/// live target.
pub trait FrameUpdate {
    /// Step the tick state.
    fn advance(&mut self, _ctx: &FrameContext) {}

    /// Write the current state into one entity.
    fn apply(&self, entity: &mut SceneEntity);

    /// Change the rate without resetting the tick state.
    fn set_speed(&mut self, _speed: f32) {}

    /// Advance and apply to a single entity.
    fn update(&mut self, entity: &mut SceneEntity, ctx: &FrameContext) {
        self.advance(ctx);
        self.apply(entity);
    }
}

/// Continuous rotation: `rotation += axes * speed` every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Spin {
    pub axes: Vec3,
    pub speed: f32,
}

impl Spin {
    pub fn new(axes: Vec3, speed: f32) -> Self {
        Self { axes, speed }
    }
}

impl FrameUpdate for Spin {
    fn apply(&self, entity: &mut SceneEntity) {
        entity.transform_mut().rotation += self.axes * self.speed;
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

/// Bouncing arc: `x = center + radius * cos(phase)`,
/// `y = base + amplitude * |sin(phase)|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounce {
    pub base: f32,
    pub amplitude: f32,
    pub center: f32,
    pub radius: f32,
    pub speed: f32,
    pub phase: TickCell,
}

impl Bounce {
    pub fn new(base: f32, amplitude: f32, speed: f32) -> Self {
        Self {
            base,
            amplitude,
            center: 0.0,
            radius: 0.0,
            speed,
            phase: TickCell::default(),
        }
    }

    pub fn with_orbit(mut self, center: f32, radius: f32) -> Self {
        self.center = center;
        self.radius = radius;
        self
    }

    pub fn height(&self) -> f32 {
        self.base + self.amplitude * self.phase.get().sin().abs()
    }
}

impl FrameUpdate for Bounce {
    fn advance(&mut self, _ctx: &FrameContext) {
        self.phase.advance(self.speed);
    }

    fn apply(&self, entity: &mut SceneEntity) {
        let position = &mut entity.transform_mut().position;
        position.x = self.center + self.radius * self.phase.get().cos();
        position.y = self.height();
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

/// Elliptical orbit in the xz plane. Every full turn the x half of the path
/// mirrors about `x = radius_x`, so successive laps alternate sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    pub radius_x: f32,
    pub radius_z: f32,
    pub height: f32,
    pub speed: f32,
    pub phase: TickCell,
    invert: f32,
}

impl Orbit {
    pub fn new(radius_x: f32, radius_z: f32, height: f32, speed: f32) -> Self {
        Self {
            radius_x,
            radius_z,
            height,
            speed,
            phase: TickCell::default(),
            invert: 1.0,
        }
    }

    pub fn inverted(&self) -> bool {
        self.invert < 0.0
    }

    pub fn position(&self) -> Vec3 {
        let phase = self.phase.get();
        let mut x = self.radius_x * phase.cos();
        if self.inverted() {
            x = self.invert * (x - self.radius_x) + self.radius_x;
        }
        Vec3::new(x, self.height, self.radius_z * phase.sin())
    }
}

impl FrameUpdate for Orbit {
    fn advance(&mut self, _ctx: &FrameContext) {
        if self.phase.get() > TAU {
            self.invert = -self.invert;
            self.phase.advance(-TAU);
        } else {
            self.phase.advance(self.speed);
        }
    }

    fn apply(&self, entity: &mut SceneEntity) {
        entity.transform_mut().position = self.position();
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

/// Adds `delta` to a shader uniform every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformClock {
    pub uniform: String,
    pub delta: f32,
}

impl UniformClock {
    pub fn new(uniform: &str, delta: f32) -> Self {
        Self {
            uniform: uniform.to_string(),
            delta,
        }
    }
}

impl FrameUpdate for UniformClock {
    fn apply(&self, entity: &mut SceneEntity) {
        if let Some(value) = entity
            .material_mut()
            .and_then(|m| m.uniform_mut(&self.uniform))
        {
            *value += self.delta;
        }
    }

    fn set_speed(&mut self, speed: f32) {
        self.delta = speed;
    }
}

/// Steps particle systems once per frame.
#[derive(Debug, Clone, Default)]
pub struct Precipitation;

impl FrameUpdate for Precipitation {
    fn apply(&self, entity: &mut SceneEntity) {
        if let SceneEntity::Points(system) = entity {
            system.step();
        }
    }
}

/// Reflect one coordinate at `[-bound, bound]`.
///
/// `displacement` is the per-frame change applied to `position`. It is
/// negated only while the coordinate is at or past a bound and still moving
/// outward, so a crossing inverts it exactly once. The coordinate is clamped
/// back into range. Returns true when the displacement was inverted.
pub fn reflect_axis(position: &mut f32, displacement: &mut f32, bound: f32) -> bool {
    let outward = (*position >= bound && *displacement > 0.0)
        || (*position <= -bound && *displacement < 0.0);
    *position = position.clamp(-bound, bound);
    if outward {
        *displacement = -*displacement;
    }
    outward
}

// ============================================================================
// Frame loop
// ============================================================================

/// Handle to a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

struct Slot {
    id: SlotId,
    name: String,
    targets: Vec<EntityId>,
    update: Box<dyn FrameUpdate>,
}

/// Registry of per-frame callbacks.
pub struct FrameLoop {
    slots: Vec<Slot>,
    next_slot: u64,
    frame: u64,
    elapsed: f32,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_slot: 1,
            frame: 0,
            elapsed: 0.0,
        }
    }

    /// Register `update` against a single entity.
    pub fn register(
        &mut self,
        name: &str,
        target: EntityId,
        update: impl FrameUpdate + 'static,
    ) -> SlotId {
        self.register_many(name, vec![target], update)
    }

    /// Register one callback driving several entities with shared tick state.
    pub fn register_many(
        &mut self,
        name: &str,
        targets: Vec<EntityId>,
        update: impl FrameUpdate + 'static,
    ) -> SlotId {
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.slots.push(Slot {
            id,
            name: name.to_string(),
            targets,
            update: Box::new(update),
        });
        log::debug!("registered frame callback '{}'", name);
        id
    }

    /// Change the rate of a registered callback. Returns false if it is gone.
    pub fn set_speed(&mut self, slot: SlotId, speed: f32) -> bool {
        match self.slots.iter_mut().find(|s| s.id == slot) {
            Some(s) => {
                s.update.set_speed(speed);
                true
            }
            None => false,
        }
    }

    /// Point a callback at new targets, keeping its tick state.
    pub fn retarget(&mut self, slot: SlotId, targets: Vec<EntityId>) -> bool {
        match self.slots.iter_mut().find(|s| s.id == slot) {
            Some(s) => {
                s.targets = targets;
                true
            }
            None => false,
        }
    }

    /// Remove a callback.
    pub fn unregister(&mut self, slot: SlotId) -> bool {
        let before = self.slots.len();
        self.slots.retain(|s| s.id != slot);
        self.slots.len() != before
    }

    /// Stop animating `entity`. Callbacks left without targets are dropped.
    pub fn detach_entity(&mut self, entity: EntityId) {
        for slot in &mut self.slots {
            slot.targets.retain(|&t| t != entity);
        }
        self.slots.retain(|s| {
            if s.targets.is_empty() {
                log::debug!("dropped frame callback '{}'", s.name);
            }
            !s.targets.is_empty()
        });
    }

    /// Run every callback once. A callback whose targets are all missing is
    /// skipped for this frame without advancing its tick state.
    pub fn tick(&mut self, scene: &mut SceneGraph, dt: f32) -> FrameContext {
        self.frame += 1;
        self.elapsed += dt;
        let ctx = FrameContext {
            frame: self.frame,
            dt,
            elapsed: self.elapsed,
        };

        for slot in &mut self.slots {
            if !slot.targets.iter().any(|&t| scene.exists(t)) {
                continue;
            }
            slot.update.advance(&ctx);
            for &target in &slot.targets {
                if let Some(entity) = scene.get_mut(target) {
                    slot.update.apply(entity);
                }
            }
        }
        ctx
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every callback and reset the frame counter.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.frame = 0;
        self.elapsed = 0.0;
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::scene_graph::{Geometry, MeshInstance};

    fn sphere(scene: &mut SceneGraph) -> EntityId {
        scene.spawn(MeshInstance::new(
            Geometry::Sphere {
                radius: 4.0,
                segments: 20,
            },
            Material::lambert(0x7777ff),
        ))
    }

    #[test]
    fn test_bounce_stays_within_amplitude() {
        let mut scene = SceneGraph::new();
        let id = sphere(&mut scene);
        let mut frames = FrameLoop::new();
        frames.register("bounce", id, Bounce::new(2.0, 10.0, 0.04).with_orbit(20.0, 10.0));

        for _ in 0..5000 {
            frames.tick(&mut scene, 1.0 / 60.0);
            let y = scene.get(id).unwrap().transform().position.y;
            assert!((2.0..=12.0).contains(&y), "y = {}", y);
        }
    }

    #[test]
    fn test_spin_accumulates_and_speed_is_live() {
        let mut scene = SceneGraph::new();
        let id = sphere(&mut scene);
        let mut frames = FrameLoop::new();
        let slot = frames.register("spin", id, Spin::new(Vec3::ONE, 0.02));

        frames.tick(&mut scene, 0.016);
        frames.tick(&mut scene, 0.016);
        assert!(frames.set_speed(slot, 0.5));
        frames.tick(&mut scene, 0.016);

        let rotation = scene.get(id).unwrap().transform().rotation;
        assert!((rotation.x - 0.54).abs() < 1e-5);
        assert_eq!(rotation.x, rotation.z);
    }

    #[test]
    fn test_missing_entity_is_noop() {
        let mut scene = SceneGraph::new();
        let id = sphere(&mut scene);
        let mut frames = FrameLoop::new();
        frames.register("bounce", id, Bounce::new(2.0, 10.0, 0.04));

        scene.destroy(id);
        let ctx = frames.tick(&mut scene, 0.016);
        assert_eq!(ctx.frame, 1);
        assert_eq!(frames.len(), 1);

        frames.detach_entity(id);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_shared_targets_advance_once_per_frame() {
        let mut scene = SceneGraph::new();
        let a = sphere(&mut scene);
        let b = sphere(&mut scene);
        let mut frames = FrameLoop::new();
        frames.register_many("bounce", vec![a, b], Bounce::new(0.0, 1.0, 0.1));

        frames.tick(&mut scene, 0.016);
        let ya = scene.get(a).unwrap().transform().position.y;
        let yb = scene.get(b).unwrap().transform().position.y;
        assert_eq!(ya, yb);
        assert!((ya - 0.1f32.sin()).abs() < 1e-6);
    }

    #[test]
    fn test_orbit_flips_each_turn() {
        let mut orbit = Orbit::new(14.0, 25.0, 5.0, 0.5);
        let ctx = FrameContext::default();
        let mut flips = 0;
        let mut last = orbit.inverted();
        for _ in 0..200 {
            orbit.advance(&ctx);
            if orbit.inverted() != last {
                flips += 1;
                last = orbit.inverted();
            }
            assert!(orbit.phase.get() <= TAU + 0.5);
        }
        // 200 frames at 0.5 rad is 100 rad, roughly 15 turns.
        assert!(flips >= 13);
    }

    #[test]
    fn test_uniform_clock() {
        let mut scene = SceneGraph::new();
        let id = scene.spawn(MeshInstance::new(
            Geometry::Box {
                width: 20.0,
                height: 20.0,
                depth: 20.0,
            },
            Material::shader(&[("time", 0.2)]),
        ));
        let mut frames = FrameLoop::new();
        frames.register("clock", id, UniformClock::new("time", 0.1));
        for _ in 0..3 {
            frames.tick(&mut scene, 0.016);
        }
        let time = scene.material(id).unwrap().uniform("time").unwrap();
        assert!((time - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_reflect_axis() {
        let mut x = 20.5;
        let mut dx = 0.3;
        assert!(reflect_axis(&mut x, &mut dx, 20.0));
        assert_eq!((x, dx), (20.0, -0.3));
        assert!(!reflect_axis(&mut x, &mut dx, 20.0));
        assert_eq!(dx, -0.3);

        let mut y = -3.0;
        let mut dy = -1.0;
        assert!(!reflect_axis(&mut y, &mut dy, 20.0));
    }
}
