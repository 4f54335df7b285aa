//! Scene lights.
//!
//! Lights are plain scene entities: a shared set of properties (color,
//! intensity, shadows, position) plus the parameters of their family.
//! Lighting computation itself belongs to the renderer; this module only
//! holds what a panel can edit.

use glam::Vec3;
use serde::Serialize;

use crate::binding::{self, Bindable};
use crate::color::Color;
use crate::param::ParamValue;
use crate::scene_graph::Transform;

/// Light family with family-specific parameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightKind {
    Ambient,
    Point {
        distance: f32,
        decay: f32,
    },
    Spot {
        distance: f32,
        /// Cone half-angle in radians.
        angle: f32,
        penumbra: f32,
        decay: f32,
        target: Vec3,
    },
    Directional {
        target: Vec3,
    },
    Hemisphere {
        ground_color: Color,
    },
}

/// A light source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
    pub cast_shadow: bool,
    pub visible: bool,
    pub transform: Transform,
}

impl Light {
    fn new(kind: LightKind, color: u32) -> Self {
        Self {
            kind,
            color: Color::from_u32(color),
            intensity: 1.0,
            cast_shadow: false,
            visible: true,
            transform: Transform::default(),
        }
    }

    pub fn ambient(color: u32) -> Self {
        Self::new(LightKind::Ambient, color)
    }

    pub fn point(color: u32) -> Self {
        Self::new(
            LightKind::Point {
                distance: 0.0,
                decay: 1.0,
            },
            color,
        )
    }

    pub fn spot(color: u32) -> Self {
        Self::new(
            LightKind::Spot {
                distance: 0.0,
                angle: std::f32::consts::FRAC_PI_3,
                penumbra: 0.0,
                decay: 1.0,
                target: Vec3::ZERO,
            },
            color,
        )
    }

    pub fn directional(color: u32) -> Self {
        Self::new(LightKind::Directional { target: Vec3::ZERO }, color)
    }

    pub fn hemisphere(sky: u32, ground: u32) -> Self {
        Self::new(
            LightKind::Hemisphere {
                ground_color: Color::from_u32(ground),
            },
            sky,
        )
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.transform.position = Vec3::new(x, y, z);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_shadow(mut self) -> Self {
        self.cast_shadow = true;
        self
    }

    /// Set distance on point and spot lights; ignored otherwise.
    pub fn with_distance(mut self, d: f32) -> Self {
        if let LightKind::Point { distance, .. } | LightKind::Spot { distance, .. } = &mut self.kind {
            *distance = d;
        }
        self
    }

    pub fn with_decay(mut self, d: f32) -> Self {
        if let LightKind::Point { decay, .. } | LightKind::Spot { decay, .. } = &mut self.kind {
            *decay = d;
        }
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            LightKind::Ambient => "ambient_light",
            LightKind::Point { .. } => "point_light",
            LightKind::Spot { .. } => "spot_light",
            LightKind::Directional { .. } => "directional_light",
            LightKind::Hemisphere { .. } => "hemisphere_light",
        }
    }
}

impl Bindable for Light {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        if binding::set_transform_property(&mut self.transform, key, value) {
            return true;
        }

        let number = || binding::number(value);
        let written = match (&mut self.kind, key) {
            (_, "color") => binding::color(value).map(|c| self.color = c),
            (_, "intensity") => number().map(|v| self.intensity = v),
            (_, "castShadow") => binding::flag(value).map(|v| self.cast_shadow = v),
            (_, "visible") => binding::flag(value).map(|v| self.visible = v),
            (LightKind::Point { distance, .. } | LightKind::Spot { distance, .. }, "distance") => {
                number().map(|v| *distance = v)
            }
            (LightKind::Point { decay, .. } | LightKind::Spot { decay, .. }, "decay") => {
                number().map(|v| *decay = v)
            }
            (LightKind::Spot { angle, .. }, "angle") => number().map(|v| *angle = v),
            (LightKind::Spot { penumbra, .. }, "penumbra") => number().map(|v| *penumbra = v),
            (LightKind::Spot { target, .. } | LightKind::Directional { target }, key) => {
                match key.strip_prefix("target.") {
                    Some(c) => binding::set_component(target, c, value).then_some(()),
                    None => None,
                }
            }
            (LightKind::Hemisphere { ground_color }, "groundColor") => {
                binding::color(value).map(|c| *ground_color = c)
            }
            _ => None,
        };
        written.is_some()
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        if let Some(v) = binding::transform_property(&self.transform, key) {
            return Some(v);
        }
        match (&self.kind, key) {
            (_, "color") => Some(self.color.into()),
            (_, "intensity") => Some(self.intensity.into()),
            (_, "castShadow") => Some(self.cast_shadow.into()),
            (_, "visible") => Some(self.visible.into()),
            (LightKind::Point { distance, .. } | LightKind::Spot { distance, .. }, "distance") => {
                Some((*distance).into())
            }
            (LightKind::Point { decay, .. } | LightKind::Spot { decay, .. }, "decay") => {
                Some((*decay).into())
            }
            (LightKind::Spot { angle, .. }, "angle") => Some((*angle).into()),
            (LightKind::Spot { penumbra, .. }, "penumbra") => Some((*penumbra).into()),
            (LightKind::Spot { target, .. } | LightKind::Directional { target }, key) => {
                binding::component(*target, key.strip_prefix("target.")?)
            }
            (LightKind::Hemisphere { ground_color }, "groundColor") => {
                Some((*ground_color).into())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::apply_to_target;
    use crate::param::ParamState;

    #[test]
    fn test_point_light_properties() {
        let mut light = Light::point(0xccffcc).with_decay(0.1);
        let state = ParamState::new()
            .with("color", "#ffffff")
            .with("distance", 100.0)
            .with("angle", 0.5);

        // `angle` only exists on spot lights.
        assert_eq!(apply_to_target(&state, &mut light), 2);
        assert_eq!(light.color, Color::WHITE);
        assert_eq!(light.property("distance"), Some(ParamValue::Number(100.0)));
        assert_eq!(light.property("decay"), Some(ParamValue::Number(0.1)));
    }

    #[test]
    fn test_ambient_ignores_distance() {
        let mut light = Light::ambient(0x0c0c0c);
        assert!(!light.set_property("distance", &ParamValue::Number(10.0)));
        assert!(light.set_property("intensity", &ParamValue::Number(2.0)));
        assert_eq!(light.intensity, 2.0);
    }

    #[test]
    fn test_spot_target_components() {
        let mut light = Light::spot(0xffffff).at(-40.0, 60.0, -10.0);
        assert!(light.set_property("target.x", &ParamValue::Number(5.0)));
        assert_eq!(light.property("target.x"), Some(ParamValue::Number(5.0)));
        assert_eq!(light.property("position.y"), Some(ParamValue::Number(60.0)));
    }
}
