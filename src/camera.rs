//! Cameras.
//!
//! A camera is a scene entity like any other, so its projection parameters can
//! be bound to a panel. The camera looks at `target` from its position.

use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::binding::{self, Bindable};
use crate::param::ParamValue;
use crate::scene_graph::Transform;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees.
        fov: f32,
        aspect: f32,
    },
    Orthographic {
        /// Half the visible height in world units.
        half_height: f32,
        aspect: f32,
        zoom: f32,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub target: Vec3,
    pub up: Vec3,
    pub transform: Transform,
}

impl Camera {
    /// The default gallery camera: 45 degree perspective looking at the origin.
    pub fn perspective(fov: f32, position: [f32; 3]) -> Self {
        let mut transform = Transform::default();
        transform.position = Vec3::from(position);
        Self {
            projection: Projection::Perspective { fov, aspect: 16.0 / 9.0 },
            near: 0.1,
            far: 1000.0,
            target: Vec3::ZERO,
            up: Vec3::Y,
            transform,
        }
    }

    pub fn orthographic(half_height: f32, position: [f32; 3]) -> Self {
        let mut camera = Self::perspective(45.0, position);
        camera.projection = Projection::Orthographic {
            half_height,
            aspect: 16.0 / 9.0,
            zoom: 1.0,
        };
        camera
    }

    pub fn looking_at(mut self, target: [f32; 3]) -> Self {
        self.target = Vec3::from(target);
        self
    }

    pub fn set_aspect(&mut self, new_aspect: f32) {
        match &mut self.projection {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                *aspect = new_aspect
            }
        }
    }

    /// World-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.transform.position, self.target, self.up)
    }

    /// View-to-clip matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov, aspect } => {
                Mat4::perspective_rh(fov.to_radians(), aspect, self.near, self.far)
            }
            Projection::Orthographic {
                half_height,
                aspect,
                zoom,
            } => {
                let h = half_height / zoom.max(f32::EPSILON);
                let w = h * aspect;
                Mat4::orthographic_rh(-w, w, -h, h, self.near, self.far)
            }
        }
    }
}

impl Bindable for Camera {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        if binding::set_transform_property(&mut self.transform, key, value) {
            return true;
        }
        if let Some(c) = key.strip_prefix("lookAt.") {
            return binding::set_component(&mut self.target, c, value);
        }
        let Some(v) = binding::number(value) else {
            return false;
        };
        match (&mut self.projection, key) {
            (_, "near") => self.near = v,
            (_, "far") => self.far = v,
            (Projection::Perspective { fov, .. }, "fov") => *fov = v,
            (Projection::Orthographic { zoom, .. }, "zoom") => *zoom = v,
            _ => return false,
        }
        true
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        if let Some(v) = binding::transform_property(&self.transform, key) {
            return Some(v);
        }
        if let Some(c) = key.strip_prefix("lookAt.") {
            return binding::component(self.target, c);
        }
        match (&self.projection, key) {
            (_, "near") => Some(self.near.into()),
            (_, "far") => Some(self.far.into()),
            (Projection::Perspective { fov, .. }, "fov") => Some((*fov).into()),
            (Projection::Orthographic { zoom, .. }, "zoom") => Some((*zoom).into()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_fov_binding() {
        let mut camera = Camera::perspective(45.0, [-30.0, 40.0, 30.0]);
        assert!(camera.set_property("fov", &ParamValue::Number(60.0)));
        assert!(!camera.set_property("zoom", &ParamValue::Number(2.0)));
        assert_eq!(camera.property("fov"), Some(ParamValue::Number(60.0)));
    }

    #[test]
    fn test_look_at_origin_projects_origin_to_center() {
        let camera = Camera::perspective(45.0, [-30.0, 40.0, 30.0]);
        let clip = camera.projection_matrix() * camera.view_matrix() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4);
        assert!(ndc.y.abs() < 1e-4);
    }

    #[test]
    fn test_orthographic_zoom() {
        let mut camera = Camera::orthographic(20.0, [0.0, 0.0, 50.0]);
        assert!(camera.set_property("zoom", &ParamValue::Number(2.0)));
        assert_eq!(camera.property("zoom"), Some(ParamValue::Number(2.0)));
    }
}
