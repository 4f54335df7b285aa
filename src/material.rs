//! Surface materials and their bindable properties.
//!
//! Every mesh, line and point cloud owns its material. Pages that want the
//! same look on several objects clone a material per object instead of
//! sharing one instance, so disposing one object never affects another.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::binding::{self, Bindable};
use crate::color::Color;
use crate::param::ParamValue;

/// Which faces are rendered. Panels hand these over as raw numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

impl Side {
    pub fn from_index(i: i64) -> Option<Self> {
        match i {
            0 => Some(Side::Front),
            1 => Some(Side::Back),
            2 => Some(Side::Double),
            _ => None,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            Side::Front => 0,
            Side::Back => 1,
            Side::Double => 2,
        }
    }
}

/// Per-vertex coloring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexColors {
    #[default]
    None,
    Face,
    Vertex,
}

impl VertexColors {
    pub fn from_index(i: i64) -> Option<Self> {
        match i {
            0 => Some(VertexColors::None),
            1 => Some(VertexColors::Face),
            2 => Some(VertexColors::Vertex),
            _ => None,
        }
    }

    pub fn index(&self) -> i64 {
        match self {
            VertexColors::None => 0,
            VertexColors::Face => 1,
            VertexColors::Vertex => 2,
        }
    }
}

/// Material family, with the properties only that family has.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    Basic,
    Lambert {
        emissive: Color,
    },
    Phong {
        emissive: Color,
        specular: Color,
        shininess: f32,
    },
    Standard {
        emissive: Color,
        roughness: f32,
        metalness: f32,
    },
    Normal,
    Depth,
    LineBasic {
        linewidth: f32,
    },
    Points {
        size: f32,
        size_attenuation: bool,
        /// Texture path once the loader resolved it.
        map: Option<String>,
    },
    Shader {
        uniforms: BTreeMap<String, f32>,
    },
}

impl MaterialKind {
    pub fn name(&self) -> &'static str {
        match self {
            MaterialKind::Basic => "basic",
            MaterialKind::Lambert { .. } => "lambert",
            MaterialKind::Phong { .. } => "phong",
            MaterialKind::Standard { .. } => "standard",
            MaterialKind::Normal => "normal",
            MaterialKind::Depth => "depth",
            MaterialKind::LineBasic { .. } => "line_basic",
            MaterialKind::Points { .. } => "points",
            MaterialKind::Shader { .. } => "shader",
        }
    }

    /// Normal and depth materials derive their color from geometry.
    fn has_color(&self) -> bool {
        !matches!(self, MaterialKind::Normal | MaterialKind::Depth)
    }
}

/// A material with the properties common to every family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub kind: MaterialKind,
    pub name: String,
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    pub visible: bool,
    pub side: Side,
    pub shadow_side: Side,
    pub color_write: bool,
    pub flat_shading: bool,
    pub premultiplied_alpha: bool,
    pub dithering: bool,
    pub vertex_colors: VertexColors,
    pub fog: bool,
    pub wireframe: bool,
    pub wireframe_linewidth: f32,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            name: String::new(),
            color: Color::WHITE,
            opacity: 1.0,
            transparent: false,
            visible: true,
            side: Side::Front,
            shadow_side: Side::Front,
            color_write: true,
            flat_shading: false,
            premultiplied_alpha: false,
            dithering: false,
            vertex_colors: VertexColors::None,
            fog: true,
            wireframe: false,
            wireframe_linewidth: 1.0,
        }
    }

    pub fn basic(color: u32) -> Self {
        Self::new(MaterialKind::Basic).with_color(color)
    }

    pub fn lambert(color: u32) -> Self {
        Self::new(MaterialKind::Lambert {
            emissive: Color::BLACK,
        })
        .with_color(color)
    }

    pub fn phong(color: u32) -> Self {
        Self::new(MaterialKind::Phong {
            emissive: Color::BLACK,
            specular: Color::from_u32(0x111111),
            shininess: 30.0,
        })
        .with_color(color)
    }

    pub fn standard(color: u32) -> Self {
        Self::new(MaterialKind::Standard {
            emissive: Color::BLACK,
            roughness: 1.0,
            metalness: 0.0,
        })
        .with_color(color)
    }

    pub fn normal() -> Self {
        Self::new(MaterialKind::Normal)
    }

    pub fn line_basic(color: u32) -> Self {
        Self::new(MaterialKind::LineBasic { linewidth: 1.0 }).with_color(color)
    }

    pub fn points(size: f32) -> Self {
        Self::new(MaterialKind::Points {
            size,
            size_attenuation: true,
            map: None,
        })
    }

    /// A shader material exposing `uniforms` as bindable properties.
    pub fn shader(uniforms: &[(&str, f32)]) -> Self {
        Self::new(MaterialKind::Shader {
            uniforms: uniforms.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        })
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Color::from_u32(color);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = opacity < 1.0;
        self
    }

    /// Set the sprite texture of a points material; ignored otherwise.
    pub fn with_map(mut self, path: &str) -> Self {
        if let MaterialKind::Points { map, .. } = &mut self.kind {
            *map = Some(path.to_string());
        }
        self
    }

    pub fn with_wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }

    /// Current value of a shader uniform.
    pub fn uniform(&self, name: &str) -> Option<f32> {
        match &self.kind {
            MaterialKind::Shader { uniforms } => uniforms.get(name).copied(),
            _ => None,
        }
    }

    /// Mutable access to a shader uniform, None for other families.
    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut f32> {
        match &mut self.kind {
            MaterialKind::Shader { uniforms } => uniforms.get_mut(name),
            _ => None,
        }
    }

    fn set_kind_property(&mut self, key: &str, value: &ParamValue) -> bool {
        match (&mut self.kind, key) {
            (
                MaterialKind::Lambert { emissive }
                | MaterialKind::Phong { emissive, .. }
                | MaterialKind::Standard { emissive, .. },
                "emissive",
            ) => assign(emissive, binding::color(value)),
            (MaterialKind::Phong { specular, .. }, "specular") => {
                assign(specular, binding::color(value))
            }
            (MaterialKind::Phong { shininess, .. }, "shininess") => {
                assign(shininess, binding::number(value))
            }
            (MaterialKind::Standard { roughness, .. }, "roughness") => {
                assign(roughness, binding::number(value))
            }
            (MaterialKind::Standard { metalness, .. }, "metalness") => {
                assign(metalness, binding::number(value))
            }
            (MaterialKind::LineBasic { linewidth }, "linewidth") => {
                assign(linewidth, binding::number(value))
            }
            (MaterialKind::Points { size, .. }, "size") => assign(size, binding::number(value)),
            (MaterialKind::Points { size_attenuation, .. }, "sizeAttenuation") => {
                assign(size_attenuation, binding::flag(value))
            }
            (MaterialKind::Shader { uniforms }, name) => match uniforms.get_mut(name) {
                Some(slot) => assign(slot, binding::number(value)),
                None => false,
            },
            _ => false,
        }
    }

    fn kind_property(&self, key: &str) -> Option<ParamValue> {
        match (&self.kind, key) {
            (
                MaterialKind::Lambert { emissive }
                | MaterialKind::Phong { emissive, .. }
                | MaterialKind::Standard { emissive, .. },
                "emissive",
            ) => Some((*emissive).into()),
            (MaterialKind::Phong { specular, .. }, "specular") => Some((*specular).into()),
            (MaterialKind::Phong { shininess, .. }, "shininess") => Some((*shininess).into()),
            (MaterialKind::Standard { roughness, .. }, "roughness") => Some((*roughness).into()),
            (MaterialKind::Standard { metalness, .. }, "metalness") => Some((*metalness).into()),
            (MaterialKind::LineBasic { linewidth }, "linewidth") => Some((*linewidth).into()),
            (MaterialKind::Points { size, .. }, "size") => Some((*size).into()),
            (MaterialKind::Points { size_attenuation, .. }, "sizeAttenuation") => {
                Some((*size_attenuation).into())
            }
            (MaterialKind::Shader { uniforms }, name) => uniforms.get(name).map(|v| (*v).into()),
            _ => None,
        }
    }
}

/// Assign a coerced value, reporting whether the coercion succeeded.
fn assign<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}

impl Bindable for Material {
    fn set_property(&mut self, key: &str, value: &ParamValue) -> bool {
        match key {
            "name" => assign(&mut self.name, value.as_str().map(str::to_string)),
            "color" if self.kind.has_color() => assign(&mut self.color, binding::color(value)),
            "opacity" => assign(&mut self.opacity, binding::number(value)),
            "transparent" => assign(&mut self.transparent, binding::flag(value)),
            "visible" => assign(&mut self.visible, binding::flag(value)),
            // Out-of-range enum values leave the property unchanged.
            "side" => assign(&mut self.side, binding::index(value).and_then(Side::from_index)),
            "shadowSide" => assign(
                &mut self.shadow_side,
                binding::index(value).and_then(Side::from_index),
            ),
            "vertexColors" => assign(
                &mut self.vertex_colors,
                binding::index(value).and_then(VertexColors::from_index),
            ),
            "colorWrite" => assign(&mut self.color_write, binding::flag(value)),
            "flatShading" => assign(&mut self.flat_shading, binding::flag(value)),
            "premultipliedAlpha" => assign(&mut self.premultiplied_alpha, binding::flag(value)),
            "dithering" => assign(&mut self.dithering, binding::flag(value)),
            "fog" => assign(&mut self.fog, binding::flag(value)),
            "wireframe" => assign(&mut self.wireframe, binding::flag(value)),
            "wireframeLinewidth" => assign(&mut self.wireframe_linewidth, binding::number(value)),
            _ => self.set_kind_property(key, value),
        }
    }

    fn property(&self, key: &str) -> Option<ParamValue> {
        match key {
            "name" => Some(self.name.clone().into()),
            "color" if self.kind.has_color() => Some(self.color.into()),
            "opacity" => Some(self.opacity.into()),
            "transparent" => Some(self.transparent.into()),
            "visible" => Some(self.visible.into()),
            "side" => Some(ParamValue::Number(self.side.index() as f64)),
            "shadowSide" => Some(ParamValue::Number(self.shadow_side.index() as f64)),
            "vertexColors" => Some(ParamValue::Number(self.vertex_colors.index() as f64)),
            "colorWrite" => Some(self.color_write.into()),
            "flatShading" => Some(self.flat_shading.into()),
            "premultipliedAlpha" => Some(self.premultiplied_alpha.into()),
            "dithering" => Some(self.dithering.into()),
            "fog" => Some(self.fog.into()),
            "wireframe" => Some(self.wireframe.into()),
            "wireframeLinewidth" => Some(self.wireframe_linewidth.into()),
            _ => self.kind_property(key),
        }
    }
}
