//! Parameter state backing the property panel.
//!
//! A `ParamState` is a flat or one-level nested mapping from field name to a
//! primitive value. Nested values are addressed with a dotted path
//! (`position.x`). The panel edits it, the binding adapter pushes it into scene
//! objects, and scripts may return overrides that are merged into it.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// A primitive value held in parameter state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Color(Color),
}

impl ParamValue {
    /// Numeric view. Booleans read as 0/1, numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(s) => s.trim().parse::<f64>().ok(),
            ParamValue::Color(_) => None,
        }
    }

    /// Boolean view. Numbers are true when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(v) => Some(*v != 0.0),
            ParamValue::Text(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            ParamValue::Color(_) => None,
        }
    }

    /// Color view. Hex strings are parsed, numbers are packed `0xRRGGBB`.
    pub fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(c) => Some(*c),
            ParamValue::Text(s) => Color::from_hex(s),
            ParamValue::Number(v) if *v >= 0.0 => Some(Color::from_u32(*v as u32)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a command-line style literal: `true`, `1.5`, `#ff00ff`, or text.
    pub fn parse_literal(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(v) = raw.parse::<f64>() {
            return ParamValue::Number(v);
        }
        if raw.starts_with('#') {
            if let Some(c) = Color::from_hex(raw) {
                return ParamValue::Color(c);
            }
        }
        ParamValue::Text(raw.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Number(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{:?}", s),
            ParamValue::Color(c) => write!(f, "{}", c.to_hex()),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<f32> for ParamValue {
    /// Widens through the shortest decimal form, so `0.6f32` reads back as
    /// `0.6` rather than `0.6000000238418579`.
    fn from(v: f32) -> Self {
        ParamValue::Number(v.to_string().parse().unwrap_or(v as f64))
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Color> for ParamValue {
    fn from(v: Color) -> Self {
        ParamValue::Color(v)
    }
}

/// A top-level entry: either a value or a one-level group of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamEntry {
    Value(ParamValue),
    Group(BTreeMap<String, ParamValue>),
}

/// Mutable key/value store edited by the property panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamState {
    entries: BTreeMap<String, ParamEntry>,
}

impl ParamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a top-level value.
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.entries
            .insert(key.to_string(), ParamEntry::Value(value.into()));
        self
    }

    /// Builder: add a nested group of values.
    pub fn with_group<V: Into<ParamValue>>(
        mut self,
        group: &str,
        values: impl IntoIterator<Item = (&'static str, V)>,
    ) -> Self {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.into()))
            .collect();
        self.entries.insert(group.to_string(), ParamEntry::Group(map));
        self
    }

    /// Parse a JSON object into parameter state.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parameter state must be a JSON object of primitives")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a value by `key` or `group.key`.
    pub fn get(&self, path: &str) -> Option<&ParamValue> {
        match path.split_once('.') {
            None => match self.entries.get(path)? {
                ParamEntry::Value(v) => Some(v),
                ParamEntry::Group(_) => None,
            },
            Some((group, key)) => match self.entries.get(group)? {
                ParamEntry::Group(map) => map.get(key),
                ParamEntry::Value(_) => None,
            },
        }
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(ParamValue::as_f64)
    }

    pub fn flag(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(ParamValue::as_bool)
    }

    pub fn color(&self, path: &str) -> Option<Color> {
        self.get(path).and_then(ParamValue::as_color)
    }

    /// Set a value by `key` or `group.key`.
    ///
    /// Paths deeper than one level are rejected. Setting `group.key` on a
    /// missing group creates it; on an existing plain value it is rejected.
    pub fn set(&mut self, path: &str, value: impl Into<ParamValue>) -> bool {
        let value = value.into();
        match path.split_once('.') {
            None => {
                if matches!(self.entries.get(path), Some(ParamEntry::Group(_))) {
                    return false;
                }
                self.entries
                    .insert(path.to_string(), ParamEntry::Value(value));
                true
            }
            Some((_, rest)) if rest.contains('.') => false,
            Some((group, key)) => {
                let entry = self
                    .entries
                    .entry(group.to_string())
                    .or_insert_with(|| ParamEntry::Group(BTreeMap::new()));
                match entry {
                    ParamEntry::Group(map) => {
                        map.insert(key.to_string(), value);
                        true
                    }
                    ParamEntry::Value(_) => false,
                }
            }
        }
    }

    /// Remove a value. Returns the old value if there was one.
    pub fn remove(&mut self, path: &str) -> Option<ParamValue> {
        match path.split_once('.') {
            None => match self.entries.remove(path)? {
                ParamEntry::Value(v) => Some(v),
                group @ ParamEntry::Group(_) => {
                    self.entries.insert(path.to_string(), group);
                    None
                }
            },
            Some((group, key)) => match self.entries.get_mut(group)? {
                ParamEntry::Group(map) => map.remove(key),
                ParamEntry::Value(_) => None,
            },
        }
    }

    /// Iterate all values as `(path, value)`, groups flattened to `group.key`.
    pub fn values(&self) -> Vec<(String, &ParamValue)> {
        let mut out = Vec::new();
        for (key, entry) in &self.entries {
            match entry {
                ParamEntry::Value(v) => out.push((key.clone(), v)),
                ParamEntry::Group(map) => {
                    for (inner, v) in map {
                        out.push((format!("{}.{}", key, inner), v));
                    }
                }
            }
        }
        out
    }

    /// All value paths.
    pub fn paths(&self) -> Vec<String> {
        self.values().into_iter().map(|(path, _)| path).collect()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrite values in `self` with every value present in `other`.
    /// Returns the paths whose value actually changed.
    pub fn merge(&mut self, other: &ParamState) -> Vec<String> {
        let mut changed = Vec::new();
        for (path, value) in other.values() {
            if self.get(&path) != Some(value) && self.set(&path, value.clone()) {
                changed.push(path);
            }
        }
        changed
    }

    /// Build a translated state holding only the mapped keys, renamed.
    ///
    /// Used when a panel field drives a differently named property, e.g.
    /// `ambientColor` -> `color` on the ambient light.
    pub fn project(&self, mapping: &[(&str, &str)]) -> ParamState {
        let mut out = ParamState::new();
        for (from, to) in mapping {
            if let Some(value) = self.get(from) {
                out.set(to, value.clone());
            }
        }
        out
    }

    /// Keep only the listed paths.
    pub fn select(&self, paths: &[&str]) -> ParamState {
        let mapping: Vec<(&str, &str)> = paths.iter().map(|p| (*p, *p)).collect();
        self.project(&mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_and_nested_access() {
        let state = ParamState::new()
            .with("visible", true)
            .with_group("position", [("x", 1.0), ("y", 2.0), ("z", 3.0)]);

        assert_eq!(state.flag("visible"), Some(true));
        assert_eq!(state.number("position.y"), Some(2.0));
        assert_eq!(state.get("position"), None);
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_set_rejects_deep_paths() {
        let mut state = ParamState::new().with("opacity", 0.5);
        assert!(!state.set("a.b.c", 1.0));
        assert!(!state.set("opacity.x", 1.0));
        assert!(state.set("scale.x", 2.0));
        assert_eq!(state.number("scale.x"), Some(2.0));
    }

    #[test]
    fn test_merge_reports_changes_only() {
        let mut state = ParamState::new().with("a", 1.0).with("b", false);
        let other = ParamState::new().with("a", 1.0).with("b", true);
        let changed = state.merge(&other);
        assert_eq!(changed, vec!["b".to_string()]);
        assert_eq!(state.flag("b"), Some(true));
    }

    #[test]
    fn test_project_renames() {
        let state = ParamState::new()
            .with("ambientColor", Color::from_u32(0x0c0c0c))
            .with("distance", 100.0);
        let projected = state.project(&[("ambientColor", "color")]);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.color("color"), Some(Color::from_u32(0x0c0c0c)));
    }

    #[test]
    fn test_json_round_trip_keeps_groups() {
        let json = r##"{"opacity": 0.5, "color": "#ff0000", "scale": {"x": 2, "y": 1}}"##;
        let state = ParamState::from_json(json).unwrap();
        assert_eq!(state.number("opacity"), Some(0.5));
        assert_eq!(state.color("color"), Some(Color::new(1.0, 0.0, 0.0)));
        assert_eq!(state.number("scale.x"), Some(2.0));

        assert!(ParamState::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(ParamValue::parse_literal("true"), ParamValue::Bool(true));
        assert_eq!(ParamValue::parse_literal("0.25"), ParamValue::Number(0.25));
        assert_eq!(
            ParamValue::parse_literal("#00ff00"),
            ParamValue::Color(Color::new(0.0, 1.0, 0.0))
        );
        assert_eq!(
            ParamValue::parse_literal("gopher"),
            ParamValue::Text("gopher".into())
        );
    }

    #[test]
    fn test_empty_groups_hold_no_values() {
        let state = ParamState::new().with_group("scale", std::iter::empty::<(&'static str, f64)>());
        assert_eq!(state.len(), 0);
        assert!(state.is_empty());
        assert!(!state.with("opacity", 0.5).is_empty());
    }
}
