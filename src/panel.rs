//! Property panel model.
//!
//! The panel is the headless half of a dat.gui style editor: a list of typed
//! controls, optionally grouped into folders, each addressing one path of the
//! page's [`ParamState`]. [`Panel::edit`] takes a raw widget value, coerces it
//! to the control's type (clamping and snapping sliders) and writes it into
//! the state.

use std::fmt::Write as _;

use crate::param::{ParamState, ParamValue};

/// Widget type and its constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Number { min: f64, max: f64, step: f64 },
    Boolean,
    Text { read_only: bool },
    Color,
    Choice { options: Vec<ParamValue> },
    /// Triggers a page action instead of editing state.
    Button,
}

/// Description of a control before it is attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub kind: ControlKind,
    pub label: Option<String>,
}

impl ControlSpec {
    fn of(kind: ControlKind) -> Self {
        Self { kind, label: None }
    }

    pub fn number(min: f64, max: f64, step: f64) -> Self {
        Self::of(ControlKind::Number { min, max, step })
    }

    pub fn boolean() -> Self {
        Self::of(ControlKind::Boolean)
    }

    pub fn text() -> Self {
        Self::of(ControlKind::Text { read_only: false })
    }

    pub fn read_only() -> Self {
        Self::of(ControlKind::Text { read_only: true })
    }

    pub fn color() -> Self {
        Self::of(ControlKind::Color)
    }

    pub fn choice<V: Into<ParamValue>>(options: impl IntoIterator<Item = V>) -> Self {
        Self::of(ControlKind::Choice {
            options: options.into_iter().map(Into::into).collect(),
        })
    }

    pub fn button() -> Self {
        Self::of(ControlKind::Button)
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// A control bound to one parameter path.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelControl {
    pub path: String,
    pub label: String,
    pub kind: ControlKind,
}

impl PanelControl {
    /// Coerce a raw widget value into this control's type.
    /// Returns None when the value cannot be represented.
    pub fn coerce(&self, raw: &ParamValue) -> Option<ParamValue> {
        match &self.kind {
            ControlKind::Number { min, max, step } => {
                let v = raw.as_f64()?;
                if !v.is_finite() {
                    return None;
                }
                Some(ParamValue::Number(snap(v, *min, *max, *step)))
            }
            ControlKind::Boolean => raw.as_bool().map(ParamValue::Bool),
            ControlKind::Text { read_only: true } => None,
            ControlKind::Text { read_only: false } => Some(match raw {
                ParamValue::Text(s) => ParamValue::Text(s.clone()),
                other => ParamValue::Text(other.to_string()),
            }),
            ControlKind::Color => raw.as_color().map(ParamValue::Color),
            ControlKind::Choice { options } => options
                .iter()
                .find(|option| same_option(option, raw))
                .cloned(),
            ControlKind::Button => None,
        }
    }

    fn describe_kind(&self) -> String {
        match &self.kind {
            ControlKind::Number { min, max, step } => {
                format!("number {}..{} step {}", min, max, step)
            }
            ControlKind::Boolean => "boolean".to_string(),
            ControlKind::Text { read_only: true } => "text (read-only)".to_string(),
            ControlKind::Text { read_only: false } => "text".to_string(),
            ControlKind::Color => "color".to_string(),
            ControlKind::Choice { options } => {
                let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                format!("choice [{}]", options.join(", "))
            }
            ControlKind::Button => "button".to_string(),
        }
    }
}

/// Attach a control spec to a parameter field.
pub fn build_panel_control(field: &str, spec: ControlSpec) -> PanelControl {
    PanelControl {
        path: field.to_string(),
        label: spec.label.unwrap_or_else(|| field.to_string()),
        kind: spec.kind,
    }
}

/// Snap to the step grid anchored at `min`, then clamp into `[min, max]`.
/// A degenerate range (`min > max`) pins to `min`.
fn snap(v: f64, min: f64, max: f64, step: f64) -> f64 {
    let mut v = v;
    if step > 0.0 {
        v = min + ((v - min) / step).round() * step;
        let scale = 10f64.powi(step_decimals(step));
        v = (v * scale).round() / scale;
    }
    v.min(max).max(min)
}

fn step_decimals(step: f64) -> i32 {
    let text = format!("{}", step);
    match text.split_once('.') {
        Some((_, frac)) => frac.len() as i32,
        None => 0,
    }
}

/// Select widgets hand back strings; compare by value across types.
fn same_option(option: &ParamValue, raw: &ParamValue) -> bool {
    if option == raw {
        return true;
    }
    match (option, raw) {
        (ParamValue::Number(a), other) => other.as_f64() == Some(*a),
        (ParamValue::Text(a), ParamValue::Number(b)) => a.parse::<f64>().ok() == Some(*b),
        _ => false,
    }
}

/// A titled group of controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub title: String,
    pub controls: Vec<PanelControl>,
}

impl Folder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            controls: Vec::new(),
        }
    }

    pub fn control(mut self, field: &str, spec: ControlSpec) -> Self {
        self.controls.push(build_panel_control(field, spec));
        self
    }
}

/// The full panel of a page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Panel {
    pub controls: Vec<PanelControl>,
    pub folders: Vec<Folder>,
}

impl Panel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control(mut self, field: &str, spec: ControlSpec) -> Self {
        self.controls.push(build_panel_control(field, spec));
        self
    }

    pub fn folder(mut self, folder: Folder) -> Self {
        self.folders.push(folder);
        self
    }

    /// Every control, top level first, then folders in order.
    pub fn all_controls(&self) -> impl Iterator<Item = &PanelControl> {
        self.controls
            .iter()
            .chain(self.folders.iter().flat_map(|f| f.controls.iter()))
    }

    pub fn find(&self, path: &str) -> Option<&PanelControl> {
        self.all_controls().find(|c| c.path == path)
    }

    pub fn buttons(&self) -> Vec<&str> {
        self.all_controls()
            .filter(|c| c.kind == ControlKind::Button)
            .map(|c| c.path.as_str())
            .collect()
    }

    /// Coerce `raw` through the control at `path` and write it into `state`.
    /// Returns false for unknown paths, buttons, read-only fields and values
    /// the control cannot represent; `state` is then unchanged.
    pub fn edit(&self, state: &mut ParamState, path: &str, raw: &ParamValue) -> bool {
        let Some(control) = self.find(path) else {
            return false;
        };
        match control.coerce(raw) {
            Some(value) => state.set(path, value),
            None => false,
        }
    }

    /// Filter script overrides against the controls, relative to `state`.
    ///
    /// Values equal to the current ones are skipped. Values with a control
    /// are coerced like a panel edit and dropped when the control rejects
    /// them; values with no control pass through unless they are non-finite
    /// numbers.
    pub fn coerce_overrides(&self, state: &ParamState, overrides: &ParamState) -> ParamState {
        let mut accepted = ParamState::new();
        for (path, raw) in overrides.values() {
            if state.get(&path) == Some(raw) {
                continue;
            }
            let coerced = match self.find(&path) {
                Some(control) => control.coerce(raw),
                None => match raw {
                    ParamValue::Number(n) if !n.is_finite() => None,
                    other => Some(other.clone()),
                },
            };
            match coerced {
                Some(value) => {
                    accepted.set(&path, value);
                }
                None => log::warn!("dropping override {} = {}", path, raw),
            }
        }
        accepted
    }

    /// Text listing of the controls and their current values.
    pub fn describe(&self, state: &ParamState) -> String {
        let mut out = String::new();
        for control in &self.controls {
            describe_control(&mut out, "", control, state);
        }
        for folder in &self.folders {
            let _ = writeln!(out, "[{}]", folder.title);
            for control in &folder.controls {
                describe_control(&mut out, "  ", control, state);
            }
        }
        out
    }
}

fn describe_control(out: &mut String, indent: &str, control: &PanelControl, state: &ParamState) {
    let value = match state.get(&control.path) {
        Some(v) => v.to_string(),
        None if control.kind == ControlKind::Button => "-".to_string(),
        None => "(unset)".to_string(),
    };
    let _ = writeln!(
        out,
        "{}{:<22} {:<16} {}",
        indent,
        control.label,
        value,
        control.describe_kind()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn panel() -> Panel {
        Panel::new()
            .control("cubeCount", ControlSpec::number(0.0, 100.0, 1.0))
            .control("opacity", ControlSpec::number(0.0, 1.0, 0.01))
            .control("addCube", ControlSpec::button())
            .folder(
                Folder::new("Material")
                    .control("uuid", ControlSpec::read_only())
                    .control("side", ControlSpec::choice([0, 1, 2]))
                    .control("color", ControlSpec::color())
                    .control("visible", ControlSpec::boolean()),
            )
    }

    #[test]
    fn test_number_edit_clamps_and_snaps() {
        let panel = panel();
        let mut state = ParamState::new();

        assert!(panel.edit(&mut state, "cubeCount", &ParamValue::Number(250.0)));
        assert_eq!(state.number("cubeCount"), Some(100.0));

        assert!(panel.edit(&mut state, "cubeCount", &ParamValue::Number(-3.0)));
        assert_eq!(state.number("cubeCount"), Some(0.0));

        assert!(panel.edit(&mut state, "cubeCount", &ParamValue::Number(4.6)));
        assert_eq!(state.number("cubeCount"), Some(5.0));

        assert!(panel.edit(&mut state, "opacity", &ParamValue::Number(0.333)));
        assert_eq!(state.number("opacity"), Some(0.33));
    }

    #[test]
    fn test_degenerate_range_does_not_panic() {
        let control = build_panel_control("x", ControlSpec::number(5.0, 1.0, 1.0));
        assert_eq!(control.coerce(&ParamValue::Number(3.0)), Some(ParamValue::Number(5.0)));
    }

    #[test]
    fn test_choice_accepts_string_options() {
        let panel = panel();
        let mut state = ParamState::new();
        assert!(panel.edit(&mut state, "side", &ParamValue::Text("2".into())));
        assert_eq!(state.get("side"), Some(&ParamValue::Number(2.0)));
        assert!(!panel.edit(&mut state, "side", &ParamValue::Number(3.0)));
        assert_eq!(state.get("side"), Some(&ParamValue::Number(2.0)));
    }

    #[test]
    fn test_rejected_edits_leave_state() {
        let panel = panel();
        let mut state = ParamState::new().with("uuid", "abc");
        assert!(!panel.edit(&mut state, "uuid", &ParamValue::Text("xyz".into())));
        assert!(!panel.edit(&mut state, "addCube", &ParamValue::Bool(true)));
        assert!(!panel.edit(&mut state, "unknown", &ParamValue::Number(1.0)));
        assert!(!panel.edit(&mut state, "color", &ParamValue::Text("not a color".into())));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_color_and_boolean_coercion() {
        let panel = panel();
        let mut state = ParamState::new();
        assert!(panel.edit(&mut state, "color", &ParamValue::Text("#ff0000".into())));
        assert_eq!(state.color("color"), Some(Color::new(1.0, 0.0, 0.0)));
        assert!(panel.edit(&mut state, "visible", &ParamValue::Number(0.0)));
        assert_eq!(state.flag("visible"), Some(false));
    }

    #[test]
    fn test_buttons_and_describe() {
        let panel = panel();
        assert_eq!(panel.buttons(), vec!["addCube"]);

        let state = ParamState::new().with("cubeCount", 3.0);
        let text = panel.describe(&state);
        assert!(text.contains("cubeCount"));
        assert!(text.contains("[Material]"));
        assert!(text.contains("number 0..100 step 1"));
    }

    #[test]
    fn test_overrides_follow_the_controls() {
        let panel = panel();
        let state = ParamState::new()
            .with("cubeCount", 3.0)
            .with("opacity", 1.0)
            .with("uuid", "abc");
        let overrides = ParamState::new()
            .with("cubeCount", 250.0)
            .with("opacity", -5.0)
            .with("uuid", "xyz")
            .with("addCube", true)
            .with("speed", f64::NAN)
            .with("label", "free");

        let accepted = panel.coerce_overrides(&state, &overrides);
        assert_eq!(accepted.number("cubeCount"), Some(100.0));
        assert_eq!(accepted.number("opacity"), Some(0.0));
        assert_eq!(accepted.get("uuid"), None);
        assert_eq!(accepted.get("addCube"), None);
        assert_eq!(accepted.get("speed"), None);
        assert_eq!(accepted.get("label").and_then(|v| v.as_str()), Some("free"));
        assert_eq!(accepted.len(), 3);
    }

    #[test]
    fn test_unchanged_overrides_are_skipped() {
        let panel = panel();
        let state = ParamState::new().with("uuid", "abc").with("opacity", 0.5);
        let echo = state.clone();
        assert!(panel.coerce_overrides(&state, &echo).is_empty());
    }
}
