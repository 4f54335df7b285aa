//! Rhai scripting for parameter-driven pages.
//!
//! A script drives a page through its parameter state. It can define:
//! - `fn init(params)` - Called once before the first update
//! - `fn update(frame, params)` - Called each frame with the frame number and
//!   a copy of the page's parameters
//!
//! Either function may return an object map of overrides, e.g.
//! `#{ rotationSpeed: 0.5, position: #{ x: 2.0 } }`, which the caller merges
//! into the state and pushes through the page's bindings. Returning nothing
//! leaves the state alone.
//!
//! Logging:
//! - `log_info(value)`, `log_warn(value)`, `log_error(value)`
//! - Values can be strings, numbers, booleans, arrays or maps
//!
//! Colors are passed to scripts as `"#rrggbb"` strings.

use anyhow::{anyhow, Result};
use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use serde::Serialize;

use crate::param::{ParamState, ParamValue};
use crate::script_log::{reset_frame_log_count, script_log, LogLevel};

/// Phase in which a script error occurred.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Compile,
    Init,
    Update,
}

/// A script error with its position in the user's source.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptDiagnostic {
    pub phase: ScriptPhase,
    pub message: String,
    /// 1-based line, when the engine reported one.
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl ScriptDiagnostic {
    fn new(phase: ScriptPhase, message: String, position: rhai::Position) -> Self {
        Self {
            phase,
            message,
            line: position.line().map(|l| l as u32),
            column: position.position().map(|c| c as u32),
        }
    }
}

impl std::fmt::Display for ScriptDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{:?} error at {}:{}: {}", self.phase, line, column, self.message)
            }
            _ => write!(f, "{:?} error: {}", self.phase, self.message),
        }
    }
}

/// Scripting engine that manages the Rhai VM lifecycle for one page.
pub struct ScriptEngine {
    engine: Engine,
    ast: Option<AST>,
    scope: Scope<'static>,
    has_init: bool,
    has_update: bool,
    init_called: bool,
    /// Last error message (for display/debugging)
    pub last_error: Option<ScriptDiagnostic>,
}

impl ScriptEngine {
    /// Create a new script engine with sandboxed settings.
    pub fn new() -> Self {
        let mut engine = Engine::new();

        // Sandbox settings
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(100_000); // Prevent infinite loops
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(500);

        engine
            .register_fn("log_info", |value: Dynamic| script_log(LogLevel::Info, &value))
            .register_fn("log_warn", |value: Dynamic| script_log(LogLevel::Warn, &value))
            .register_fn("log_error", |value: Dynamic| script_log(LogLevel::Error, &value));

        Self {
            engine,
            ast: None,
            scope: Scope::new(),
            has_init: false,
            has_update: false,
            init_called: false,
            last_error: None,
        }
    }

    /// Compile a script and run its top-level statements.
    pub fn load_script(&mut self, script: &str) -> Result<()> {
        self.ast = None;
        self.scope = Scope::new();
        self.init_called = false;
        self.last_error = None;

        let ast = self.engine.compile(script).map_err(|e| {
            let diag = ScriptDiagnostic::new(ScriptPhase::Compile, e.to_string(), e.position());
            self.last_error = Some(diag.clone());
            anyhow!("script failed to compile: {}", diag)
        })?;

        self.engine
            .run_ast_with_scope(&mut self.scope, &ast)
            .map_err(|e| {
                let diag = ScriptDiagnostic::new(ScriptPhase::Compile, e.to_string(), e.position());
                self.last_error = Some(diag.clone());
                anyhow!("script failed to run: {}", diag)
            })?;

        self.has_init = ast.iter_functions().any(|f| f.name == "init");
        self.has_update = ast.iter_functions().any(|f| f.name == "update");
        if !self.has_update {
            log::warn!("script defines no update(frame, params) function");
        }
        log::info!("script loaded");
        self.ast = Some(ast);
        Ok(())
    }

    /// Check if a script is loaded.
    pub fn has_script(&self) -> bool {
        self.ast.is_some()
    }

    /// Run `init` once if the script defines it. Returns any overrides.
    pub fn call_init(&mut self, params: &ParamState) -> Option<ParamState> {
        if self.init_called {
            return None;
        }
        self.init_called = true;
        if !self.has_init {
            return None;
        }
        let args = (Dynamic::from_map(state_to_map(params)),);
        self.call(ScriptPhase::Init, "init", args)
    }

    /// Run `update` for one frame. Returns the overrides it produced, if any.
    /// Runtime errors are logged and the frame continues without overrides.
    pub fn update(&mut self, frame: u64, params: &ParamState) -> Option<ParamState> {
        reset_frame_log_count();

        let mut overrides = self.call_init(params);
        if self.has_update {
            let args = (frame as i64, Dynamic::from_map(state_to_map(params)));
            if let Some(update) = self.call(ScriptPhase::Update, "update", args) {
                match &mut overrides {
                    Some(existing) => {
                        existing.merge(&update);
                    }
                    None => overrides = Some(update),
                }
            }
        }
        overrides
    }

    fn call(
        &mut self,
        phase: ScriptPhase,
        name: &str,
        args: impl rhai::FuncArgs,
    ) -> Option<ParamState> {
        let ast = self.ast.as_ref()?;
        let result: Result<Dynamic, Box<EvalAltResult>> =
            self.engine.call_fn(&mut self.scope, ast, name, args);

        match result {
            Ok(value) => overrides_from_dynamic(value),
            Err(e) => {
                let diag = ScriptDiagnostic::new(phase, e.to_string(), e.position());
                log::error!("{}", diag);
                self.last_error = Some(diag);
                None
            }
        }
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn value_to_dynamic(value: &ParamValue) -> Dynamic {
    match value {
        ParamValue::Bool(b) => Dynamic::from(*b),
        ParamValue::Number(n) => Dynamic::from(*n as rhai::FLOAT),
        ParamValue::Text(s) => Dynamic::from(s.clone()),
        ParamValue::Color(c) => Dynamic::from(c.to_hex()),
    }
}

fn dynamic_to_value(value: &Dynamic) -> Option<ParamValue> {
    if let Ok(b) = value.as_bool() {
        return Some(ParamValue::Bool(b));
    }
    if let Ok(f) = value.as_float() {
        return Some(ParamValue::Number(f));
    }
    if let Ok(i) = value.as_int() {
        return Some(ParamValue::Number(i as f64));
    }
    value.clone().into_string().ok().map(ParamValue::Text)
}

/// Parameter state as a Rhai object map; groups become nested maps.
pub fn state_to_map(state: &ParamState) -> rhai::Map {
    let mut map = rhai::Map::new();
    for (path, value) in state.values() {
        match path.split_once('.') {
            None => {
                map.insert(path.as_str().into(), value_to_dynamic(value));
            }
            Some((group, key)) => {
                let entry = map
                    .entry(group.into())
                    .or_insert_with(|| Dynamic::from_map(rhai::Map::new()));
                if let Some(mut inner) = entry.write_lock::<rhai::Map>() {
                    inner.insert(key.into(), value_to_dynamic(value));
                }
            }
        }
    }
    map
}

/// Overrides from a script return value. Non-map results mean "no change";
/// entries of unsupported types are skipped.
pub fn overrides_from_dynamic(value: Dynamic) -> Option<ParamState> {
    let map = value.try_cast::<rhai::Map>()?;
    let mut state = ParamState::new();
    for (key, value) in &map {
        if let Some(inner) = value.clone().try_cast::<rhai::Map>() {
            for (inner_key, inner_value) in &inner {
                match dynamic_to_value(inner_value) {
                    Some(v) => {
                        state.set(&format!("{}.{}", key, inner_key), v);
                    }
                    None => log::warn!("script override {}.{} has an unsupported type", key, inner_key),
                }
            }
        } else {
            match dynamic_to_value(value) {
                Some(v) => {
                    state.set(key, v);
                }
                None => log::warn!("script override {} has an unsupported type", key),
            }
        }
    }
    Some(state)
}
