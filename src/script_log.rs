//! Logging for Rhai scripts.
//!
//! Scripts call `log_info(value)`, `log_warn(value)` and `log_error(value)`.
//! Messages go to the `log` facade under the `script` target, with a
//! per-frame cap so a chatty `update` cannot flood the output.

use std::cell::Cell;

/// Maximum number of log messages allowed per frame to prevent spam.
const MAX_LOGS_PER_FRAME: u32 = 100;

thread_local! {
    /// Log messages emitted in the current frame.
    static LOG_COUNT: Cell<u32> = const { Cell::new(0) };
    /// Whether the limit warning was already printed this frame.
    static WARNED_LIMIT: Cell<bool> = const { Cell::new(false) };
}

/// Log level for script messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Reset the per-frame log counter. Call this at the start of each frame.
pub fn reset_frame_log_count() {
    LOG_COUNT.with(|c| c.set(0));
    WARNED_LIMIT.with(|w| w.set(false));
}

/// Check if we can log another message this frame.
fn can_log() -> bool {
    let count = LOG_COUNT.with(|c| {
        let n = c.get();
        c.set(n.saturating_add(1));
        n
    });
    if count >= MAX_LOGS_PER_FRAME {
        // Only warn once per frame about exceeding limit
        if !WARNED_LIMIT.with(|w| w.replace(true)) {
            log::warn!(
                target: "script",
                "script log limit exceeded ({} messages/frame), further logs dropped",
                MAX_LOGS_PER_FRAME
            );
        }
        false
    } else {
        true
    }
}

/// Log a message from a script, respecting the per-frame limit.
pub fn script_log(level: LogLevel, value: &rhai::Dynamic) {
    if can_log() {
        log::log!(target: "script", log::Level::from(level), "{}", stringify_dynamic(value));
    }
}

/// Convert a Rhai value to display text. Arrays are space separated so
/// `log_info(["energy", 0.5])` reads naturally.
pub fn stringify_dynamic(value: &rhai::Dynamic) -> String {
    if let Ok(s) = value.clone().into_string() {
        return s;
    }

    if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
        let parts: Vec<String> = arr.iter().map(stringify_dynamic).collect();
        return parts.join(" ");
    }

    if let Some(map) = value.clone().try_cast::<rhai::Map>() {
        let parts: Vec<String> = map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, stringify_dynamic(v)))
            .collect();
        return format!("{{{}}}", parts.join(", "));
    }

    if let Ok(i) = value.as_int() {
        return i.to_string();
    }
    if let Ok(f) = value.as_float() {
        return format!("{}", f);
    }
    if let Ok(b) = value.as_bool() {
        return b.to_string();
    }
    if value.is_unit() {
        return "()".to_string();
    }

    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from("hello")), "hello");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(42_i64)), "42");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(0.25_f64)), "0.25");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(true)), "true");
        assert_eq!(stringify_dynamic(&rhai::Dynamic::UNIT), "()");
    }

    #[test]
    fn test_stringify_array() {
        let arr: rhai::Array = vec![rhai::Dynamic::from("energy"), rhai::Dynamic::from(0.5_f64)];
        assert_eq!(stringify_dynamic(&rhai::Dynamic::from(arr)), "energy 0.5");
    }

    #[test]
    fn test_frame_log_limit() {
        reset_frame_log_count();

        for _ in 0..MAX_LOGS_PER_FRAME {
            assert!(can_log());
        }
        assert!(!can_log());

        reset_frame_log_count();
        assert!(can_log());
    }
}
