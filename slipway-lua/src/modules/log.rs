//! Logging module for release definition scripts
//!
//! Definitions can call `log.info(...)` while computing their matrices.
//! Arguments are converted like Lua's `print` and joined with spaces. The
//! installed `LogSink` decides where the line goes: the runner and the CLI
//! forward it to `tracing`, tests collect it.

use crate::module::SlipwayModule;
use mlua::prelude::*;
use slipway_core::domain::log::LogLevel;
use std::sync::Arc;

/// Destination for lines logged from Lua
pub trait LogSink: Send + Sync {
    fn write(&self, level: LogLevel, message: &str);
}

/// Forwards definition log lines to `tracing` under the `definition` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "definition", "{}", message),
            LogLevel::Info => tracing::info!(target: "definition", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "definition", "{}", message),
            LogLevel::Error => tracing::error!(target: "definition", "{}", message),
        }
    }
}

pub struct LogModule<S: LogSink> {
    sink: Arc<S>,
}

impl<S: LogSink> LogModule<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }
}

fn render(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy(),
        other => format!("<{}>", other.type_name()),
    }
}

impl<S: LogSink + 'static> SlipwayModule for LogModule<S> {
    fn id(&self) -> &'static str {
        "log"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let table = lua.create_table()?;

        for (name, level) in [
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warning", LogLevel::Warning),
            ("error", LogLevel::Error),
        ] {
            let sink = Arc::clone(&self.sink);
            let function = lua.create_function(move |_, args: LuaMultiValue| {
                let line = args.iter().map(render).collect::<Vec<_>>().join(" ");
                sink.write(level, &line);
                Ok(())
            })?;
            table.set(name, function)?;
        }

        lua.globals().set(self.id(), table)
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Logging from release definitions. Arguments are joined with spaces.
---@class log
log = {}

---@param ... any
function log.debug(...) end

---@param ... any
function log.info(...) end

---@param ... any
function log.warning(...) end

---@param ... any
function log.error(...) end
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct CollectingSink {
        lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
    }

    impl LogSink for CollectingSink {
        fn write(&self, level: LogLevel, message: &str) {
            self.lines.lock().unwrap().push((level, message.to_string()));
        }
    }

    fn lua_with_sink() -> (Lua, CollectingSink) {
        let sink = CollectingSink::default();
        let lua = Lua::new();
        LogModule::new(sink.clone()).register(&lua).unwrap();
        (lua, sink)
    }

    #[test]
    fn test_levels_reach_sink() {
        let (lua, sink) = lua_with_sink();
        lua.load(
            r#"
            log.debug("resolving matrix")
            log.info("components")
            log.warning("no examples")
            log.error("bad asset")
        "#,
        )
        .exec()
        .unwrap();

        let lines = sink.lines.lock().unwrap();
        let levels: Vec<LogLevel> = lines.iter().map(|(l, _)| *l).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error]
        );
        assert_eq!(lines[3].1, "bad asset");
    }

    #[test]
    fn test_arguments_are_joined() {
        let (lua, sink) = lua_with_sink();
        lua.load(r#"log.info("targets:", 3, true, nil, {})"#)
            .exec()
            .unwrap();

        assert_eq!(
            sink.lines.lock().unwrap()[0].1,
            "targets: 3 true nil <table>"
        );
    }

    #[test]
    fn test_tracing_sink() {
        let lua = Lua::new();
        LogModule::new(TracingLogSink).register(&lua).unwrap();
        lua.load(r#"log.info("hello") log.error("oops")"#)
            .exec()
            .unwrap();
    }

    #[test]
    fn test_stubs() {
        let stubs = LogModule::new(TracingLogSink).stubs();
        assert!(stubs.starts_with("---@meta"));
        assert!(stubs.contains("function log.warning(...)"));
    }
}
