//! Run variable access for release definitions
//!
//! Exposes the variables of the current run (`ref_name`, `tag`, `semver`, `event`,
//! `registry`, plus anything the caller adds) to the definition script, so a
//! matrix can be computed from them, e.g. adding a debug target only on main.

use crate::module::SlipwayModule;
use mlua::prelude::*;
use slipway_core::RunVars;
use std::sync::Arc;

/// Source of the variables visible through `env`
pub trait VarProvider: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn keys(&self) -> Vec<String>;
}

impl VarProvider for RunVars {
    fn get(&self, name: &str) -> Option<String> {
        RunVars::get(self, name).map(str::to_string)
    }

    fn keys(&self) -> Vec<String> {
        self.iter().map(|(k, _)| k.to_string()).collect()
    }
}

/// Environment module, generic over its provider
pub struct EnvModule<V: VarProvider> {
    provider: Arc<V>,
}

impl<V: VarProvider> EnvModule<V> {
    pub fn new(provider: V) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

impl<V: VarProvider + 'static> SlipwayModule for EnvModule<V> {
    fn id(&self) -> &'static str {
        "env"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let env_table = lua.create_table()?;

        // env.get(name, default?)
        {
            let provider = self.provider.clone();
            env_table.set(
                "get",
                lua.create_function(move |_, (name, default): (String, Option<String>)| {
                    Ok(provider.get(&name).or(default))
                })?,
            )?;
        }

        // env.require(name)
        {
            let provider = self.provider.clone();
            env_table.set(
                "require",
                lua.create_function(move |_, name: String| {
                    provider.get(&name).ok_or_else(|| {
                        LuaError::RuntimeError(format!(
                            "Required run variable '{}' is not set",
                            name
                        ))
                    })
                })?,
            )?;
        }

        // env.has(name)
        {
            let provider = self.provider.clone();
            env_table.set(
                "has",
                lua.create_function(move |_, name: String| Ok(provider.get(&name).is_some()))?,
            )?;
        }

        // env.all()
        {
            let provider = self.provider.clone();
            env_table.set(
                "all",
                lua.create_function(move |lua, ()| {
                    let table = lua.create_table()?;
                    for key in provider.keys() {
                        if let Some(value) = provider.get(&key) {
                            table.set(key, value)?;
                        }
                    }
                    Ok(table)
                })?,
            )?;
        }

        lua.globals().set(self.id(), env_table)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---Variables of the current run (ref_name, tag, semver, event, registry, ...)
---@class env
env = {}

---Get a run variable, or `default` when it is not set
---@param name string
---@param default? string
---@return string?
function env.get(name, default) end

---Get a run variable, raising an error when it is not set
---@param name string
---@return string
function env.require(name) end

---@param name string
---@return boolean
function env.has(name) end

---@return table<string, string>
function env.all() end
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::domain::event::TriggerEvent;

    fn lua_with_vars() -> Lua {
        let lua = Lua::new();
        let vars = RunVars::for_run("main", "0.0.0", TriggerEvent::Push, "ghcr.io/org");
        EnvModule::new(vars).register(&lua).unwrap();
        lua
    }

    #[test]
    fn test_env_get() {
        let lua = lua_with_vars();

        let result: String = lua.load(r#"return env.get("ref_name")"#).eval().unwrap();
        assert_eq!(result, "main");

        let result: String = lua
            .load(r#"return env.get("missing", "fallback")"#)
            .eval()
            .unwrap();
        assert_eq!(result, "fallback");

        let result: Option<String> = lua.load(r#"return env.get("missing")"#).eval().unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_env_require() {
        let lua = lua_with_vars();

        let result: String = lua.load(r#"return env.require("semver")"#).eval().unwrap();
        assert_eq!(result, "0.0.0");

        let result: LuaResult<String> = lua.load(r#"return env.require("missing")"#).eval();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Required run variable 'missing'")
        );
    }

    #[test]
    fn test_env_has_and_all() {
        let lua = lua_with_vars();

        let has: bool = lua.load(r#"return env.has("event")"#).eval().unwrap();
        assert!(has);
        let has: bool = lua.load(r#"return env.has("nope")"#).eval().unwrap();
        assert!(!has);

        let registry: String = lua.load(r#"return env.all().registry"#).eval().unwrap();
        assert_eq!(registry, "ghcr.io/org");
    }

    #[test]
    fn test_run_vars_provider_keys() {
        let vars = RunVars::new().with("a", "1").with("b", "2");
        let mut keys = VarProvider::keys(&vars);
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(VarProvider::get(&vars, "a"), Some("1".to_string()));
    }
}
