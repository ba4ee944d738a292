//! Declaration helpers for release definitions
//!
//! `release.define`, `release.target` and `release.asset` return their table
//! unchanged; they exist so definitions read declaratively and get editor
//! completion from the stubs. `release.arg` builds a `KEY=value` build arg.

use crate::module::SlipwayModule;
use mlua::prelude::*;

pub struct ReleaseModule;

impl SlipwayModule for ReleaseModule {
    fn id(&self) -> &'static str {
        "release"
    }

    fn register(&self, lua: &Lua) -> LuaResult<()> {
        let release = lua.create_table()?;

        for name in ["define", "target", "asset"] {
            release.set(
                name,
                lua.create_function(|_, definition: LuaTable| Ok(definition))?,
            )?;
        }

        release.set(
            "arg",
            lua.create_function(|_, (key, value): (String, String)| {
                if key.is_empty() || key.contains('=') {
                    return Err(LuaError::RuntimeError(format!(
                        "invalid build arg key '{}'",
                        key
                    )));
                }
                Ok(format!("{}={}", key, value))
            })?,
        )?;

        lua.globals().set(self.id(), release)?;
        Ok(())
    }

    fn stubs(&self) -> String {
        r#"---@meta

---@class BuildTarget
---@field name string Image name under the registry
---@field source_directory string Build context directory
---@field dockerfile? string Defaults to "Dockerfile"
---@field build_args? string[] Ordered KEY=value pairs, may reference ${semver}, ${ref_name}, ...
---@field version_suffix? string Appended to every tag, e.g. "-ubuntu22.04"
---@field needs? string[] Examples only: component targets this image depends on (default: all)
---@field smoke_test? string[] Command run in the built image before pushing

---@class ReleaseAsset
---@field id string
---@field image_tag string Full image reference, may reference ${registry} and ${ref_name}
---@field source_path string Path inside the image (file or directory)
---@field mimetype? string Defaults to "application/octet-stream"
---@field target_directory? string Defaults to "."
---@field target_name string File name of the asset

---@class ReleaseDefinition
---@field name string
---@field registry? string Default registry, overridden by configuration
---@field components BuildTarget[]
---@field examples? BuildTarget[]
---@field assets? ReleaseAsset[]

---Release definition helpers
---@class release
release = {}

---@param definition ReleaseDefinition
---@return ReleaseDefinition
function release.define(definition) end

---@param target BuildTarget
---@return BuildTarget
function release.target(target) end

---@param asset ReleaseAsset
---@return ReleaseAsset
function release.asset(asset) end

---@param key string
---@param value string
---@return string pair "KEY=value"
function release.arg(key, value) end
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_return_tables_unchanged() {
        let lua = Lua::new();
        ReleaseModule.register(&lua).unwrap();

        let name: String = lua
            .load(r#"return release.define({ name = "x" }).name"#)
            .eval()
            .unwrap();
        assert_eq!(name, "x");

        let source: String = lua
            .load(r#"return release.target({ source_directory = "images/a" }).source_directory"#)
            .eval()
            .unwrap();
        assert_eq!(source, "images/a");
    }

    #[test]
    fn test_arg_builds_pair() {
        let lua = Lua::new();
        ReleaseModule.register(&lua).unwrap();

        let pair: String = lua
            .load(r#"return release.arg("PKG_VERSION", "${semver}")"#)
            .eval()
            .unwrap();
        assert_eq!(pair, "PKG_VERSION=${semver}");

        let result: LuaResult<String> = lua.load(r#"return release.arg("", "x")"#).eval();
        assert!(result.is_err());
    }
}
