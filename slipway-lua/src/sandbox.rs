//! Lua sandbox creation
//!
//! Release definitions are evaluated in a Lua state without I/O, OS or
//! package access. Only the `release` helpers are installed here; `log` and
//! `env` are registered by the caller through a `ModuleRegistry`.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

use crate::module::SlipwayModule;
use crate::modules::ReleaseModule;

/// Create a restricted Lua sandbox
///
/// Includes only the TABLE, STRING, MATH and UTF8 standard libraries and
/// removes `require`, `dofile` and `loadfile`.
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8,
        LuaOptions::default(),
    )?;

    let globals = lua.globals();
    globals.set("require", mlua::Nil)?;
    globals.set("dofile", mlua::Nil)?;
    globals.set("loadfile", mlua::Nil)?;

    ReleaseModule.register(&lua)?;

    Ok(lua)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_basic_lua() {
        let lua = create_sandbox().unwrap();

        let result: i32 = lua
            .load(
                r#"
                local t = {a = 1, b = 2}
                return t.a + t.b
            "#,
            )
            .eval()
            .unwrap();
        assert_eq!(result, 3);

        let result: String = lua
            .load(r#"return string.format("%s-%s", "main", "ubuntu22.04")"#)
            .eval()
            .unwrap();
        assert_eq!(result, "main-ubuntu22.04");
    }

    #[test]
    fn test_sandbox_no_io() {
        let lua = create_sandbox().unwrap();

        let has_io: bool = lua.load(r#"return io ~= nil"#).eval().unwrap();
        assert!(!has_io);

        let has_os: bool = lua.load(r#"return os ~= nil"#).eval().unwrap();
        assert!(!has_os);
    }

    #[test]
    fn test_sandbox_no_require() {
        let lua = create_sandbox().unwrap();

        let result: LuaResult<()> = lua.load(r#"require("os")"#).exec();
        assert!(result.is_err());

        let result: LuaResult<()> = lua.load(r#"dofile("/etc/passwd")"#).exec();
        assert!(result.is_err());
    }

    #[test]
    fn test_sandbox_has_release_module_only() {
        let lua = create_sandbox().unwrap();

        let has_release: bool = lua.load(r#"return release ~= nil"#).eval().unwrap();
        assert!(has_release);

        let has_log: bool = lua.load(r#"return log ~= nil"#).eval().unwrap();
        assert!(!has_log);

        let has_env: bool = lua.load(r#"return env ~= nil"#).eval().unwrap();
        assert!(!has_env);
    }
}
