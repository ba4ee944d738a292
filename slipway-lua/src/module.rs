use mlua::prelude::*;
use slipway_core::RunVars;

use crate::modules::{EnvModule, LogModule, ReleaseModule, TracingLogSink};

/// A global table exposed to release definition scripts
///
/// The table is installed under the module's `id()`, which must be a valid
/// Lua identifier and unique within a registry.
///
/// # Example
///
/// ```rust
/// use slipway_lua::module::SlipwayModule;
/// use mlua::prelude::*;
///
/// struct HostModule;
///
/// impl SlipwayModule for HostModule {
///     fn id(&self) -> &'static str {
///         "host"
///     }
///
///     fn register(&self, lua: &Lua) -> LuaResult<()> {
///         let table = lua.create_table()?;
///         table.set("arch", std::env::consts::ARCH)?;
///         lua.globals().set(self.id(), table)
///     }
///
///     fn stubs(&self) -> String {
///         "---@meta\n---@class host\n---@field arch string\nhost = {}\n".to_string()
///     }
/// }
/// ```
pub trait SlipwayModule: Send + Sync {
    fn id(&self) -> &'static str;

    /// Installs the module table into `lua`
    fn register(&self, lua: &Lua) -> LuaResult<()>;

    /// Lua Language Server annotations, starting with `---@meta`
    fn stubs(&self) -> String;
}

/// Modules installed into a definition sandbox, in registration order
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn SlipwayModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The modules a run installs: `log` forwarded to tracing and `env`
    /// bound to the run variables
    pub fn for_run(vars: RunVars) -> Self {
        let mut registry = Self::new();
        registry.register(LogModule::new(TracingLogSink));
        registry.register(EnvModule::new(vars));
        registry
    }

    /// Adds a module
    ///
    /// # Panics
    /// Panics if a module with the same id is already registered, or if the
    /// id is `release`, which the sandbox always provides
    pub fn register<M: SlipwayModule + 'static>(&mut self, module: M) {
        let id = module.id();
        assert!(
            id != ReleaseModule.id(),
            "Module id '{}' is reserved by the sandbox",
            id
        );
        assert!(
            !self.ids().contains(&id),
            "Module with id '{}' is already registered",
            id
        );
        self.modules.push(Box::new(module));
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn modules(&self) -> &[Box<dyn SlipwayModule>] {
        &self.modules
    }

    /// Installs every module into `lua`, stopping at the first error
    pub fn install(&self, lua: &Lua) -> LuaResult<()> {
        self.modules.iter().try_for_each(|m| m.register(lua))
    }

    /// Stub file name and content for every global a definition can see,
    /// the sandbox's `release` helpers first
    pub fn stub_files(&self) -> Vec<(String, String)> {
        let release: &dyn SlipwayModule = &ReleaseModule;
        std::iter::once(release)
            .chain(self.modules.iter().map(|m| m.as_ref()))
            .map(|m| (format!("{}.lua", m.id()), m.stubs()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CounterModule;

    impl SlipwayModule for CounterModule {
        fn id(&self) -> &'static str {
            "counter"
        }

        fn register(&self, lua: &Lua) -> LuaResult<()> {
            let table = lua.create_table()?;
            table.set("start", 42)?;
            lua.globals().set(self.id(), table)
        }

        fn stubs(&self) -> String {
            "---@meta\ncounter = {}\n".to_string()
        }
    }

    #[test]
    fn test_for_run_installs_log_and_env() {
        let registry = ModuleRegistry::for_run(RunVars::new().with("semver", "1.0.0"));
        assert_eq!(registry.ids(), vec!["log", "env"]);

        let lua = Lua::new();
        registry.install(&lua).unwrap();
        let semver: String = lua.load("return env.get('semver')").eval().unwrap();
        assert_eq!(semver, "1.0.0");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration() {
        let mut registry = ModuleRegistry::new();
        registry.register(CounterModule);
        registry.register(CounterModule);
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn test_release_id_is_reserved() {
        ModuleRegistry::new().register(ReleaseModule);
    }

    #[test]
    fn test_install_custom_module() {
        let mut registry = ModuleRegistry::new();
        registry.register(CounterModule);

        let lua = Lua::new();
        registry.install(&lua).unwrap();
        let value: i32 = lua.load("return counter.start").eval().unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_stub_files_include_release_helpers() {
        let mut registry = ModuleRegistry::for_run(RunVars::new());
        registry.register(CounterModule);

        let names: Vec<String> = registry.stub_files().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["release.lua", "log.lua", "env.lua", "counter.lua"]);
    }
}
