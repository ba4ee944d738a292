//! Runner configuration
//!
//! Everything the CI platform used to hand the pipeline as ambient
//! environment (ref name, event, actor, secrets) is collected into one
//! explicit struct before the run starts.

use anyhow::Context;
use slipway_core::domain::event::TriggerEvent;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_ENGINE: &str = "docker";
pub const DEFAULT_DEFINITION: &str = "release.lua";

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Branch or tag name the run was triggered for
    pub ref_name: String,

    pub event: TriggerEvent,

    /// Pushes to this branch also publish `latest` tags
    pub main_branch: String,

    /// Registry prefix; overrides the definition's registry when non-empty
    pub registry: String,

    /// Account used for `login` (usually the triggering actor)
    pub registry_user: String,

    /// Registry credential; no login is attempted without it
    pub registry_token: Option<String>,

    /// `owner/name` of the repository owning the releases
    pub repository: Option<String>,

    /// Releases API base URL
    pub api_url: String,

    /// Releases API credential
    pub release_token: Option<String>,

    /// Container engine binary (`docker` or `podman`)
    pub engine: String,

    /// Path of the Lua release definition
    pub definition_path: PathBuf,

    /// Build contexts and asset target directories are relative to this
    pub work_dir: PathBuf,

    /// Upper bound on concurrently running units within a stage
    pub max_parallel_units: usize,

    /// When false images are built and tagged locally but never pushed
    pub push: bool,

    /// Where to write the JSON run report, if anywhere
    pub report_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(ref_name: impl Into<String>, event: TriggerEvent) -> Self {
        Self {
            ref_name: ref_name.into(),
            event,
            main_branch: "main".to_string(),
            registry: String::new(),
            registry_user: String::new(),
            registry_token: None,
            repository: None,
            api_url: DEFAULT_API_URL.to_string(),
            release_token: None,
            engine: DEFAULT_ENGINE.to_string(),
            definition_path: PathBuf::from(DEFAULT_DEFINITION),
            work_dir: PathBuf::from("."),
            max_parallel_units: 4,
            push: true,
            report_path: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SLIPWAY_REF_NAME or GITHUB_REF_NAME (required)
    /// - SLIPWAY_EVENT or GITHUB_EVENT_NAME (optional, default: workflow_dispatch)
    /// - SLIPWAY_MAIN_BRANCH (optional, default: main)
    /// - SLIPWAY_REGISTRY (optional)
    /// - SLIPWAY_REGISTRY_USER or GITHUB_ACTOR (optional)
    /// - SLIPWAY_REGISTRY_TOKEN or GITHUB_TOKEN (optional)
    /// - GITHUB_REPOSITORY (required for release events)
    /// - GITHUB_API_URL (optional, default: https://api.github.com)
    /// - GITHUB_TOKEN (optional, used for release uploads)
    /// - SLIPWAY_ENGINE (optional, default: docker)
    /// - SLIPWAY_DEFINITION (optional, default: release.lua)
    /// - SLIPWAY_WORK_DIR (optional, default: .)
    /// - SLIPWAY_MAX_PARALLEL (optional, default: 4)
    /// - SLIPWAY_PUSH (optional, default: true)
    /// - SLIPWAY_REPORT (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], falling back to [`Config::default`] when
    /// the environment is incomplete, except inside CI
    pub fn from_env_or_default() -> anyhow::Result<Self> {
        Self::from_lookup_or_default(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env_or_default`] with an arbitrary variable source
    ///
    /// With `CI` set a missing or bad variable is an error: a misconfigured
    /// release job must not pass as a dry build of the main branch.
    pub fn from_lookup_or_default<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let in_ci = lookup("CI").and_then(|v| parse_bool(&v)).unwrap_or(false);
        match Self::from_lookup(&lookup) {
            Ok(config) => Ok(config),
            Err(e) if in_ci => Err(e.context("Incomplete CI environment")),
            Err(e) => {
                warn!("Failed to load config from environment ({:#}), using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .find(|value| !value.trim().is_empty())
        };

        let ref_name = var(&["SLIPWAY_REF_NAME", "GITHUB_REF_NAME"]).ok_or_else(|| {
            anyhow::anyhow!("SLIPWAY_REF_NAME or GITHUB_REF_NAME environment variable not set")
        })?;

        let event = match var(&["SLIPWAY_EVENT", "GITHUB_EVENT_NAME"]) {
            Some(name) => name.parse::<TriggerEvent>()?,
            None => TriggerEvent::ManualDispatch,
        };

        let mut config = Self::new(ref_name, event);

        if let Some(branch) = var(&["SLIPWAY_MAIN_BRANCH"]) {
            config.main_branch = branch;
        }
        if let Some(registry) = var(&["SLIPWAY_REGISTRY"]) {
            config.registry = registry;
        }
        if let Some(user) = var(&["SLIPWAY_REGISTRY_USER", "GITHUB_ACTOR"]) {
            config.registry_user = user;
        }
        config.registry_token = var(&["SLIPWAY_REGISTRY_TOKEN", "GITHUB_TOKEN"]);
        config.repository = var(&["GITHUB_REPOSITORY"]);
        if let Some(api_url) = var(&["GITHUB_API_URL"]) {
            config.api_url = api_url;
        }
        config.release_token = var(&["GITHUB_TOKEN"]);
        if let Some(engine) = var(&["SLIPWAY_ENGINE"]) {
            config.engine = engine;
        }
        if let Some(path) = var(&["SLIPWAY_DEFINITION"]) {
            config.definition_path = PathBuf::from(path);
        }
        if let Some(dir) = var(&["SLIPWAY_WORK_DIR"]) {
            config.work_dir = PathBuf::from(dir);
        }
        if let Some(max) = var(&["SLIPWAY_MAX_PARALLEL"]) {
            config.max_parallel_units = max
                .trim()
                .parse()
                .with_context(|| format!("SLIPWAY_MAX_PARALLEL is not a number: '{}'", max))?;
        }
        if let Some(push) = var(&["SLIPWAY_PUSH"]) {
            config.push = parse_bool(&push)
                .ok_or_else(|| anyhow::anyhow!("SLIPWAY_PUSH is not a boolean: '{}'", push))?;
        }
        config.report_path = var(&["SLIPWAY_REPORT"]).map(PathBuf::from);

        Ok(config)
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_registry_credentials(
        mut self,
        user: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.registry_user = user.into();
        self.registry_token = Some(token.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Resolves the definition path against the work directory
    pub fn definition_file(&self) -> PathBuf {
        self.work_dir.join(&self.definition_path)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ref_name.trim().is_empty() {
            anyhow::bail!("ref_name cannot be empty");
        }

        if self.main_branch.trim().is_empty() {
            anyhow::bail!("main_branch cannot be empty");
        }

        if self.engine.trim().is_empty() {
            anyhow::bail!("engine cannot be empty");
        }

        if self.max_parallel_units == 0 {
            anyhow::bail!("max_parallel_units must be greater than 0");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.event.publishes_assets() && self.repository.is_none() {
            anyhow::bail!("a repository is required to publish release assets");
        }

        Ok(())
    }
}

/// Falls back to a local dry build of the main branch
impl Default for Config {
    fn default() -> Self {
        Self::new("main", TriggerEvent::ManualDispatch).with_push(false)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_ref_falls_back_outside_ci() {
        let config = Config::from_lookup_or_default(lookup(&[])).unwrap();
        assert_eq!(config.ref_name, "main");
        assert_eq!(config.event, TriggerEvent::ManualDispatch);
        assert!(!config.push);
    }

    #[test]
    fn test_missing_ref_fails_in_ci() {
        let err = Config::from_lookup_or_default(lookup(&[
            ("CI", "true"),
            ("GITHUB_EVENT_NAME", "release"),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Incomplete CI environment"));

        let config = Config::from_lookup_or_default(lookup(&[
            ("CI", "true"),
            ("GITHUB_REF_NAME", "v1.0.0"),
        ]))
        .unwrap();
        assert_eq!(config.ref_name, "v1.0.0");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ref_name, "main");
        assert_eq!(config.engine, "docker");
        assert_eq!(config.max_parallel_units, 4);
        assert!(!config.push);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_github_variables() {
        let config = Config::from_lookup(lookup(&[
            ("GITHUB_REF_NAME", "v1.2.3"),
            ("GITHUB_EVENT_NAME", "release"),
            ("GITHUB_REPOSITORY", "org/repo"),
            ("GITHUB_ACTOR", "octocat"),
            ("GITHUB_TOKEN", "ghs_x"),
            ("SLIPWAY_REGISTRY", "ghcr.io/org"),
        ]))
        .unwrap();

        assert_eq!(config.ref_name, "v1.2.3");
        assert_eq!(config.event, TriggerEvent::Release);
        assert_eq!(config.repository.as_deref(), Some("org/repo"));
        assert_eq!(config.registry_user, "octocat");
        assert_eq!(config.registry_token.as_deref(), Some("ghs_x"));
        assert_eq!(config.release_token.as_deref(), Some("ghs_x"));
        assert_eq!(config.registry, "ghcr.io/org");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.push);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_slipway_variables_take_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("SLIPWAY_REF_NAME", "main"),
            ("GITHUB_REF_NAME", "other"),
            ("SLIPWAY_EVENT", "push"),
            ("GITHUB_EVENT_NAME", "release"),
            ("SLIPWAY_MAX_PARALLEL", "8"),
            ("SLIPWAY_PUSH", "false"),
            ("SLIPWAY_ENGINE", "podman"),
            ("SLIPWAY_REPORT", "out/report.json"),
        ]))
        .unwrap();

        assert_eq!(config.ref_name, "main");
        assert_eq!(config.event, TriggerEvent::Push);
        assert_eq!(config.max_parallel_units, 8);
        assert!(!config.push);
        assert_eq!(config.engine, "podman");
        assert_eq!(config.report_path, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn test_from_lookup_errors() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("GITHUB_REF_NAME", "  ")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[
                ("GITHUB_REF_NAME", "main"),
                ("GITHUB_EVENT_NAME", "pull_request"),
            ]))
            .is_err()
        );
        assert!(
            Config::from_lookup(lookup(&[
                ("GITHUB_REF_NAME", "main"),
                ("SLIPWAY_MAX_PARALLEL", "many"),
            ]))
            .is_err()
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::new("main", TriggerEvent::Push);
        assert!(config.validate().is_ok());

        config.ref_name = String::new();
        assert!(config.validate().is_err());
        config.ref_name = "main".to_string();

        config.max_parallel_units = 0;
        assert!(config.validate().is_err());
        config.max_parallel_units = 1;

        config.api_url = "api.github.com".to_string();
        assert!(config.validate().is_err());
        config.api_url = DEFAULT_API_URL.to_string();

        config.event = TriggerEvent::Release;
        assert!(config.validate().is_err());
        config = config.with_repository("org/repo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_definition_file() {
        let config = Config::default().with_work_dir("/src/project");
        assert_eq!(
            config.definition_file(),
            PathBuf::from("/src/project/release.lua")
        );
    }
}
