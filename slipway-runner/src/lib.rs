//! Slipway Runner
//!
//! Executes a release definition for one trigger event.
//!
//! Architecture:
//! - Configuration: run settings from the CI environment or the CLI
//! - Engine: container engine CLI behind the [`ContainerEngine`] trait
//! - Services: build/publish images, extract assets, upload assets
//! - Scheduler: bounded fan-out over the units of a stage
//! - Pipeline: stage ordering, barriers and blocking
//!
//! Runs are stateless. Nothing is kept between runs except the images and
//! release assets they publish.

pub mod archive;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use engine::{CliEngine, ContainerEngine};
pub use pipeline::Pipeline;

use anyhow::{Context, Result};
use slipway_client::{ReleaseClient, ReleaseStore};
use slipway_core::domain::run::PipelineRun;
use slipway_core::{PipelinePlan, PlanOptions, RunVars, derive_semver};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::registry_host;
use crate::service::{EngineAssetService, EngineImageService, ReleasePublisher};

/// Loads the definition named by `config` and plans the run
///
/// `extra_vars` are visible to the definition through `env` in addition
/// to the standard run variables.
pub fn load_plan(config: &Config, extra_vars: &[(String, String)]) -> Result<PipelinePlan> {
    let path = config.definition_file();
    let source = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read release definition {}", path.display()))?;

    let semver = derive_semver(&config.ref_name);
    let mut vars = RunVars::for_run(&config.ref_name, &semver, config.event, &config.registry);
    for (key, value) in extra_vars {
        vars.insert(key.as_str(), value.as_str());
    }

    let definition = slipway_lua::load_definition_with_vars(&source, &vars)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    info!(
        "Loaded definition {}: {} component(s), {} example(s), {} asset(s)",
        definition.name,
        definition.components.len(),
        definition.examples.len(),
        definition.assets.len()
    );

    let plan = PipelinePlan::build(
        &definition,
        &config.ref_name,
        config.event,
        PlanOptions {
            registry: &config.registry,
            main_branch: &config.main_branch,
        },
    )?;
    Ok(plan)
}

/// Release store for the configured repository, if any
pub fn release_store(config: &Config) -> Option<Arc<dyn ReleaseStore>> {
    let repository = config.repository.as_deref()?;
    let mut client = ReleaseClient::new(config.api_url.as_str(), repository);
    if let Some(token) = &config.release_token {
        client = client.with_token(token.as_str());
    }
    Some(Arc::new(client))
}

/// Plans and executes a run with the engine and store named by `config`
pub async fn run(config: &Config, extra_vars: &[(String, String)]) -> Result<PipelineRun> {
    let plan = load_plan(config, extra_vars)?;
    let engine: Arc<dyn ContainerEngine> = Arc::new(CliEngine::new(config.engine.as_str()));
    execute_plan(config, &plan, engine, release_store(config)).await
}

/// Executes an already planned run
///
/// Checks the engine, logs into the registry when a token is configured
/// and pushing is enabled, runs every stage and writes the report.
pub async fn execute_plan(
    config: &Config,
    plan: &PipelinePlan,
    engine: Arc<dyn ContainerEngine>,
    store: Option<Arc<dyn ReleaseStore>>,
) -> Result<PipelineRun> {
    let check = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || check.check_available())
        .await
        .context("Engine check task failed")?
        .context("Container engine is not available")?;

    if config.push {
        if let Some(token) = config.registry_token.clone() {
            let host = registry_host(&plan.registry).to_string();
            let user = config.registry_user.clone();
            let login = Arc::clone(&engine);
            tokio::task::spawn_blocking(move || login.login(&host, &user, &token))
                .await
                .context("Registry login task failed")?
                .context("Registry login failed")?;
        } else {
            debug!("No registry token configured, skipping login");
        }
    }

    let images = Arc::new(EngineImageService::new(
        Arc::clone(&engine),
        config.work_dir.clone(),
        config.push,
    ));
    let assets = Arc::new(EngineAssetService::new(engine, config.work_dir.clone()));
    let publisher = store.map(ReleasePublisher::new);

    let pipeline = Pipeline::new(images, assets, publisher, config.max_parallel_units);
    let run = pipeline.execute(plan).await;

    if let Some(path) = &config.report_path {
        report::write_report(&run, path)?;
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, FakePath};
    use slipway_core::domain::event::TriggerEvent;
    use slipway_core::domain::run::{StageKind, UnitStatus};
    use std::fs;

    const DEFINITION: &str = r#"
        local suffix = env.get("SUFFIX", "")
        return release.define {
            name = "selkies",
            registry = "ghcr.io/org",
            components = {
                release.target {
                    name = "gstreamer",
                    source_directory = "addons/gstreamer",
                    build_args = { release.arg("PACKAGE_VERSION", "${semver}") },
                    version_suffix = suffix,
                },
            },
            examples = {
                release.target { name = "example", source_directory = "addons/example" },
            },
            assets = {
                release.asset {
                    id = "web",
                    image_tag = "${registry}/gstreamer:${ref_name}",
                    source_path = "/opt/gst-web",
                    target_directory = "dist",
                    target_name = "gst-web_${semver}.tgz",
                },
            },
        }
    "#;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("release.lua"), DEFINITION).unwrap();
        dir
    }

    #[test]
    fn test_load_plan() {
        let dir = workspace();
        let config = Config::new("v2.0.1", TriggerEvent::Release)
            .with_repository("org/repo")
            .with_work_dir(dir.path());

        let plan = load_plan(&config, &[("SUFFIX".to_string(), "-jammy".to_string())]).unwrap();

        assert_eq!(plan.semver, "2.0.1");
        assert_eq!(
            plan.components[0].references,
            vec!["ghcr.io/org/gstreamer:v2.0.1-jammy"]
        );
        assert_eq!(plan.components[0].build_args[0].value, "2.0.1");
        assert_eq!(plan.assets[0].asset.target_name, "gst-web_2.0.1.tgz");
    }

    #[test]
    fn test_load_plan_missing_definition() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_work_dir(dir.path());
        let err = load_plan(&config, &[]).unwrap_err();
        assert!(err.to_string().contains("Failed to read release definition"));
    }

    #[test]
    fn test_release_store_requires_repository() {
        assert!(release_store(&Config::default()).is_none());
        assert!(release_store(&Config::default().with_repository("org/repo")).is_some());
    }

    #[tokio::test]
    async fn test_execute_plan_logs_in_and_reports() {
        let dir = workspace();
        let mut config = Config::new("main", TriggerEvent::Push)
            .with_work_dir(dir.path())
            .with_registry_credentials("octocat", "token");
        config.report_path = Some(dir.path().join("out").join("report.json"));

        let plan = load_plan(&config, &[]).unwrap();
        let engine = Arc::new(FakeEngine::default());
        let run = execute_plan(&config, &plan, engine.clone(), None).await.unwrap();

        let calls = engine.calls();
        assert_eq!(calls[0], "version");
        assert_eq!(calls[1], "login ghcr.io octocat");
        assert!(calls.contains(&"push ghcr.io/org/gstreamer:latest".to_string()));

        // Pushes only build images
        for kind in [StageKind::Assets, StageKind::Publish] {
            assert_eq!(
                run.stage(kind).unwrap().units[0].status,
                UnitStatus::Skipped
            );
        }
        assert!(!calls.iter().any(|c| c.starts_with("create") || c.starts_with("pull")));
        assert!(run.succeeded());
        assert!(dir.path().join("out/report.json").is_file());
    }

    #[tokio::test]
    async fn test_execute_plan_release_extracts_assets() {
        let dir = workspace();
        let config = Config::new("v2.0.1", TriggerEvent::Release)
            .with_repository("org/repo")
            .with_work_dir(dir.path());

        let plan = load_plan(&config, &[]).unwrap();
        let engine = Arc::new(
            FakeEngine::default().with_path("/opt/gst-web", FakePath::File(b"bundle".to_vec())),
        );
        let run = execute_plan(&config, &plan, engine.clone(), None).await.unwrap();

        assert!(engine.calls().contains(&"pull ghcr.io/org/gstreamer:v2.0.1".to_string()));
        assert_eq!(
            run.stage(StageKind::Assets).unwrap().units[0].status,
            UnitStatus::Succeeded
        );
        assert_eq!(
            fs::read(dir.path().join("dist/gst-web_2.0.1.tgz")).unwrap(),
            b"bundle"
        );
        // No store was handed in
        assert_eq!(
            run.stage(StageKind::Publish).unwrap().units[0].status,
            UnitStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_execute_plan_dry_run_skips_login() {
        let dir = workspace();
        let config = Config::new("main", TriggerEvent::Push)
            .with_work_dir(dir.path())
            .with_registry_credentials("octocat", "token")
            .with_push(false);

        let plan = load_plan(&config, &[]).unwrap();
        let engine = Arc::new(FakeEngine::default());
        execute_plan(&config, &plan, engine.clone(), None).await.unwrap();

        let calls = engine.calls();
        assert!(!calls.iter().any(|c| c.starts_with("login") || c.starts_with("push")));
    }

    #[tokio::test]
    async fn test_unavailable_engine_aborts() {
        let dir = workspace();
        let config = Config::new("main", TriggerEvent::Push).with_work_dir(dir.path());
        let plan = load_plan(&config, &[]).unwrap();
        let engine = Arc::new(FakeEngine::default().failing("version"));

        let err = execute_plan(&config, &plan, engine, None).await.unwrap_err();
        assert!(err.to_string().contains("Container engine is not available"));
    }
}
