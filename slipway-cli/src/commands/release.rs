//! Release command handlers
//!
//! `semver`, `validate`, `plan` and `run` all share the same run
//! arguments, which map onto the runner's [`Config`].

use anyhow::Result;
use clap::Args;
use colored::*;
use slipway_core::derive_semver;
use slipway_core::domain::event::TriggerEvent;
use slipway_core::domain::run::{PipelineRun, UnitStatus};
use slipway_core::plan::{PipelinePlan, PlannedImage};
use slipway_runner::config::{Config, DEFAULT_API_URL, DEFAULT_DEFINITION, DEFAULT_ENGINE};
use slipway_runner::report;
use std::path::PathBuf;
use tracing::debug;

/// Arguments describing the run being planned or executed
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the Lua release definition
    #[arg(short, long, env = "SLIPWAY_DEFINITION", default_value = DEFAULT_DEFINITION)]
    pub definition: PathBuf,

    /// Branch or tag name the run is for
    #[arg(long = "ref", env = "GITHUB_REF_NAME", default_value = "main")]
    pub ref_name: String,

    /// Trigger event (push, release, workflow_dispatch)
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "workflow_dispatch")]
    pub event: TriggerEvent,

    /// Pushes to this branch also publish `latest` tags
    #[arg(long, env = "SLIPWAY_MAIN_BRANCH", default_value = "main")]
    pub main_branch: String,

    /// Registry prefix, overriding the definition's registry
    #[arg(long, env = "SLIPWAY_REGISTRY", default_value = "")]
    pub registry: String,

    /// Registry account
    #[arg(long, env = "GITHUB_ACTOR", default_value = "")]
    pub registry_user: String,

    /// Registry credential (falls back to the releases token)
    #[arg(long, env = "SLIPWAY_REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Repository owning the releases (owner/name)
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Releases API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Releases API credential
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Container engine binary
    #[arg(long, env = "SLIPWAY_ENGINE", default_value = DEFAULT_ENGINE)]
    pub engine: String,

    /// Working directory for build contexts and asset output
    #[arg(short = 'C', long, env = "SLIPWAY_WORK_DIR", default_value = ".")]
    pub work_dir: PathBuf,

    /// Extra definition variables as key=value pairs (e.g. --var SUFFIX=-jammy)
    #[arg(long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,
}

impl RunArgs {
    /// Builds the runner configuration for these arguments
    pub fn to_config(&self) -> Config {
        let mut config = Config::new(self.ref_name.as_str(), self.event);
        config.main_branch = self.main_branch.clone();
        config.registry = self.registry.clone();
        config.registry_user = self.registry_user.clone();
        config.registry_token = self.registry_token.clone().or_else(|| self.token.clone());
        config.repository = self.repository.clone();
        config.api_url = self.api_url.clone();
        config.release_token = self.token.clone();
        config.engine = self.engine.clone();
        config.definition_path = self.definition.clone();
        config.work_dir = self.work_dir.clone();
        config
    }
}

/// Parse a single key=value pair
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    if pos == 0 {
        anyhow::bail!("invalid KEY=value: empty key in `{}`", s);
    }
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

pub fn print_semver(ref_name: &str) {
    println!("{}", derive_semver(ref_name));
}

/// Load and validate the definition
pub fn validate(args: &RunArgs) -> Result<()> {
    let config = args.to_config();
    let plan = slipway_runner::load_plan(&config, &args.vars)?;

    println!("{}", "✓ Release definition is valid".green().bold());
    println!("  Name:       {}", plan.name.bold());
    println!("  Components: {}", plan.components.len());
    println!("  Examples:   {}", plan.examples.len());
    println!("  Assets:     {}", plan.assets.len());
    Ok(())
}

/// Print the resolved plan
pub fn plan(args: &RunArgs, json: bool) -> Result<()> {
    let config = args.to_config();
    let plan = slipway_runner::load_plan(&config, &args.vars)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    print_plan(&plan);
    Ok(())
}

/// Execute a run and exit non-zero if it did not succeed
pub async fn run(
    args: &RunArgs,
    push: bool,
    max_parallel: usize,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = args.to_config().with_push(push);
    config.max_parallel_units = max_parallel;
    config.report_path = report_path;
    config.validate()?;
    debug!(
        "Running {} for {} ({}), push={}, max_parallel={}",
        config.definition_file().display(),
        config.ref_name,
        config.event,
        config.push,
        config.max_parallel_units
    );

    let run = slipway_runner::run(&config, &args.vars).await?;
    print_run(&run);

    if !run.succeeded() {
        std::process::exit(report::exit_code(&run));
    }
    Ok(())
}

fn yes_no(value: bool) -> ColoredString {
    if value { "yes".green() } else { "no".dimmed() }
}

fn print_plan(plan: &PipelinePlan) {
    println!(
        "{} @ {} (semver {}, event {})",
        plan.name.bold(),
        plan.ref_name.cyan(),
        plan.semver.cyan(),
        plan.event
    );
    let registry = if plan.registry.is_empty() {
        "(none)".to_string()
    } else {
        plan.registry.clone()
    };
    println!("  Registry:       {}", registry);
    println!("  Latest tags:    {}", yes_no(plan.latest));
    println!("  Publish assets: {}", yes_no(plan.publish_assets));

    print_images("Component images", &plan.components, false);
    print_images("Example images", &plan.examples, true);

    println!();
    println!("{}", "Assets".bold());
    if plan.assets.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for planned in &plan.assets {
        let asset = &planned.asset;
        println!("  {} {}", asset.id.cyan(), asset.image_tag);
        println!(
            "    {} -> {} {}",
            asset.source_path,
            planned.destination.display(),
            format!("({})", asset.mimetype).dimmed()
        );
    }
}

fn print_images(title: &str, images: &[PlannedImage], show_needs: bool) {
    println!();
    println!("{}", title.bold());
    if images.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for image in images {
        let needs = if show_needs {
            if image.needs.is_empty() {
                " (no dependencies)".to_string()
            } else {
                format!(" (needs {})", image.needs.join(", "))
            }
        } else {
            String::new()
        };
        println!("  {}{}", image.name().cyan(), needs.dimmed());
        for reference in &image.references {
            println!("    {}", reference);
        }
        for arg in &image.build_args {
            println!("    {} {}", "--build-arg".dimmed(), arg);
        }
        if let Some(command) = &image.target.smoke_test {
            println!("    {} {}", "smoke test:".dimmed(), command.join(" "));
        }
    }
}

fn print_run(run: &PipelineRun) {
    println!();
    for stage in &run.stages {
        println!("{}", stage.kind.as_str().bold());
        if stage.units.is_empty() {
            println!("  {}", "(no units)".dimmed());
        }
        for unit in &stage.units {
            let status = match unit.status {
                UnitStatus::Succeeded => "✓".green(),
                UnitStatus::Failed => "✗".red(),
                UnitStatus::Blocked => "■".yellow(),
                UnitStatus::Skipped => "-".dimmed(),
            };
            let detail = match &unit.message {
                Some(message) => message.dimmed().to_string(),
                None => unit.outputs.join(", ").dimmed().to_string(),
            };
            println!("  {} {} {}", status, unit.name, detail);
        }
    }

    println!();
    if run.succeeded() {
        println!("{}", "✓ Release run succeeded".green().bold());
    } else {
        println!("{}", "✗ Release run failed".red().bold());
    }
}
