//! Release definition loader
//!
//! Evaluates a Lua release definition in the sandbox and converts the
//! returned table into a validated [`ReleaseDefinition`].
//!
//! ```lua
//! return release.define {
//!     name = "selkies-gstreamer",
//!     registry = "ghcr.io/selkies-project/selkies-gstreamer",
//!     components = {
//!         release.target {
//!             name = "gstreamer",
//!             source_directory = "addons/gstreamer",
//!             build_args = { "UBUNTU_RELEASE=22.04", release.arg("PACKAGE_VERSION", "${semver}") },
//!             version_suffix = "-ubuntu22.04",
//!         },
//!     },
//!     examples = {
//!         release.target { name = "gst-py-example", source_directory = "addons/example" },
//!     },
//!     assets = {
//!         release.asset {
//!             id = "gst-web",
//!             image_tag = "${registry}/gst-web:${ref_name}",
//!             source_path = "/opt/gst-web",
//!             mimetype = "application/x-gzip",
//!             target_directory = "dist",
//!             target_name = "gst-web_${semver}.tar.gz",
//!         },
//!     },
//! }
//! ```

use anyhow::{Context, Result};
use mlua::{Table, Value};
use slipway_core::RunVars;
use slipway_core::domain::asset::ReleaseAsset;
use slipway_core::domain::target::{BuildArg, BuildTarget, DEFAULT_DOCKERFILE};

pub use slipway_core::domain::definition::{DefinitionError, ReleaseDefinition};

use crate::module::ModuleRegistry;
use crate::sandbox::create_sandbox;

const DEFAULT_MIMETYPE: &str = "application/octet-stream";
const DEFAULT_TARGET_DIRECTORY: &str = ".";

/// Loads a definition with `log` forwarded to tracing and `env` bound to `vars`
pub fn load_definition_with_vars(source: &str, vars: &RunVars) -> Result<ReleaseDefinition> {
    load_definition(source, &ModuleRegistry::for_run(vars.clone()))
}

/// Evaluates `source` with the given modules installed and validates the result
///
/// # Errors
/// Returns an error if:
/// - The Lua source is invalid or does not return a table
/// - A required field is missing or has the wrong type
/// - The definition fails [`ReleaseDefinition::validate`]
pub fn load_definition(source: &str, modules: &ModuleRegistry) -> Result<ReleaseDefinition> {
    let lua = create_sandbox().context("Failed to create definition sandbox")?;
    modules
        .install(&lua)
        .context("Failed to register definition modules")?;

    let table: Table = lua
        .load(source)
        .set_name("release")
        .eval()
        .context("Failed to evaluate release definition")?;

    let definition = parse_definition(&table)?;
    definition.validate()?;
    Ok(definition)
}

fn parse_definition(table: &Table) -> Result<ReleaseDefinition> {
    let name: String = table
        .get("name")
        .context("Definition must have a 'name' field")?;
    let registry: Option<String> = table
        .get("registry")
        .context("Field 'registry' must be a string")?;

    let components = parse_targets(table, "components")?;
    let examples = parse_targets(table, "examples")?;
    let assets = parse_assets(table)?;

    Ok(ReleaseDefinition {
        name,
        registry,
        components,
        examples,
        assets,
    })
}

/// Reads an optional array field, treating nil as empty
fn optional_array(table: &Table, field: &str) -> Result<Option<Table>> {
    match table.get::<Value>(field)? {
        Value::Nil => Ok(None),
        Value::Table(t) => Ok(Some(t)),
        _ => Err(anyhow::anyhow!("Field '{}' must be an array", field)),
    }
}

fn string_list(table: &Table, field: &str, owner: &str) -> Result<Option<Vec<String>>> {
    let Some(list) = optional_array(table, field)? else {
        return Ok(None);
    };
    let mut values = Vec::new();
    for entry in list.sequence_values::<String>() {
        values.push(entry.with_context(|| {
            format!("Field '{}' of '{}' must contain only strings", field, owner)
        })?);
    }
    Ok(Some(values))
}

fn parse_targets(table: &Table, field: &str) -> Result<Vec<BuildTarget>> {
    let Some(list) = optional_array(table, field)? else {
        return Ok(Vec::new());
    };

    let mut targets = Vec::new();
    for (idx, entry) in list.sequence_values::<Table>().enumerate() {
        let entry = entry.with_context(|| format!("Entry {} of '{}' must be a table", idx + 1, field))?;
        targets.push(parse_target(&entry, field, idx)?);
    }
    Ok(targets)
}

fn parse_target(entry: &Table, field: &str, idx: usize) -> Result<BuildTarget> {
    let name: String = entry
        .get("name")
        .with_context(|| format!("Entry {} of '{}' must have a 'name' field", idx + 1, field))?;
    let source_directory: String = entry
        .get("source_directory")
        .with_context(|| format!("Target '{}' must have a 'source_directory' field", name))?;
    let dockerfile: Option<String> = entry
        .get("dockerfile")
        .with_context(|| format!("Target '{}': 'dockerfile' must be a string", name))?;
    let version_suffix: Option<String> = entry
        .get("version_suffix")
        .with_context(|| format!("Target '{}': 'version_suffix' must be a string", name))?;

    let build_args = string_list(entry, "build_args", &name)?
        .unwrap_or_default()
        .iter()
        .map(|pair| {
            BuildArg::parse(pair).ok_or_else(|| {
                anyhow::anyhow!(
                    "Target '{}': build arg '{}' must have the form KEY=value",
                    name,
                    pair
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let needs = string_list(entry, "needs", &name)?;
    let smoke_test = string_list(entry, "smoke_test", &name)?;

    Ok(BuildTarget {
        dockerfile: dockerfile.unwrap_or_else(|| DEFAULT_DOCKERFILE.to_string()),
        version_suffix: version_suffix.unwrap_or_default(),
        name,
        source_directory,
        build_args,
        needs,
        smoke_test,
    })
}

fn parse_assets(table: &Table) -> Result<Vec<ReleaseAsset>> {
    let Some(list) = optional_array(table, "assets")? else {
        return Ok(Vec::new());
    };

    let mut assets = Vec::new();
    for (idx, entry) in list.sequence_values::<Table>().enumerate() {
        let entry = entry.with_context(|| format!("Entry {} of 'assets' must be a table", idx + 1))?;

        let id: String = entry
            .get("id")
            .with_context(|| format!("Asset {} must have an 'id' field", idx + 1))?;
        let required = |field: &str| -> Result<String> {
            entry
                .get::<String>(field)
                .with_context(|| format!("Asset '{}' must have a '{}' field", id, field))
        };
        let image_tag = required("image_tag")?;
        let source_path = required("source_path")?;
        let target_name = required("target_name")?;

        let mimetype: Option<String> = entry
            .get("mimetype")
            .with_context(|| format!("Asset '{}': 'mimetype' must be a string", id))?;
        let target_directory: Option<String> = entry
            .get("target_directory")
            .with_context(|| format!("Asset '{}': 'target_directory' must be a string", id))?;

        assets.push(ReleaseAsset {
            id,
            image_tag,
            source_path,
            mimetype: mimetype.unwrap_or_else(|| DEFAULT_MIMETYPE.to_string()),
            target_directory: target_directory
                .unwrap_or_else(|| DEFAULT_TARGET_DIRECTORY.to_string()),
            target_name,
        });
    }
    Ok(assets)
}
