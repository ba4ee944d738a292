//! Run planning
//!
//! Resolves a definition against the variables of one run: image
//! references, substituted build args, asset image references and asset
//! file names. Planning has no side effects, so `slipway plan` can show
//! exactly what a run would do and substitution errors surface before any
//! image is built.

use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::asset::ReleaseAsset;
use crate::domain::definition::ReleaseDefinition;
use crate::domain::event::TriggerEvent;
use crate::domain::target::{BuildArg, BuildTarget};
use crate::tags::{image_references, publishes_latest};
use crate::vars::{RunVars, VarError, substitute};
use crate::version::derive_semver;

/// Errors produced while resolving a definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("target '{target}': build arg '{key}': {source}")]
    BuildArg {
        target: String,
        key: String,
        source: VarError,
    },

    #[error("asset '{asset}': image_tag: {source}")]
    AssetImage { asset: String, source: VarError },

    #[error("asset '{asset}': target_name: {source}")]
    AssetName { asset: String, source: VarError },

    #[error("asset '{asset}': target_name '{name}' must be a plain file name")]
    InvalidAssetName { asset: String, name: String },

    #[error("asset '{asset}' writes to {destination} which another asset already uses")]
    DuplicateDestination { asset: String, destination: String },
}

/// Run-level settings that are not part of the definition
#[derive(Debug, Clone, Copy)]
pub struct PlanOptions<'a> {
    /// Overrides the definition's registry when non-empty
    pub registry: &'a str,
    pub main_branch: &'a str,
}

/// A build target with everything resolved for this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedImage {
    pub target: BuildTarget,
    pub build_args: Vec<BuildArg>,
    /// Ref tag first, then `latest` when applicable
    pub references: Vec<String>,
    /// Component targets this image waits on
    pub needs: Vec<String>,
}

impl PlannedImage {
    pub fn name(&self) -> &str {
        &self.target.name
    }

    /// Reference used for the local build and the smoke test
    pub fn primary_reference(&self) -> &str {
        &self.references[0]
    }
}

/// A release asset with its image reference resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAsset {
    pub asset: ReleaseAsset,
    pub destination: PathBuf,
}

/// The fully resolved work of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelinePlan {
    pub name: String,
    pub ref_name: String,
    pub semver: String,
    pub event: TriggerEvent,
    pub registry: String,
    pub latest: bool,
    pub publish_assets: bool,
    pub components: Vec<PlannedImage>,
    pub examples: Vec<PlannedImage>,
    pub assets: Vec<PlannedAsset>,
}

impl PipelinePlan {
    /// Resolves a (validated) definition for one ref and trigger
    pub fn build(
        definition: &ReleaseDefinition,
        ref_name: &str,
        event: TriggerEvent,
        options: PlanOptions<'_>,
    ) -> Result<Self, PlanError> {
        let semver = derive_semver(ref_name);
        let registry = if options.registry.is_empty() {
            definition.registry.clone().unwrap_or_default()
        } else {
            options.registry.to_string()
        };
        let registry = registry.trim_end_matches('/').to_string();
        let latest = publishes_latest(event, ref_name, options.main_branch);
        let vars = RunVars::for_run(ref_name, &semver, event, &registry);

        let component_names: Vec<String> =
            definition.components.iter().map(|t| t.name.clone()).collect();

        let components = definition
            .components
            .iter()
            .map(|t| plan_image(t, Vec::new(), &vars, &registry, ref_name, latest))
            .collect::<Result<Vec<_>, _>>()?;

        let examples = definition
            .examples
            .iter()
            .map(|t| {
                let needs = component_names
                    .iter()
                    .filter(|c| t.depends_on(c))
                    .cloned()
                    .collect();
                plan_image(t, needs, &vars, &registry, ref_name, latest)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let assets = definition
            .assets
            .iter()
            .map(|a| plan_asset(a, &vars))
            .collect::<Result<Vec<_>, _>>()?;

        // Substituted names can collide even when the templates differ
        let mut destinations = HashSet::new();
        for planned in &assets {
            if !destinations.insert(&planned.destination) {
                return Err(PlanError::DuplicateDestination {
                    asset: planned.asset.id.clone(),
                    destination: planned.destination.display().to_string(),
                });
            }
        }

        Ok(Self {
            name: definition.name.clone(),
            ref_name: ref_name.to_string(),
            semver,
            event,
            registry,
            latest,
            publish_assets: event.publishes_assets(),
            components,
            examples,
            assets,
        })
    }
}

fn plan_image(
    target: &BuildTarget,
    needs: Vec<String>,
    vars: &RunVars,
    registry: &str,
    ref_name: &str,
    latest: bool,
) -> Result<PlannedImage, PlanError> {
    let target_vars = vars
        .clone()
        .with("name", target.name.as_str())
        .with("version_suffix", target.version_suffix.as_str());

    let build_args = target
        .build_args
        .iter()
        .map(|arg| {
            substitute(&arg.value, &target_vars)
                .map(|value| BuildArg::new(arg.key.as_str(), value))
                .map_err(|source| PlanError::BuildArg {
                    target: target.name.clone(),
                    key: arg.key.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlannedImage {
        target: target.clone(),
        build_args,
        references: image_references(registry, target, ref_name, latest),
        needs,
    })
}

fn plan_asset(asset: &ReleaseAsset, vars: &RunVars) -> Result<PlannedAsset, PlanError> {
    // Inside an image reference `${ref_name}` must name the tag that was pushed
    let mut image_vars = vars.clone();
    if let Some(tag) = vars.get("tag") {
        image_vars.insert("ref_name", tag);
    }
    let image_tag = substitute(&asset.image_tag, &image_vars).map_err(|source| PlanError::AssetImage {
        asset: asset.id.clone(),
        source,
    })?;
    let target_name =
        substitute(&asset.target_name, vars).map_err(|source| PlanError::AssetName {
            asset: asset.id.clone(),
            source,
        })?;
    if target_name.trim().is_empty() || target_name.contains(['/', '\\']) {
        return Err(PlanError::InvalidAssetName {
            asset: asset.id.clone(),
            name: target_name,
        });
    }
    let asset = ReleaseAsset {
        image_tag,
        target_name,
        ..asset.clone()
    };
    Ok(PlannedAsset {
        destination: asset.destination(),
        asset,
    })
}
