//! Release definition: the three declarative matrices of a pipeline

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::domain::asset::ReleaseAsset;
use crate::domain::target::BuildTarget;

/// Everything a pipeline run needs to know about what to build and ship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDefinition {
    pub name: String,
    /// Registry used when the run configuration does not set one
    pub registry: Option<String>,
    pub components: Vec<BuildTarget>,
    pub examples: Vec<BuildTarget>,
    pub assets: Vec<ReleaseAsset>,
}

/// All structural problems found in a definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct DefinitionError {
    pub problems: Vec<String>,
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid release definition: {}", self.problems.join("; "))
    }
}

impl ReleaseDefinition {
    pub fn component(&self, name: &str) -> Option<&BuildTarget> {
        self.components.iter().find(|t| t.name == name)
    }

    /// Checks names, dependencies and destinations
    ///
    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut problems = Vec::new();

        if self.name.trim().is_empty() {
            problems.push("definition name cannot be empty".to_string());
        }
        if self.components.is_empty() {
            problems.push("at least one component target is required".to_string());
        }

        check_targets("component", &self.components, &mut problems);
        check_targets("example", &self.examples, &mut problems);

        for example in &self.examples {
            for need in example.needs.iter().flatten() {
                if self.component(need).is_none() {
                    problems.push(format!(
                        "example '{}' needs unknown component '{}'",
                        example.name, need
                    ));
                }
            }
        }

        let mut ids = HashSet::new();
        let mut destinations = HashSet::new();
        for asset in &self.assets {
            if asset.id.trim().is_empty() {
                problems.push("asset id cannot be empty".to_string());
            } else if !ids.insert(asset.id.as_str()) {
                problems.push(format!("duplicate asset id '{}'", asset.id));
            }
            if asset.image_tag.trim().is_empty() {
                problems.push(format!("asset '{}' has no image_tag", asset.id));
            }
            if asset.source_path.trim().is_empty() {
                problems.push(format!("asset '{}' has no source_path", asset.id));
            }
            if asset.target_name.trim().is_empty() || asset.target_name.contains('/') {
                problems.push(format!(
                    "asset '{}' target_name must be a plain file name",
                    asset.id
                ));
            }
            if !destinations.insert(asset.destination()) {
                problems.push(format!(
                    "asset '{}' writes to {} which another asset already uses",
                    asset.id,
                    asset.destination().display()
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError { problems })
        }
    }
}

fn check_targets(kind: &str, targets: &[BuildTarget], problems: &mut Vec<String>) {
    let mut names = HashSet::new();
    for target in targets {
        if target.name.trim().is_empty() {
            problems.push(format!("{} target name cannot be empty", kind));
            continue;
        }
        if !names.insert(target.name.as_str()) {
            problems.push(format!("duplicate {} target '{}'", kind, target.name));
        }
        if target.source_directory.trim().is_empty() {
            problems.push(format!(
                "{} target '{}' has no source_directory",
                kind, target.name
            ));
        }
        if target.dockerfile.trim().is_empty() {
            problems.push(format!("{} target '{}' has an empty dockerfile", kind, target.name));
        }
        if target.build_args.iter().any(|a| a.key.trim().is_empty()) {
            problems.push(format!(
                "{} target '{}' has a build arg with an empty key",
                kind, target.name
            ));
        }
        if matches!(&target.smoke_test, Some(cmd) if cmd.is_empty()) {
            problems.push(format!(
                "{} target '{}' has an empty smoke_test command",
                kind, target.name
            ));
        }
    }
}
