//! Build target domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Dockerfile name used when a target does not specify one
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// A single `KEY=value` build-time variable
///
/// Keys and values are passed to the container build verbatim (after
/// run-variable substitution); the orchestrator never interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArg {
    pub key: String,
    pub value: String,
}

impl BuildArg {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parses a `KEY=value` pair, splitting on the first `=`
    ///
    /// Returns `None` when there is no `=` or the key is empty.
    pub fn parse(pair: &str) -> Option<Self> {
        let (key, value) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, value))
    }
}

impl fmt::Display for BuildArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// One container image to build from one source tree
///
/// Used for both the component matrix and the example matrix. The `needs`
/// field only matters for examples: `None` means the example depends on
/// every component target, `Some(list)` restricts it to the named ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub name: String,
    pub source_directory: String,
    pub dockerfile: String,
    pub build_args: Vec<BuildArg>,
    pub version_suffix: String,
    #[serde(default)]
    pub needs: Option<Vec<String>>,
    /// Command run inside the built image before it is pushed
    #[serde(default)]
    pub smoke_test: Option<Vec<String>>,
}

impl BuildTarget {
    /// Creates a target with the default dockerfile and no build args
    pub fn new(name: impl Into<String>, source_directory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_directory: source_directory.into(),
            dockerfile: DEFAULT_DOCKERFILE.to_string(),
            build_args: Vec::new(),
            version_suffix: String::new(),
            needs: None,
            smoke_test: None,
        }
    }

    pub fn with_dockerfile(mut self, dockerfile: impl Into<String>) -> Self {
        self.dockerfile = dockerfile.into();
        self
    }

    pub fn with_build_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.build_args.push(BuildArg::new(key, value));
        self
    }

    pub fn with_version_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.version_suffix = suffix.into();
        self
    }

    pub fn with_needs(mut self, needs: Vec<String>) -> Self {
        self.needs = Some(needs);
        self
    }

    pub fn with_smoke_test(mut self, command: Vec<String>) -> Self {
        self.smoke_test = Some(command);
        self
    }

    /// Path of the dockerfile, relative to the working directory of the run
    pub fn dockerfile_path(&self) -> PathBuf {
        PathBuf::from(&self.source_directory).join(&self.dockerfile)
    }

    /// Returns true if this target waits on the given component target
    pub fn depends_on(&self, component: &str) -> bool {
        match &self.needs {
            None => true,
            Some(needs) => needs.iter().any(|n| n == component),
        }
    }
}
