//! Run-scoped variable substitution
//!
//! Build args and asset image references may contain `${name}` references
//! that are resolved against the variables of the current run (ref name,
//! semver, event, registry, ...). Unknown names are an error rather than
//! silently expanding to nothing.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::event::TriggerEvent;
use crate::tags::sanitize_tag;

/// Errors produced by [`substitute`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarError {
    #[error("unknown variable '${{{0}}}'")]
    Unknown(String),

    #[error("unterminated variable reference in '{0}'")]
    Unterminated(String),
}

/// Variables available for substitution during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunVars {
    vars: BTreeMap<String, String>,
}

impl RunVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard variables of a run
    ///
    /// `tag` is `ref_name` as it appears in pushed image tags.
    pub fn for_run(ref_name: &str, semver: &str, event: TriggerEvent, registry: &str) -> Self {
        let mut vars = Self::new();
        vars.insert("ref_name", ref_name);
        vars.insert("tag", sanitize_tag(ref_name));
        vars.insert("semver", semver);
        vars.insert("event", event.as_str());
        vars.insert("registry", registry.trim_end_matches('/'));
        vars
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Replaces every `${name}` in `template` with its value
///
/// A `$` not followed by `{` is copied as-is.
pub fn substitute(template: &str, vars: &RunVars) -> Result<String, VarError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| VarError::Unterminated(template.to_string()))?;
        let name = after[..end].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| VarError::Unknown(name.to_string()))?;
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
