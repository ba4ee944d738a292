//! Trigger event domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The event that started a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Push to a branch
    Push,
    /// A release was published
    Release,
    /// Manual dispatch, treated like a push for testing
    ManualDispatch,
}

/// Returned when an event name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trigger event '{0}' (expected push, release or workflow_dispatch)")]
pub struct UnknownEvent(pub String);

impl TriggerEvent {
    /// Release assets are only uploaded for published releases
    pub fn publishes_assets(self) -> bool {
        matches!(self, TriggerEvent::Release)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TriggerEvent::Push => "push",
            TriggerEvent::Release => "release",
            TriggerEvent::ManualDispatch => "workflow_dispatch",
        }
    }
}

impl FromStr for TriggerEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "push" => Ok(TriggerEvent::Push),
            "release" => Ok(TriggerEvent::Release),
            "workflow_dispatch" | "manual" | "dispatch" => Ok(TriggerEvent::ManualDispatch),
            _ => Err(UnknownEvent(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
