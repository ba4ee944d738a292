//! Pipeline run domain types
//!
//! A `PipelineRun` is created per trigger event and is never persisted;
//! it only accumulates the per-unit results of each stage so they can be
//! printed and written out as a JSON report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::event::TriggerEvent;
use crate::version::derive_semver;

/// The stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Components,
    Examples,
    Assets,
    Publish,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Components => "component-images",
            StageKind::Examples => "example-images",
            StageKind::Assets => "extract-assets",
            StageKind::Publish => "publish-assets",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single matrix entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Succeeded,
    Failed,
    /// Not attempted because a prerequisite failed
    Blocked,
    /// Not attempted because the trigger does not call for it
    Skipped,
}

impl UnitStatus {
    /// Skipped units do not fail a run, blocked ones do
    pub fn is_ok(self) -> bool {
        matches!(self, UnitStatus::Succeeded | UnitStatus::Skipped)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStatus::Succeeded => "succeeded",
            UnitStatus::Failed => "failed",
            UnitStatus::Blocked => "blocked",
            UnitStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of one matrix entry within a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub name: String,
    pub status: UnitStatus,
    pub message: Option<String>,
    /// Image references pushed, or local files written
    pub outputs: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

impl UnitReport {
    fn finished(name: impl Into<String>, status: UnitStatus, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message,
            outputs: Vec::new(),
            started_at: None,
            completed_at: Utc::now(),
        }
    }

    pub fn succeeded(name: impl Into<String>, outputs: Vec<String>) -> Self {
        let mut report = Self::finished(name, UnitStatus::Succeeded, None);
        report.outputs = outputs;
        report
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::finished(name, UnitStatus::Failed, Some(message.into()))
    }

    pub fn blocked(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::finished(name, UnitStatus::Blocked, Some(message.into()))
    }

    pub fn skipped(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::finished(name, UnitStatus::Skipped, Some(message.into()))
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }
}

/// All unit results of one stage, in definition order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub kind: StageKind,
    pub units: Vec<UnitReport>,
}

impl StageReport {
    pub fn new(kind: StageKind, units: Vec<UnitReport>) -> Self {
        Self { kind, units }
    }

    /// A stage is done only if none of its units failed or was blocked
    pub fn succeeded(&self) -> bool {
        self.units.iter().all(|u| u.status.is_ok())
    }

    pub fn unit(&self, name: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn count(&self, status: UnitStatus) -> usize {
        self.units.iter().filter(|u| u.status == status).count()
    }
}

/// One execution of the release pipeline for a trigger event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub ref_name: String,
    pub semver: String,
    pub event: TriggerEvent,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stages: Vec<StageReport>,
}

impl PipelineRun {
    /// Starts a run; the semver is resolved immediately and never fails
    pub fn new(ref_name: impl Into<String>, event: TriggerEvent) -> Self {
        let ref_name = ref_name.into();
        let semver = derive_semver(&ref_name);
        Self {
            id: Uuid::new_v4(),
            ref_name,
            semver,
            event,
            started_at: Utc::now(),
            completed_at: None,
            stages: Vec::new(),
        }
    }

    pub fn push_stage(&mut self, stage: StageReport) {
        self.stages.push(stage);
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.kind == kind)
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(StageReport::succeeded)
    }
}
