//! Slipway Core
//!
//! Core types and pure functions for the Slipway release orchestrator.
//!
//! This crate contains:
//! - Domain types: build targets, release assets, trigger events and run reports
//! - Version derivation from git refs
//! - Image tag computation
//! - Side-effect free planning of a run
//! - Run-scoped variable substitution for build arguments
//!
//! Nothing in here touches the container engine, the network or the filesystem.

pub mod domain;
pub mod plan;
pub mod tags;
pub mod vars;
pub mod version;

pub use plan::{PipelinePlan, PlanError, PlanOptions};
pub use vars::{RunVars, VarError, substitute};
pub use version::{FALLBACK_SEMVER, derive_semver};
