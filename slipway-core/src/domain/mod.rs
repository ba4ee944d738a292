//! Core domain types
//!
//! This module contains the structures shared by the definition loader
//! (which produces them), the runner (which executes them) and the CLI
//! (which plans and prints them).

pub mod asset;
pub mod definition;
pub mod event;
pub mod log;
pub mod run;
pub mod target;
