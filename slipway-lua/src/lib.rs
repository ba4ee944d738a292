//! Slipway Lua Infrastructure
//!
//! Release definitions are written in Lua so a single file can declare the
//! component, example and asset matrices and compute entries from run
//! variables. This crate provides:
//! - Module trait and registry for Lua modules
//! - A restricted sandbox with the `release` declaration helpers
//! - Core module implementations (`log`, `env`)
//! - The definition loader and validator
//! - Stub generation for editor tooling

pub mod definition;
pub mod module;
pub mod modules;
pub mod sandbox;

pub use definition::{
    DefinitionError, ReleaseDefinition, load_definition, load_definition_with_vars,
};
pub use module::{ModuleRegistry, SlipwayModule};
pub use modules::{EnvModule, LogModule, LogSink, ReleaseModule, TracingLogSink, VarProvider};
pub use sandbox::create_sandbox;
