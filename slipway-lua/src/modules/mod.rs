//! Core Slipway modules for Lua scripts
//!
//! `release` is always present in the sandbox. `log` and `env` are generic
//! over a sink / provider so the runner and the CLI can plug in their own.

pub mod env;
pub mod log;
pub mod release;

pub use env::{EnvModule, VarProvider};
pub use log::{LogModule, LogSink, TracingLogSink};
pub use release::ReleaseModule;
