//! Scheduler layer for the runner
//!
//! Runs the units of one stage concurrently and waits for all of them
//! before the next stage is considered.

pub mod fanout;

pub use fanout::FanOut;
