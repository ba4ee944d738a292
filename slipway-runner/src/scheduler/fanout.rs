//! Matrix fan-out
//!
//! Each unit of a stage runs in its own task. A shared semaphore caps how
//! many run at once, and the stage is a barrier: `run` returns only after
//! every unit has finished, with reports in the order the units were given.

use chrono::Utc;
use slipway_core::domain::run::UnitReport;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Bounded fan-out over the units of a stage
#[derive(Debug, Clone)]
pub struct FanOut {
    semaphore: Arc<Semaphore>,
}

impl FanOut {
    /// Creates a fan-out allowing `max_parallel` concurrent units (at least one)
    pub fn new(max_parallel: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    /// Runs every `(name, unit)` pair and collects their reports
    ///
    /// A unit that panics is reported as failed; its siblings keep running.
    pub async fn run<Fut>(&self, units: Vec<(String, Fut)>) -> Vec<UnitReport>
    where
        Fut: Future<Output = UnitReport> + Send + 'static,
    {
        let mut handles = Vec::with_capacity(units.len());

        for (name, unit) in units {
            let semaphore = Arc::clone(&self.semaphore);
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return UnitReport::failed(task_name, e.to_string()),
                };
                debug!("Starting unit {}", task_name);
                let started_at = Utc::now();
                let report = unit.await;
                report.with_started_at(started_at)
                // Permit is released when dropped
            });
            handles.push((name, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!("Unit task {} panicked: {}", name, e);
                    reports.push(UnitReport::failed(name, format!("unit task panicked: {}", e)));
                }
            }
        }
        reports
    }
}
