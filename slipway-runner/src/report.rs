//! Run reports
//!
//! The finished [`PipelineRun`] is written as pretty JSON for CI artifacts
//! and summarized as plain text lines for logs and terminals.

use anyhow::{Context, Result};
use slipway_core::domain::run::PipelineRun;
use std::fs;
use std::path::Path;
use tracing::info;

/// Serializes `run` as JSON to `path`, creating parent directories
pub fn write_report(run: &PipelineRun, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(run).context("Failed to serialize run report")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))?;

    info!("Wrote run report to {}", path.display());
    Ok(())
}

/// One line per unit, grouped by stage
pub fn summary_lines(run: &PipelineRun) -> Vec<String> {
    let mut lines = vec![format!(
        "run {} ref={} semver={} event={}",
        run.id, run.ref_name, run.semver, run.event
    )];

    for stage in &run.stages {
        lines.push(format!("[{}]", stage.kind));
        if stage.units.is_empty() {
            lines.push("  (no units)".to_string());
        }
        for unit in &stage.units {
            let mut line = format!("  {:<9} {}", unit.status.to_string(), unit.name);
            if let Some(message) = &unit.message {
                line.push_str(&format!(": {}", message));
            } else if !unit.outputs.is_empty() {
                line.push_str(&format!(" -> {}", unit.outputs.join(", ")));
            }
            lines.push(line);
        }
    }

    lines.push(format!(
        "result: {}",
        if run.succeeded() { "success" } else { "failure" }
    ));
    lines
}

/// Logs the summary through tracing
pub fn log_summary(run: &PipelineRun) {
    for line in summary_lines(run) {
        info!("{}", line);
    }
}

/// Process exit code for a finished run
pub fn exit_code(run: &PipelineRun) -> i32 {
    if run.succeeded() { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_core::domain::event::TriggerEvent;
    use slipway_core::domain::run::{StageKind, StageReport, UnitReport};

    fn run() -> PipelineRun {
        let mut run = PipelineRun::new("v1.2.3", TriggerEvent::Release);
        run.push_stage(StageReport::new(
            StageKind::Components,
            vec![
                UnitReport::succeeded("gstreamer", vec!["ghcr.io/org/gstreamer:v1.2.3".to_string()]),
                UnitReport::failed("coturn", "build failed"),
            ],
        ));
        run.push_stage(StageReport::new(StageKind::Assets, vec![]));
        run.complete();
        run
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(&run());
        assert!(lines[0].contains("ref=v1.2.3 semver=1.2.3 event=release"));
        assert_eq!(lines[1], "[component-images]");
        assert_eq!(
            lines[2],
            "  succeeded gstreamer -> ghcr.io/org/gstreamer:v1.2.3"
        );
        assert_eq!(lines[3], "  failed    coturn: build failed");
        assert_eq!(lines[4], "[extract-assets]");
        assert_eq!(lines[5], "  (no units)");
        assert_eq!(lines.last().unwrap(), "result: failure");
    }

    #[test]
    fn test_exit_code() {
        let mut run = run();
        assert_eq!(exit_code(&run), 1);
        run.stages.remove(0);
        assert_eq!(exit_code(&run), 0);
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let run = run();

        write_report(&run, &path).unwrap();

        let written: PipelineRun =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, run);

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["stages"][0]["kind"], "components");
        assert_eq!(value["stages"][0]["units"][1]["status"], "failed");
    }
}
