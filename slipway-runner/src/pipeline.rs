//! Pipeline execution
//!
//! Drives one run through its stages:
//!
//! 1. Component images, fanned out over the component matrix
//! 2. Example images, after the whole component stage; an example whose
//!    needed components did not all succeed is blocked
//! 3. Asset extraction, only on release events and only if both image
//!    stages succeeded
//! 4. Asset upload, only for extracted assets
//!
//! Unit failures never abort siblings. They surface in the stage reports
//! and block whatever depends on them.

use slipway_core::domain::run::{PipelineRun, StageKind, StageReport, UnitReport, UnitStatus};
use slipway_core::plan::{PipelinePlan, PlannedAsset, PlannedImage};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::scheduler::FanOut;
use crate::service::{AssetService, ImageService, ReleasePublisher};

/// Stage runner for a planned release
pub struct Pipeline {
    images: Arc<dyn ImageService>,
    assets: Arc<dyn AssetService>,
    publisher: Option<ReleasePublisher>,
    fanout: FanOut,
}

impl Pipeline {
    /// Creates a pipeline
    ///
    /// # Arguments
    /// * `images` - Builds and publishes component and example images
    /// * `assets` - Extracts release assets from images
    /// * `publisher` - Uploads assets on release events, if configured
    /// * `max_parallel_units` - Concurrency limit within each stage
    pub fn new(
        images: Arc<dyn ImageService>,
        assets: Arc<dyn AssetService>,
        publisher: Option<ReleasePublisher>,
        max_parallel_units: usize,
    ) -> Self {
        Self {
            images,
            assets,
            publisher,
            fanout: FanOut::new(max_parallel_units),
        }
    }

    /// Executes every stage of `plan` and returns the finished run
    pub async fn execute(&self, plan: &PipelinePlan) -> PipelineRun {
        let mut run = PipelineRun::new(plan.ref_name.as_str(), plan.event);
        info!(
            "Starting run {} of {} for {} (semver {}, event {})",
            run.id, plan.name, plan.ref_name, run.semver, plan.event
        );

        let components = self
            .image_stage(StageKind::Components, plan.components.clone())
            .await;
        log_stage(&components);

        let examples = self.example_stage(plan, &components).await;
        log_stage(&examples);

        let assets = self.extract_stage(plan, &components, &examples).await;
        log_stage(&assets);

        let publish = self.publish_stage(plan, &assets).await;
        log_stage(&publish);

        run.push_stage(components);
        run.push_stage(examples);
        run.push_stage(assets);
        run.push_stage(publish);
        run.complete();

        if run.succeeded() {
            info!("Run {} succeeded", run.id);
        } else {
            error!("Run {} failed", run.id);
        }
        run
    }

    async fn build_images(&self, images: Vec<PlannedImage>) -> Vec<UnitReport> {
        let units = images
            .into_iter()
            .map(|image| {
                let service = Arc::clone(&self.images);
                let name = image.name().to_string();
                let unit = async move {
                    match service.build_and_publish(&image).await {
                        Ok(references) => UnitReport::succeeded(image.name(), references),
                        Err(e) => {
                            error!("Image {} failed: {:#}", image.name(), e);
                            UnitReport::failed(image.name(), format!("{:#}", e))
                        }
                    }
                };
                (name, unit)
            })
            .collect();

        self.fanout.run(units).await
    }

    async fn image_stage(&self, kind: StageKind, images: Vec<PlannedImage>) -> StageReport {
        info!("Stage {}: {} image(s)", kind, images.len());
        StageReport::new(kind, self.build_images(images).await)
    }

    async fn example_stage(&self, plan: &PipelinePlan, components: &StageReport) -> StageReport {
        let mut blocked = HashMap::new();
        let mut runnable = Vec::new();

        for example in &plan.examples {
            let failed: Vec<&str> = example
                .needs
                .iter()
                .filter(|need| {
                    components
                        .unit(need)
                        .is_none_or(|u| u.status != UnitStatus::Succeeded)
                })
                .map(String::as_str)
                .collect();

            if failed.is_empty() {
                runnable.push(example.clone());
            } else {
                let message = format!("needed component(s) did not succeed: {}", failed.join(", "));
                warn!("Example {} blocked: {}", example.name(), message);
                blocked.insert(
                    example.name().to_string(),
                    UnitReport::blocked(example.name(), message),
                );
            }
        }

        info!(
            "Stage {}: {} image(s), {} blocked",
            StageKind::Examples,
            runnable.len(),
            blocked.len()
        );

        let mut built: HashMap<String, UnitReport> = self
            .build_images(runnable)
            .await
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();

        let units = plan
            .examples
            .iter()
            .filter_map(|e| built.remove(e.name()).or_else(|| blocked.remove(e.name())))
            .collect();
        StageReport::new(StageKind::Examples, units)
    }

    async fn extract_stage(
        &self,
        plan: &PipelinePlan,
        components: &StageReport,
        examples: &StageReport,
    ) -> StageReport {
        if !plan.publish_assets {
            info!(
                "Stage {} skipped: {} is not a release event",
                StageKind::Assets,
                plan.event
            );
            return skipped_stage(StageKind::Assets, plan);
        }

        let failed_stages: Vec<&str> = [components, examples]
            .iter()
            .filter(|s| !s.succeeded())
            .map(|s| s.kind.as_str())
            .collect();

        if !failed_stages.is_empty() {
            let message = format!("blocked by failed stage(s): {}", failed_stages.join(", "));
            warn!("Stage {} {}", StageKind::Assets, message);
            let units = plan
                .assets
                .iter()
                .map(|a| UnitReport::blocked(a.asset.id.as_str(), message.as_str()))
                .collect();
            return StageReport::new(StageKind::Assets, units);
        }

        info!("Stage {}: {} asset(s)", StageKind::Assets, plan.assets.len());

        let units = plan
            .assets
            .iter()
            .cloned()
            .map(|asset| {
                let service = Arc::clone(&self.assets);
                let name = asset.asset.id.clone();
                let unit = async move {
                    match service.extract(&asset).await {
                        Ok(path) => {
                            UnitReport::succeeded(asset.asset.id.as_str(), vec![path.display().to_string()])
                        }
                        Err(e) => {
                            error!("Asset {} failed: {:#}", asset.asset.id, e);
                            UnitReport::failed(asset.asset.id.as_str(), format!("{:#}", e))
                        }
                    }
                };
                (name, unit)
            })
            .collect();

        StageReport::new(StageKind::Assets, self.fanout.run(units).await)
    }

    async fn publish_stage(&self, plan: &PipelinePlan, extracted: &StageReport) -> StageReport {
        if !plan.publish_assets {
            info!(
                "Stage {} skipped: {} is not a release event",
                StageKind::Publish,
                plan.event
            );
            return skipped_stage(StageKind::Publish, plan);
        }

        let Some(publisher) = &self.publisher else {
            let units = plan
                .assets
                .iter()
                .map(|a| UnitReport::failed(a.asset.id.as_str(), "no release store configured"))
                .collect();
            return StageReport::new(StageKind::Publish, units);
        };

        let mut blocked = HashMap::new();
        let mut runnable: Vec<PlannedAsset> = Vec::new();
        for asset in &plan.assets {
            let id = asset.asset.id.as_str();
            match extracted.unit(id) {
                Some(unit) if unit.status == UnitStatus::Succeeded => runnable.push(asset.clone()),
                _ => {
                    blocked.insert(id.to_string(), UnitReport::blocked(id, "asset was not extracted"));
                }
            }
        }

        info!(
            "Stage {}: {} asset(s) to release {}",
            StageKind::Publish,
            runnable.len(),
            plan.ref_name
        );

        let units = runnable
            .into_iter()
            .map(|asset| {
                let publisher = publisher.clone();
                let file = self.assets.local_path(&asset);
                let tag = plan.ref_name.clone();
                let name = asset.asset.id.clone();
                let unit = async move {
                    let id = asset.asset.id.as_str();
                    match publisher.publish(&tag, &asset, &file).await {
                        Ok(remote) => UnitReport::succeeded(id, vec![remote.name]),
                        Err(e) => {
                            error!("Upload of {} failed: {:#}", id, e);
                            UnitReport::failed(id, format!("{:#}", e))
                        }
                    }
                };
                (name, unit)
            })
            .collect();

        let mut published: HashMap<String, UnitReport> = self
            .fanout
            .run(units)
            .await
            .into_iter()
            .map(|r| (r.name.clone(), r))
            .collect();

        let units = plan
            .assets
            .iter()
            .filter_map(|a| {
                published
                    .remove(&a.asset.id)
                    .or_else(|| blocked.remove(&a.asset.id))
            })
            .collect();
        StageReport::new(StageKind::Publish, units)
    }
}

fn skipped_stage(kind: StageKind, plan: &PipelinePlan) -> StageReport {
    let units = plan
        .assets
        .iter()
        .map(|a| UnitReport::skipped(a.asset.id.as_str(), "not a release event"))
        .collect();
    StageReport::new(kind, units)
}

fn log_stage(stage: &StageReport) {
    info!(
        "Stage {} finished: {} succeeded, {} failed, {} blocked, {} skipped",
        stage.kind,
        stage.count(UnitStatus::Succeeded),
        stage.count(UnitStatus::Failed),
        stage.count(UnitStatus::Blocked),
        stage.count(UnitStatus::Skipped)
    );
}
