//! Image service
//!
//! Builds one target's image, runs its smoke test, applies every tag and
//! pushes them. A failure anywhere fails only this target.

use anyhow::{Context, Result};
use async_trait::async_trait;
use slipway_core::plan::PlannedImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::engine::ContainerEngine;

/// Service trait for building and publishing images
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Builds and publishes an image
    ///
    /// # Returns
    /// The image references that were produced
    async fn build_and_publish(&self, image: &PlannedImage) -> Result<Vec<String>>;
}

/// Image service backed by a container engine
pub struct EngineImageService {
    engine: Arc<dyn ContainerEngine>,
    work_dir: PathBuf,
    push: bool,
}

impl EngineImageService {
    /// # Arguments
    /// * `engine` - Engine used for build, tag, run and push
    /// * `work_dir` - Source directories are resolved against this path
    /// * `push` - When false images are only built and tagged locally
    pub fn new(engine: Arc<dyn ContainerEngine>, work_dir: impl Into<PathBuf>, push: bool) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
            push,
        }
    }
}

#[async_trait]
impl ImageService for EngineImageService {
    async fn build_and_publish(&self, image: &PlannedImage) -> Result<Vec<String>> {
        let engine = Arc::clone(&self.engine);
        let image = image.clone();
        let work_dir = self.work_dir.clone();
        let push = self.push;

        tokio::task::spawn_blocking(move || build_blocking(engine.as_ref(), &image, &work_dir, push))
            .await
            .context("Image build task failed")?
    }
}

fn build_blocking(
    engine: &dyn ContainerEngine,
    image: &PlannedImage,
    work_dir: &Path,
    push: bool,
) -> Result<Vec<String>> {
    let target = &image.target;
    let context = work_dir.join(&target.source_directory);
    let dockerfile = work_dir.join(target.dockerfile_path());
    let primary = image.primary_reference();

    info!("Building {} from {}", primary, context.display());
    engine
        .build(&context, &dockerfile, &image.build_args, primary)
        .with_context(|| format!("Failed to build {}", target.name))?;

    for reference in image.references.iter().skip(1) {
        engine
            .tag(primary, reference)
            .with_context(|| format!("Failed to tag {} as {}", primary, reference))?;
    }

    if let Some(command) = &target.smoke_test {
        info!("Running smoke test for {}: {}", target.name, command.join(" "));
        engine
            .run(primary, command)
            .with_context(|| format!("Smoke test failed for {}", target.name))?;
    }

    if push {
        for reference in &image.references {
            engine
                .push(reference)
                .with_context(|| format!("Failed to push {}", reference))?;
            info!("Pushed {}", reference);
        }
    } else {
        info!("Push disabled, keeping {} local", target.name);
    }

    Ok(image.references.clone())
}
