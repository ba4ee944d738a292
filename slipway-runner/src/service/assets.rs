//! Asset service
//!
//! Materializes a container from the asset's image without running it,
//! copies the asset path out and places it at the asset destination.
//! The container and the staging directory are always removed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use slipway_core::plan::PlannedAsset;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::place_extracted;
use crate::engine::ContainerEngine;

/// Service trait for extracting release assets from images
#[async_trait]
pub trait AssetService: Send + Sync {
    /// Extracts an asset
    ///
    /// # Returns
    /// The local file the asset was written to
    async fn extract(&self, asset: &PlannedAsset) -> Result<PathBuf>;

    /// Local file an asset is (or will be) written to
    fn local_path(&self, asset: &PlannedAsset) -> PathBuf;
}

/// Asset service backed by a container engine
pub struct EngineAssetService {
    engine: Arc<dyn ContainerEngine>,
    work_dir: PathBuf,
}

impl EngineAssetService {
    pub fn new(engine: Arc<dyn ContainerEngine>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl AssetService for EngineAssetService {
    async fn extract(&self, asset: &PlannedAsset) -> Result<PathBuf> {
        let engine = Arc::clone(&self.engine);
        let asset = asset.clone();
        let destination = self.local_path(&asset);

        tokio::task::spawn_blocking(move || {
            extract_blocking(engine.as_ref(), &asset, &destination)?;
            Ok(destination)
        })
        .await
        .context("Asset extraction task failed")?
    }

    fn local_path(&self, asset: &PlannedAsset) -> PathBuf {
        self.work_dir.join(&asset.destination)
    }
}

fn extract_blocking(engine: &dyn ContainerEngine, planned: &PlannedAsset, destination: &Path) -> Result<()> {
    let asset = &planned.asset;
    let image = asset.image_tag.as_str();

    if !engine.image_exists(image)? {
        info!("Pulling {} for asset {}", image, asset.id);
        engine
            .pull(image)
            .with_context(|| format!("Image {} not found", image))?;
    }

    let parent = destination
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let run_id = Uuid::new_v4();
    let container = format!("slipway-extract-{}", run_id);
    let staging = parent.join(format!(".slipway-{}", run_id));
    fs::create_dir_all(&staging)
        .with_context(|| format!("Failed to create {}", staging.display()))?;

    engine
        .create(image, &container)
        .with_context(|| format!("Failed to create container from {}", image))?;

    let basename = match asset.source_basename() {
        "" => asset.id.as_str(),
        name => name,
    };
    let staged = staging.join(basename);

    let result = engine
        .copy_from(&container, &asset.source_path, &staged)
        .with_context(|| format!("Path {} not found in {}", asset.source_path, image))
        .and_then(|_| place_extracted(&staged, destination));

    if let Err(e) = engine.remove(&container) {
        warn!("Failed to remove container {}: {:#}", container, e);
    }
    if let Err(e) = fs::remove_dir_all(&staging) {
        warn!("Failed to remove staging directory {}: {}", staging.display(), e);
    }

    let placement = result?;
    debug!("Asset {} placed as {:?}", asset.id, placement);
    info!("Extracted {} to {}", asset.id, destination.display());
    Ok(())
}
