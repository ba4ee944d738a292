//! Release asset publishing

use anyhow::{Context, Result};
use slipway_client::{ReleaseStore, RemoteAsset};
use slipway_core::plan::PlannedAsset;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Uploads extracted assets to the release of the current tag
#[derive(Clone)]
pub struct ReleasePublisher {
    store: Arc<dyn ReleaseStore>,
}

impl ReleasePublisher {
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self { store }
    }

    /// Uploads `file` under the asset's target name, replacing any
    /// existing asset with that name
    pub async fn publish(&self, tag: &str, asset: &PlannedAsset, file: &Path) -> Result<RemoteAsset> {
        let asset = &asset.asset;
        info!("Uploading {} to release {}", asset.target_name, tag);
        self.store
            .replace_asset(tag, file, &asset.target_name, &asset.mimetype)
            .await
            .with_context(|| format!("Failed to upload {} to release {}", asset.target_name, tag))
    }
}
