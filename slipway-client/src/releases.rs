//! Release and release-asset endpoints

use std::path::Path;
use tracing::{debug, info};

use crate::ReleaseClient;
use crate::error::{ClientError, Result};
use crate::types::{Release, RemoteAsset};

impl ReleaseClient {
    /// Get the release for a tag
    ///
    /// # Errors
    /// Returns [`ClientError::NotFound`] if no release exists for the tag
    pub async fn get_release_by_tag(&self, tag: &str) -> Result<Release> {
        let url = format!(
            "{}/repos/{}/releases/tags/{}",
            self.base_url, self.repository, tag
        );
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response).await.map_err(|e| {
            if e.is_not_found() {
                ClientError::NotFound(format!("release for tag '{}'", tag))
            } else {
                e
            }
        })
    }

    /// Delete a release asset by id
    pub async fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let url = format!(
            "{}/repos/{}/releases/assets/{}",
            self.base_url, self.repository, asset_id
        );
        let response = self.authorize(self.client.delete(&url)).send().await?;

        self.handle_empty_response(response).await
    }

    /// Upload a file to a release
    ///
    /// Uses the release's `upload_url` template when present, otherwise the
    /// assets endpoint under the API base URL.
    pub async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        mimetype: &str,
        body: Vec<u8>,
    ) -> Result<RemoteAsset> {
        let url = self.upload_endpoint(release);
        debug!("Uploading {} ({} bytes) to {}", name, body.len(), url);

        let response = self
            .authorize(self.client.post(&url))
            .query(&[("name", name)])
            .header(reqwest::header::CONTENT_TYPE, mimetype)
            .body(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Upload `path` as `name`, deleting an existing asset of that name first
    pub async fn replace_asset(
        &self,
        tag: &str,
        path: &Path,
        name: &str,
        mimetype: &str,
    ) -> Result<RemoteAsset> {
        let release = self.get_release_by_tag(tag).await?;

        if let Some(existing) = release.asset_named(name) {
            info!(
                "Replacing existing asset {} (id {}) on release {}",
                name, existing.id, tag
            );
            self.delete_asset(existing.id).await?;
        }

        let body = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let asset = self.upload_asset(&release, name, mimetype, body).await?;
        info!("Uploaded {} to release {} (id {})", name, tag, asset.id);
        Ok(asset)
    }

    fn upload_endpoint(&self, release: &Release) -> String {
        match &release.upload_url {
            Some(template) if !template.is_empty() => template
                .split('{')
                .next()
                .unwrap_or(template)
                .to_string(),
            _ => format!(
                "{}/repos/{}/releases/{}/assets",
                self.base_url, self.repository, release.id
            ),
        }
    }
}
