//! Slipway Release Client
//!
//! A small, type-safe HTTP client for the release object store (the
//! GitHub-compatible releases REST API). It covers exactly what the
//! pipeline needs: find a release by tag, delete an asset, upload an asset.
//!
//! # Example
//!
//! ```no_run
//! use slipway_client::{ReleaseClient, ReleaseStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> slipway_client::Result<()> {
//!     let client = ReleaseClient::new("https://api.github.com", "org/repo")
//!         .with_token("ghp_example");
//!
//!     client
//!         .replace_asset("v1.2.3", Path::new("dist/gst-web.tgz"), "gst-web.tgz", "application/x-gzip")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod error;
mod releases;
pub mod types;

pub use error::{ClientError, Result};
pub use types::{Release, RemoteAsset};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::path::Path;

const USER_AGENT: &str = concat!("slipway/", env!("CARGO_PKG_VERSION"));

/// Destination for release assets
///
/// The runner depends on this trait rather than on [`ReleaseClient`] so the
/// publish stage can be exercised without a network.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Uploads `path` as `name` to the release tagged `tag`, replacing any
    /// existing asset with the same name
    async fn replace_asset(
        &self,
        tag: &str,
        path: &Path,
        name: &str,
        mimetype: &str,
    ) -> Result<RemoteAsset>;
}

/// HTTP client for the releases API
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    /// Base URL of the API (e.g., "https://api.github.com")
    base_url: String,
    /// `owner/name` of the repository the releases belong to
    repository: String,
    /// Bearer credential supplied by the triggering platform
    token: Option<String>,
    client: Client,
}

impl ReleaseClient {
    /// Create a new release client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the releases API
    /// * `repository` - Repository as `owner/name`
    pub fn new(base_url: impl Into<String>, repository: impl Into<String>) -> Self {
        Self::with_client(base_url, repository, Client::new())
    }

    /// Create a new release client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            repository: repository.into().trim_matches('/').to_string(),
            token: None,
            client,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Adds the headers every request carries
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code of a response without a body (e.g. DELETE)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[async_trait]
impl ReleaseStore for ReleaseClient {
    async fn replace_asset(
        &self,
        tag: &str,
        path: &Path,
        name: &str,
        mimetype: &str,
    ) -> Result<RemoteAsset> {
        ReleaseClient::replace_asset(self, tag, path, name, mimetype).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ReleaseClient::new("https://api.github.com", "org/repo");
        assert_eq!(client.base_url(), "https://api.github.com");
        assert_eq!(client.repository(), "org/repo");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_client_trims_slashes() {
        let client = ReleaseClient::new("https://api.github.com/", "/org/repo/");
        assert_eq!(client.base_url(), "https://api.github.com");
        assert_eq!(client.repository(), "org/repo");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = ReleaseClient::new("http://localhost", "o/r").with_token("");
        assert!(client.token.is_none());

        let client = ReleaseClient::new("http://localhost", "o/r").with_token("secret");
        assert_eq!(client.token.as_deref(), Some("secret"));
    }
}
