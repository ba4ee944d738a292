//! Release API payloads

use serde::{Deserialize, Serialize};

/// A published release, as returned by the releases API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    /// URI template, e.g. `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<RemoteAsset>,
}

impl Release {
    pub fn asset_named(&self, name: &str) -> Option<&RemoteAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// A file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}
