//! Release asset domain types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file or directory pulled out of a built image and attached to a release
///
/// `image_tag` is the full image reference and may contain run variables
/// such as `${registry}` or `${ref_name}`; it is substituted before use,
/// with `${ref_name}` resolving to the sanitized tag the images were pushed
/// under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub id: String,
    pub image_tag: String,
    pub source_path: String,
    pub mimetype: String,
    pub target_directory: String,
    pub target_name: String,
}

impl ReleaseAsset {
    /// Local path the asset is written to
    pub fn destination(&self) -> PathBuf {
        PathBuf::from(&self.target_directory).join(&self.target_name)
    }

    /// Last component of `source_path`, ignoring trailing slashes
    ///
    /// A directory asset is archived under this name.
    pub fn source_basename(&self) -> &str {
        let trimmed = self.source_path.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(source_path: &str) -> ReleaseAsset {
        ReleaseAsset {
            id: "web".to_string(),
            image_tag: "ghcr.io/org/gst-web:main".to_string(),
            source_path: source_path.to_string(),
            mimetype: "application/x-gzip".to_string(),
            target_directory: "dist".to_string(),
            target_name: "gst-web.tgz".to_string(),
        }
    }

    #[test]
    fn test_destination() {
        assert_eq!(
            asset("/opt/gst-web").destination(),
            PathBuf::from("dist/gst-web.tgz")
        );
    }

    #[test]
    fn test_source_basename() {
        assert_eq!(asset("/opt/gst-web").source_basename(), "gst-web");
        assert_eq!(asset("/opt/gst-web/").source_basename(), "gst-web");
        assert_eq!(asset("file.deb").source_basename(), "file.deb");
    }
}
