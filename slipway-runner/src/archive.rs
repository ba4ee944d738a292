//! Placement of extracted paths
//!
//! A path copied out of an image is staged under its own basename. Files are
//! moved to the asset destination as-is; directories are packed in-process
//! into a tar+gzip archive at the destination whose single top-level entry
//! is that basename, and the unpacked directory is removed.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// What ended up at the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The extracted file, byte for byte
    File,
    /// A tar+gzip archive of the extracted directory
    Archive,
}

/// Moves or archives `staged` to `destination`
///
/// `staged` must be named after the basename of the path inside the image.
pub fn place_extracted(staged: &Path, destination: &Path) -> Result<Placement> {
    let metadata = fs::metadata(staged)
        .with_context(|| format!("Extracted path {} does not exist", staged.display()))?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if metadata.is_dir() {
        archive_directory(staged, destination)?;
        fs::remove_dir_all(staged)
            .with_context(|| format!("Failed to remove {}", staged.display()))?;
        info!(
            "Archived directory {} to {}",
            staged.display(),
            destination.display()
        );
        Ok(Placement::Archive)
    } else {
        fs::rename(staged, destination).with_context(|| {
            format!(
                "Failed to move {} to {}",
                staged.display(),
                destination.display()
            )
        })?;
        debug!("Moved {} to {}", staged.display(), destination.display());
        Ok(Placement::File)
    }
}

/// Packs `directory` into `archive` with its basename as the top-level entry
pub fn archive_directory(directory: &Path, archive: &Path) -> Result<()> {
    let name = directory
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", directory.display()))?;

    let file = File::create(archive)
        .with_context(|| format!("Failed to create archive {}", archive.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(name, directory)
        .with_context(|| format!("Failed to archive {}", directory.display()))?;

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("Failed to finish archive {}", archive.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use flate2::read::GzDecoder;
    use std::io::Read;

    fn list_archive(archive: &Path) -> Vec<String> {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
        archive
            .entries()
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let path = entry.path().unwrap().display().to_string();
                path.trim_end_matches('/').to_string()
            })
            .collect()
    }

    fn read_entry(archive: &Path, name: &str) -> String {
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
        let mut entry = archive
            .entries()
            .unwrap()
            .map(Result::unwrap)
            .find(|e| e.path().unwrap().to_str() == Some(name))
            .unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_file_is_moved_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("stage").join("libselkies.so");
        fs::create_dir_all(staged.parent().unwrap()).unwrap();
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(&staged, &bytes).unwrap();

        let destination = dir.path().join("dist").join("selkies-interposer.so");
        let placement = place_extracted(&staged, &destination).unwrap();

        assert_eq!(placement, Placement::File);
        assert_eq!(fs::read(&destination).unwrap(), bytes);
        assert!(!staged.exists());
    }

    #[test]
    fn test_directory_is_archived_under_basename() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("stage").join("gst-web");
        fs::create_dir_all(staged.join("js")).unwrap();
        fs::write(staged.join("index.html"), "<html></html>").unwrap();
        fs::write(staged.join("js").join("app.js"), "run()").unwrap();

        let destination = dir.path().join("dist").join("gst-web.tgz");
        let placement = place_extracted(&staged, &destination).unwrap();

        assert_eq!(placement, Placement::Archive);
        assert!(destination.is_file());
        assert!(!staged.exists());

        let entries = list_archive(&destination);
        assert!(entries.iter().all(|e| e == "gst-web" || e.starts_with("gst-web/")));
        assert!(entries.contains(&"gst-web/index.html".to_string()));
        assert!(entries.contains(&"gst-web/js/app.js".to_string()));
        assert_eq!(read_entry(&destination, "gst-web/js/app.js"), "run()");
    }

    #[test]
    fn test_archive_named_like_directory() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("stage").join("gst-web");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("index.html"), "x").unwrap();

        let destination = dir.path().join("gst-web");
        place_extracted(&staged, &destination).unwrap();
        assert!(destination.is_file());
        assert!(list_archive(&destination).contains(&"gst-web/index.html".to_string()));
    }

    #[test]
    fn test_missing_staged_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = place_extracted(&dir.path().join("nothing"), &dir.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
