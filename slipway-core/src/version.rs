//! Semantic version derivation from git refs

use regex::Regex;
use std::sync::LazyLock;

/// Version used for every ref that is not a release tag
pub const FALLBACK_SEMVER: &str = "0.0.0";

static RELEASE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?)$")
        .expect("release ref pattern is valid")
});

/// Derives the semantic version for a ref name
///
/// `v1.2.3`, `v1.2.3-rc.1` and `v1.2.3+build.5` yield the ref without the
/// leading `v`. Anything else (branch names, empty refs, malformed tags)
/// yields [`FALLBACK_SEMVER`]. This never fails, so downstream stages always
/// have a version to embed in file names and package metadata.
pub fn derive_semver(ref_name: &str) -> String {
    RELEASE_REF
        .captures(ref_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| FALLBACK_SEMVER.to_string())
}
