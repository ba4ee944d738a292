//! Image tag computation
//!
//! Every target is pushed as `{registry}/{name}:{ref_name}{version_suffix}`.
//! Pushes to the main line additionally move `latest{version_suffix}`.

use crate::domain::event::TriggerEvent;
use crate::domain::target::BuildTarget;

/// Tag that tracks the newest main-line build
pub const LATEST: &str = "latest";

/// Longest tag a registry accepts
const MAX_TAG_LEN: usize = 128;

/// Returns true if `latest` tags should be moved for this trigger
///
/// Only pushes to the main line qualify. Release tags and manual runs never
/// clobber `latest` with untagged or pre-release builds.
pub fn publishes_latest(event: TriggerEvent, ref_name: &str, main_branch: &str) -> bool {
    event == TriggerEvent::Push && ref_name == main_branch
}

/// Makes a ref name usable as an image tag
///
/// Characters outside `[A-Za-z0-9_.-]` become `-` so that branch names like
/// `feature/x` still produce a valid tag. Valid refs pass through unchanged.
pub fn sanitize_tag(ref_name: &str) -> String {
    let mut tag: String = ref_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if tag.starts_with(['.', '-']) {
        tag.insert(0, '_');
    }
    tag.truncate(MAX_TAG_LEN);
    tag
}

/// `{ref}{suffix}` tag, shortening the ref part so the whole tag stays
/// within the registry limit
pub fn suffixed_tag(ref_name: &str, suffix: &str) -> String {
    let mut tag = sanitize_tag(ref_name);
    // Sanitized tags are ASCII, so any byte index is a char boundary
    tag.truncate(MAX_TAG_LEN.saturating_sub(suffix.len()));
    tag.push_str(suffix);
    tag
}

/// Repository part of an image reference (`registry/name`)
pub fn image_name(registry: &str, name: &str) -> String {
    let registry = registry.trim_end_matches('/');
    if registry.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", registry, name)
    }
}

/// Full image reference (`registry/name:tag`)
pub fn image_reference(registry: &str, name: &str, tag: &str) -> String {
    format!("{}:{}", image_name(registry, name), tag)
}

/// Tags a target is published under, ref tag first
pub fn image_tags(target: &BuildTarget, ref_name: &str, latest: bool) -> Vec<String> {
    let mut tags = vec![suffixed_tag(ref_name, &target.version_suffix)];
    if latest {
        tags.push(suffixed_tag(LATEST, &target.version_suffix));
    }
    tags
}

/// Full image references a target is published under
pub fn image_references(
    registry: &str,
    target: &BuildTarget,
    ref_name: &str,
    latest: bool,
) -> Vec<String> {
    image_tags(target, ref_name, latest)
        .iter()
        .map(|tag| image_reference(registry, &target.name, tag))
        .collect()
}
