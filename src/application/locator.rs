//! Feature source location.
//!
//! Resolves the directory that holds cucumber JSON result files from an
//! optional, possibly messy user-supplied path. Resolution is pure path
//! arithmetic; existence is checked later by the parser, which treats a
//! missing directory as an empty feature set.

use std::path::{Path, PathBuf};

/// Resolve the features directory against the workspace root.
///
/// A `None` or blank override means the workspace root itself. Windows
/// path separators in the override are normalized, and leading
/// separators are stripped so the override always stays relative to the
/// workspace.
pub fn locate(workspace_root: &Path, features_dir: Option<&str>) -> PathBuf {
    let Some(raw) = features_dir else {
        return workspace_root.to_path_buf();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return workspace_root.to_path_buf();
    }

    let normalized = trimmed.replace('\\', "/");
    let relative = normalized.trim_start_matches('/');
    if relative.is_empty() {
        return workspace_root.to_path_buf();
    }

    let mut resolved = workspace_root.to_path_buf();
    for segment in relative.split('/').filter(|segment| !segment.is_empty()) {
        resolved.push(segment);
    }
    resolved
}
