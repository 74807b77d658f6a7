use std::{fs, path::Path};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::Feature;

/// Find and parse every Cucumber result file under `dir`.
///
/// An empty result set is a normal outcome, not an error: a missing
/// directory, a directory with no `*.json` files, and JSON files that are
/// not Cucumber output all contribute nothing. Features are returned
/// sorted by name so the rendered document is deterministic regardless of
/// filesystem iteration order.
pub fn find_and_parse(dir: impl AsRef<Path>) -> Vec<Feature> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        debug!(
            target = "vivadoc_features::parser",
            dir = %dir.display(),
            "feature source directory does not exist"
        );
        return Vec::new();
    }

    let mut features = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    target = "vivadoc_features::parser",
                    error = %err,
                    "skipping unreadable directory entry"
                );
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    target = "vivadoc_features::parser",
                    file = %path.display(),
                    error = %err,
                    "skipping unreadable result file"
                );
                continue;
            }
        };

        match serde_json::from_str::<Vec<Feature>>(&contents) {
            Ok(parsed) => {
                debug!(
                    target = "vivadoc_features::parser",
                    file = %path.display(),
                    features = parsed.len(),
                    "parsed feature result file"
                );
                features.extend(parsed);
            }
            Err(err) => {
                // Workspaces routinely contain JSON that is not Cucumber
                // output (package manifests, tool caches). Skip quietly.
                debug!(
                    target = "vivadoc_features::parser",
                    file = %path.display(),
                    error = %err,
                    "file is not Cucumber result JSON"
                );
            }
        }
    }

    features.sort_by(|a, b| a.name.cmp(&b.name));
    features
}
