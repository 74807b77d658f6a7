//! Deterministic on-disk layout for generated documentation artifacts.
//!
//! The layout is the sole authority on path resolution: the publisher
//! writes through it and the documentation server reads through it, so
//! the two sides can never disagree about where an artifact lives.

use std::path::{Path, PathBuf};

use crate::domain::build::DocsFormat;

/// Namespace directory for all generated artifacts of one build,
/// constant across the whole system.
pub const DOCS_DIR_NAME: &str = "living-documentation";

pub const HTML_ARTIFACT: &str = "documentation.html";
pub const PDF_ARTIFACT: &str = "documentation.pdf";
pub const ALL_ARTIFACT: &str = "documentation-all.html";
pub const INTERMEDIATE_DOCUMENT: &str = "documentation.adoc";
pub const BUILD_RECORD_FILE: &str = "build.json";
pub const THEMES_DIR_NAME: &str = "themes";
pub const DEFAULT_THEME: &str = "default";

/// Documentation directory inside a build's root directory.
pub fn docs_dir(build_root: &Path) -> PathBuf {
    build_root.join(DOCS_DIR_NAME)
}

/// Pure mapping from a requested format to the artifact inside `docs_dir`.
/// `All` resolves to the aggregate landing page.
pub fn artifact_path(docs_dir: &Path, format: DocsFormat) -> PathBuf {
    docs_dir.join(artifact_file_name(format))
}

pub fn artifact_file_name(format: DocsFormat) -> &'static str {
    match format {
        DocsFormat::Html => HTML_ARTIFACT,
        DocsFormat::Pdf => PDF_ARTIFACT,
        DocsFormat::All => ALL_ARTIFACT,
    }
}

pub fn intermediate_path(docs_dir: &Path) -> PathBuf {
    docs_dir.join(INTERMEDIATE_DOCUMENT)
}

pub fn record_path(docs_dir: &Path) -> PathBuf {
    docs_dir.join(BUILD_RECORD_FILE)
}

pub fn themes_dir(docs_dir: &Path) -> PathBuf {
    docs_dir.join(THEMES_DIR_NAME)
}

pub fn theme_path(docs_dir: &Path, theme_name: &str) -> PathBuf {
    themes_dir(docs_dir).join(format!("{theme_name}.css"))
}
