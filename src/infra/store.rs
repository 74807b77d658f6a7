//! Filesystem-backed documentation artifact store.
//!
//! One numbered directory per build under the store root, with every
//! artifact of a build inside its `living-documentation/` subdirectory
//! at the fixed names from [`crate::domain::layout`]. The layout is a
//! pure function of build number and format, so the serving side can
//! compute any artifact path without scanning.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{build::BuildRecord, layout};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid artifact path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("build record is not valid JSON")]
    Record {
        #[source]
        source: serde_json::Error,
    },
}

/// Filesystem store rooted at the documentation directory.
#[derive(Debug, Clone)]
pub struct BuildStore {
    root: PathBuf,
}

impl BuildStore {
    /// Initialise the store, creating the root directory if necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Workspace directory of a build (inputs live here).
    pub fn build_dir(&self, build_number: u32) -> PathBuf {
        self.root.join(build_number.to_string())
    }

    /// Documentation directory of a build (artifacts live here).
    pub fn docs_dir(&self, build_number: u32) -> PathBuf {
        layout::docs_dir(&self.build_dir(build_number))
    }

    /// Create the documentation directory for a build.
    pub async fn prepare_docs_dir(&self, build_number: u32) -> Result<PathBuf, StoreError> {
        let docs = self.docs_dir(build_number);
        fs::create_dir_all(&docs).await?;
        Ok(docs)
    }

    /// Persist the build record atomically: a rename makes the record
    /// visible only once fully written, so the serving side never reads
    /// a torn `build.json`.
    pub async fn save_record(&self, record: &BuildRecord) -> Result<(), StoreError> {
        let docs = self.prepare_docs_dir(record.build_number).await?;
        let path = layout::record_path(&docs);
        let staging = docs.join(format!(".{}.{}", layout::BUILD_RECORD_FILE, Uuid::new_v4()));

        let body =
            serde_json::to_vec_pretty(record).map_err(|source| StoreError::Record { source })?;
        let mut file = fs::File::create(&staging).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&staging, &path).await?;
        debug!(
            target = "infra::store",
            build_number = record.build_number,
            path = %path.display(),
            "build record persisted"
        );
        Ok(())
    }

    /// Load the record of one build. `None` means the build has no
    /// published documentation.
    pub async fn load_record(&self, build_number: u32) -> Result<Option<BuildRecord>, StoreError> {
        let path = layout::record_path(&self.docs_dir(build_number));
        let body = match fs::read(&path).await {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::Io(err)),
        };
        let record =
            serde_json::from_slice(&body).map_err(|source| StoreError::Record { source })?;
        Ok(Some(record))
    }

    /// List every build with a readable record, newest first. Builds
    /// with a corrupt or missing record are skipped with a warning
    /// rather than failing the listing.
    pub async fn list_records(&self) -> Result<Vec<BuildRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(build_number) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            match self.load_record(build_number).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        target = "infra::store",
                        build_number,
                        error = %err,
                        "skipping build with unreadable record"
                    );
                }
            }
        }
        records.sort_by(|a, b| b.build_number.cmp(&a.build_number));
        Ok(records)
    }

    /// Read one artifact of a build. The file name is resolved strictly
    /// inside the build's documentation directory.
    pub async fn read_artifact(
        &self,
        build_number: u32,
        file_name: &str,
    ) -> Result<Bytes, StoreError> {
        let path = self.resolve(build_number, file_name)?;
        let body = fs::read(path).await?;
        Ok(Bytes::from(body))
    }

    pub async fn artifact_exists(&self, build_number: u32, file_name: &str) -> bool {
        match self.resolve(build_number, file_name) {
            Ok(path) => fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Write the aggregate landing page only if it does not exist yet.
    /// Concurrent materialization races are benign: whoever loses the
    /// `create_new` race keeps the winner's identical file.
    pub async fn materialize_all_page(
        &self,
        build_number: u32,
        contents: &[u8],
    ) -> Result<PathBuf, StoreError> {
        let path = self.resolve(build_number, layout::ALL_ARTIFACT)?;
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(contents).await?;
                file.flush().await?;
                debug!(
                    target = "infra::store",
                    build_number,
                    "aggregate page materialized"
                );
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(StoreError::Io(err)),
        }
        Ok(path)
    }

    /// Read a theme stylesheet from the build's themes directory.
    pub async fn read_theme(&self, build_number: u32, name: &str) -> Result<Bytes, StoreError> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(StoreError::InvalidPath);
        }
        let path = layout::theme_path(&self.docs_dir(build_number), name);
        let body = fs::read(path).await?;
        Ok(Bytes::from(body))
    }

    /// Seed the default theme stylesheet if the build does not carry
    /// its own.
    pub async fn seed_default_theme(
        &self,
        build_number: u32,
        css: &[u8],
    ) -> Result<(), StoreError> {
        let docs = self.docs_dir(build_number);
        let themes = layout::themes_dir(&docs);
        fs::create_dir_all(&themes).await?;
        let path = layout::theme_path(&docs, layout::DEFAULT_THEME);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                file.write_all(css).await?;
                file.flush().await?;
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Copy feature result files and known customization files from the
    /// workspace features directory into the build's documentation
    /// directory, flattened to their file names.
    pub async fn copy_feature_sources(
        &self,
        features_dir: &Path,
        build_number: u32,
    ) -> Result<usize, StoreError> {
        const CUSTOMIZATION_FILES: [&str; 3] =
            ["vivadoc-intro.adoc", "vivadoc.css", "vivadoc-pdf.yml"];

        let docs = self.prepare_docs_dir(build_number).await?;
        let mut copied = 0;
        for entry in walkdir::WalkDir::new(features_dir)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let wanted = name.ends_with(".json") || CUSTOMIZATION_FILES.contains(&name);
            if !wanted {
                continue;
            }
            fs::copy(entry.path(), docs.join(name)).await?;
            copied += 1;
        }
        Ok(copied)
    }

    fn resolve(&self, build_number: u32, file_name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(file_name);
        if relative.is_absolute()
            || relative.components().any(|component| {
                matches!(component, Component::ParentDir | Component::Prefix(_))
            })
        {
            return Err(StoreError::InvalidPath);
        }
        Ok(self.docs_dir(build_number).join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::build::DocsFormat;
    use tempfile::TempDir;
    use time::macros::datetime;

    fn record(build_number: u32, format: DocsFormat) -> BuildRecord {
        BuildRecord {
            format,
            build_number,
            build_time: datetime!(2026-08-30 12:00 UTC),
        }
    }

    fn store(dir: &TempDir) -> BuildStore {
        BuildStore::new(dir.path().to_path_buf()).expect("store")
    }

    #[tokio::test]
    async fn record_round_trips_through_the_layout_path() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store
            .save_record(&record(7, DocsFormat::All))
            .await
            .expect("save");

        assert!(dir
            .path()
            .join("7")
            .join("living-documentation")
            .join("build.json")
            .is_file());
        let loaded = store.load_record(7).await.expect("load").expect("present");
        assert_eq!(loaded.build_number, 7);
        assert_eq!(loaded.format, DocsFormat::All);
    }

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let dir = TempDir::new().expect("temp dir");
        assert!(store(&dir).load_record(99).await.expect("load").is_none());
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_skips_junk() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        for number in [3, 1, 2] {
            store
                .save_record(&record(number, DocsFormat::Html))
                .await
                .expect("save");
        }
        // A non-numeric directory and a build without a record are both
        // invisible to the listing.
        std::fs::create_dir_all(dir.path().join("scratch")).expect("mkdir");
        std::fs::create_dir_all(dir.path().join("9")).expect("mkdir");

        let numbers: Vec<u32> = store
            .list_records()
            .await
            .expect("list")
            .into_iter()
            .map(|record| record.build_number)
            .collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn artifact_resolution_rejects_traversal() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        let err = store
            .read_artifact(1, "../../etc/passwd")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::InvalidPath));
    }

    #[tokio::test]
    async fn all_page_materialization_is_create_if_absent() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.prepare_docs_dir(4).await.expect("prepare");

        store
            .materialize_all_page(4, b"first")
            .await
            .expect("materialize");
        store
            .materialize_all_page(4, b"second")
            .await
            .expect("materialize again");

        let body = store
            .read_artifact(4, layout::ALL_ARTIFACT)
            .await
            .expect("read");
        assert_eq!(&body[..], b"first");
    }

    #[tokio::test]
    async fn default_theme_is_seeded_once() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.seed_default_theme(2, b"body {}").await.expect("seed");
        store
            .seed_default_theme(2, b"h1 {}")
            .await
            .expect("seed again");
        let css = store.read_theme(2, "default").await.expect("read");
        assert_eq!(&css[..], b"body {}");
    }

    #[tokio::test]
    async fn theme_names_are_validated() {
        let dir = TempDir::new().expect("temp dir");
        let err = store(&dir)
            .read_theme(1, "../default")
            .await
            .expect_err("must reject");
        assert!(matches!(err, StoreError::InvalidPath));
    }

    #[tokio::test]
    async fn feature_sources_copy_flattens_json_and_customizations() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        let workspace = TempDir::new().expect("workspace");
        let nested = workspace.path().join("target").join("cucumber");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("run.json"), "[]").expect("write");
        std::fs::write(workspace.path().join("vivadoc.css"), "body {}").expect("write");
        std::fs::write(workspace.path().join("notes.txt"), "ignore me").expect("write");

        let copied = store
            .copy_feature_sources(workspace.path(), 5)
            .await
            .expect("copy");
        assert_eq!(copied, 2);
        let docs = store.docs_dir(5);
        assert!(docs.join("run.json").is_file());
        assert!(docs.join("vivadoc.css").is_file());
        assert!(!docs.join("notes.txt").exists());
    }
}
