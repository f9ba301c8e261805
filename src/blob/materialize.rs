//! Writing a [`FileManifest`] into a fresh temporary project root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use super::FileManifest;
use crate::error::PipelineError;

/// Prefix of every temporary project root.
const ROOT_PREFIX: &str = "securegen-";

/// A manifest written to disk.
///
/// Owns its temporary root: dropping the project deletes the directory and
/// everything in it.
#[derive(Debug)]
pub struct MaterializedProject {
    root: TempDir,
    files: BTreeMap<String, PathBuf>,
}

impl MaterializedProject {
    /// Write `manifest` into a new temporary directory.
    ///
    /// The directory is created under `work_dir` when given, otherwise under
    /// the system temp directory. Any write error aborts the whole project; the
    /// partially written root is removed when the error is returned.
    pub fn write(manifest: &FileManifest, work_dir: Option<&Path>) -> Result<Self, PipelineError> {
        let root = create_root(work_dir)?;
        let mut files = BTreeMap::new();

        for (rel, content) in manifest.iter() {
            let abs = root.path().join(rel.split('/').collect::<PathBuf>());
            write_file(&abs, content).map_err(|source| PipelineError::MaterializationFailure {
                path: rel.to_string(),
                source,
            })?;
            debug!(path = %rel, bytes = content.len(), "materialized file");
            files.insert(rel.to_string(), abs);
        }

        Ok(Self { root, files })
    }

    /// Temporary root directory.
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Relative path to absolute path mapping.
    pub fn files(&self) -> &BTreeMap<String, PathBuf> {
        &self.files
    }

    /// Sorted relative paths.
    pub fn relative_paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Delete the project root now, reporting any removal error.
    pub fn close(self) -> std::io::Result<()> {
        self.root.close()
    }
}

fn create_root(work_dir: Option<&Path>) -> Result<TempDir, PipelineError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(ROOT_PREFIX);

    match work_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| PipelineError::WorkDir {
                dir: dir.to_path_buf(),
                source,
            })?;
            builder.tempdir_in(dir).map_err(|source| PipelineError::WorkDir {
                dir: dir.to_path_buf(),
                source,
            })
        }
        None => builder.tempdir().map_err(|source| PipelineError::WorkDir {
            dir: std::env::temp_dir(),
            source,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
