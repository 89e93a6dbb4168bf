//! On-disk naming for version artifacts.
//!
//! [`StorageLayout`] is the single authority for where artifacts live; the
//! orchestrator and the engine never invent paths. Changing the physical
//! layout (date partitioning, content addressing, remote object storage)
//! means touching only this module.

use std::path::{Path, PathBuf};

/// Pure mapping from `(data_dir, dataset_id, version)` to filesystem paths.
///
/// No I/O and no validation happen here: callers are responsible for
/// sanitizing identifiers used as path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    data_dir: PathBuf,
}

impl StorageLayout {
    /// Create a layout rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// The root directory this layout is anchored at.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding a version's files, e.g. `data/datasets/households_2023/v1/`.
    pub fn version_dir(&self, dataset_id: &str, version: &str) -> PathBuf {
        self.data_dir.join("datasets").join(dataset_id).join(version)
    }

    /// Path of the version's primary Parquet artifact,
    /// e.g. `data/datasets/households_2023/v1/data.parquet`.
    pub fn version_path(&self, dataset_id: &str, version: &str) -> PathBuf {
        self.version_dir(dataset_id, version).join("data.parquet")
    }
}
