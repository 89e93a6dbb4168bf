//! Domain records for datasets, versions, operations and runs.
//!
//! These are plain data: all behavior lives in the repository and the
//! orchestrator. Everything derives [`serde::Serialize`] so `debug-state`
//! can dump the whole metadata store as JSON.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TabverError};

/// A logical named data source, identified by a stable caller-chosen id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    /// Stable identifier (snake_case by convention), unique across datasets.
    pub dataset_id: String,
    /// Display name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Set once at creation, never mutated.
    pub created_at: DateTime<Utc>,
}

/// An immutable, labeled snapshot of a dataset's data.
///
/// Identified by the composite key `(dataset_id, version)`. `path` locates
/// the materialized Parquet artifact; the repository treats it as an opaque
/// string, only the layout and the engine give it meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetVersion {
    pub dataset_id: String,
    /// Caller-chosen label, e.g. "v1"; unique per dataset.
    pub version: String,
    /// Location of the columnar artifact backing this version.
    pub path: String,
    pub created_at: DateTime<Utc>,
    /// Provenance link to the operation that produced this version.
    pub operation_id: Option<String>,
}

impl DatasetVersion {
    /// The `dataset_id:version` reference string for this version.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.dataset_id, self.version)
    }
}

/// Provenance record of a version-producing call (import or transform).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub operation_id: String,
    /// Operation kind, e.g. "filter" or "recode".
    pub kind: String,
    /// String-typed parameters as passed to the engine.
    pub params: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Execution-log record of a read-only analytical invocation
/// (preview/profile/mean) against a dataset version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub run_id: String,
    /// The `dataset_id:version` reference the method ran against.
    pub dataset_version: String,
    /// Invoked method name, e.g. "mean".
    pub method: String,
    pub params: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// A parsed `<dataset_id>:<version>` reference.
///
/// The raw form is split on the *first* colon, so version labels may contain
/// colons while dataset ids may not (creation rejects them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub dataset_id: String,
    pub version: String,
}

impl DatasetRef {
    /// Parse a `dataset_id:version` reference.
    ///
    /// A missing colon is a usage error, not a runtime error.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.split_once(':') {
            Some((dataset_id, version)) if !dataset_id.is_empty() && !version.is_empty() => {
                Ok(Self {
                    dataset_id: dataset_id.to_string(),
                    version: version.to_string(),
                })
            }
            _ => Err(TabverError::invalid(format!(
                "expected <dataset_id>:<version> (e.g. households_2023:v1), got '{raw}'"
            ))),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset_id, self.version)
    }
}
