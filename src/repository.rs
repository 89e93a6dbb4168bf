//! In-memory metadata store for datasets, versions, operations and runs.
//!
//! This repository is the system-of-record for *what exists*, independent of
//! where data bytes live; it knows nothing about the filesystem layout. It is
//! explicitly a placeholder for a durable backend (e.g. Postgres): everything
//! above it goes through this operation set, never through the maps directly,
//! so swapping the backing store does not touch the orchestrator or the CLI.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::error::{Result, TabverError};
use crate::model::{Dataset, DatasetVersion, Operation, Run};

/// Authoritative in-memory mapping from identifiers to metadata records.
///
/// Versions are keyed by a genuine `(dataset_id, version)` composite, not a
/// joined string, so a dataset id that is a prefix of another can never leak
/// into the wrong listing.
#[derive(Debug, Default)]
pub struct DatasetRepository {
    datasets: BTreeMap<String, Dataset>,
    versions: BTreeMap<(String, String), DatasetVersion>,
    operations: BTreeMap<String, Operation>,
    runs: BTreeMap<String, Run>,
}

/// Structural dump of the repository maps, for `debug-state`.
///
/// Diagnostics only, not a stable API. Version keys are rendered as
/// `dataset_id:version` for readability.
#[derive(Debug, Serialize)]
pub struct StateDump {
    pub datasets: BTreeMap<String, Dataset>,
    pub versions: BTreeMap<String, DatasetVersion>,
    pub operations: BTreeMap<String, Operation>,
    pub runs: BTreeMap<String, Run>,
}

impl DatasetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------
    // Dataset ops
    // ---------------------------

    /// Register a new dataset. Fails if `dataset_id` is already taken.
    pub fn create_dataset(
        &mut self,
        dataset_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Dataset> {
        if self.datasets.contains_key(dataset_id) {
            return Err(TabverError::Duplicate {
                what: "dataset",
                id: dataset_id.to_string(),
            });
        }
        let dataset = Dataset {
            dataset_id: dataset_id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        self.datasets.insert(dataset_id.to_string(), dataset.clone());
        Ok(dataset)
    }

    /// Look up a dataset by id.
    pub fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        self.datasets.get(dataset_id).cloned().ok_or_else(|| {
            TabverError::NotFound {
                what: "dataset",
                id: dataset_id.to_string(),
            }
        })
    }

    /// All registered datasets, in stable (id) order.
    pub fn list_datasets(&self) -> Vec<Dataset> {
        self.datasets.values().cloned().collect()
    }

    // ---------------------------
    // Version ops
    // ---------------------------

    /// Register a version under its `(dataset_id, version)` key.
    ///
    /// Fails if that exact pair already exists. Does *not* verify that the
    /// referenced dataset exists: referential integrity is deferred to the
    /// orchestrator's existence checks today and to a durable backend's
    /// constraints later.
    pub fn add_version(&mut self, dataset_version: DatasetVersion) -> Result<DatasetVersion> {
        let key = (
            dataset_version.dataset_id.clone(),
            dataset_version.version.clone(),
        );
        if self.versions.contains_key(&key) {
            return Err(TabverError::Duplicate {
                what: "version",
                id: dataset_version.reference(),
            });
        }
        self.versions.insert(key, dataset_version.clone());
        Ok(dataset_version)
    }

    /// Look up a version by its composite key.
    pub fn get_version(&self, dataset_id: &str, version: &str) -> Result<DatasetVersion> {
        self.versions
            .get(&(dataset_id.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| TabverError::NotFound {
                what: "version",
                id: format!("{dataset_id}:{version}"),
            })
    }

    /// All versions of one dataset, in stable (label) order.
    ///
    /// A range scan over the composite key; in a SQL backend this would be
    /// `SELECT ... WHERE dataset_id = ?`.
    pub fn list_versions(&self, dataset_id: &str) -> Vec<DatasetVersion> {
        self.versions
            .range((dataset_id.to_string(), String::new())..)
            .take_while(|((id, _), _)| id == dataset_id)
            .map(|(_, dv)| dv.clone())
            .collect()
    }

    // ---------------------------
    // Operation / run ops
    // ---------------------------

    /// Record the provenance of a version-producing call.
    pub fn create_operation(
        &mut self,
        operation_id: &str,
        kind: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Operation> {
        if self.operations.contains_key(operation_id) {
            return Err(TabverError::Duplicate {
                what: "operation",
                id: operation_id.to_string(),
            });
        }
        let op = Operation {
            operation_id: operation_id.to_string(),
            kind: kind.to_string(),
            params,
            created_at: Utc::now(),
        };
        self.operations.insert(operation_id.to_string(), op.clone());
        Ok(op)
    }

    /// Record a read-only analytical invocation in the execution log.
    pub fn create_run(
        &mut self,
        run_id: &str,
        dataset_version: &str,
        method: &str,
        params: BTreeMap<String, String>,
    ) -> Result<Run> {
        if self.runs.contains_key(run_id) {
            return Err(TabverError::Duplicate {
                what: "run",
                id: run_id.to_string(),
            });
        }
        let run = Run {
            run_id: run_id.to_string(),
            dataset_version: dataset_version.to_string(),
            method: method.to_string(),
            params,
            created_at: Utc::now(),
        };
        self.runs.insert(run_id.to_string(), run.clone());
        Ok(run)
    }

    /// Full structural dump of all maps, for diagnostics.
    pub fn debug_state(&self) -> StateDump {
        StateDump {
            datasets: self.datasets.clone(),
            versions: self
                .versions
                .iter()
                .map(|((id, version), dv)| (format!("{id}:{version}"), dv.clone()))
                .collect(),
            operations: self.operations.clone(),
            runs: self.runs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DatasetRepository;
    use crate::model::DatasetVersion;
    use chrono::Utc;

    fn version(dataset_id: &str, version: &str) -> DatasetVersion {
        DatasetVersion {
            dataset_id: dataset_id.to_string(),
            version: version.to_string(),
            path: format!("data/datasets/{dataset_id}/{version}/data.parquet"),
            created_at: Utc::now(),
            operation_id: None,
        }
    }

    #[test]
    fn list_versions_does_not_leak_prefixed_dataset_ids() {
        let mut repo = DatasetRepository::new();
        repo.add_version(version("a", "v1")).unwrap();
        repo.add_version(version("a:b", "v1")).unwrap();
        repo.add_version(version("ab", "v1")).unwrap();

        let versions = repo.list_versions("a");
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].dataset_id, "a");
    }

    #[test]
    fn debug_state_includes_all_maps() {
        let mut repo = DatasetRepository::new();
        repo.create_dataset("d", "Demo", None).unwrap();
        repo.add_version(version("d", "v1")).unwrap();

        let dump = repo.debug_state();
        assert!(dump.datasets.contains_key("d"));
        assert!(dump.versions.contains_key("d:v1"));
        assert!(dump.operations.is_empty());
        assert!(dump.runs.is_empty());
    }
}
