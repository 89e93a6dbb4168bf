//! Coordination of storage + engine for consumers (the CLI today).
//!
//! The orchestrator is the only component allowed to pair "compute an
//! artifact" with "register its version", and the only one enforcing a
//! consistency rule between the filesystem and the metadata store:
//!
//! 1. resolve the destination path via the layout
//! 2. let the engine materialize the artifact (engine errors propagate)
//! 3. build the [`DatasetVersion`] record
//! 4. register it in the repository
//! 5. if registration fails, best-effort delete the artifact and surface the
//!    *registration* error, never a cleanup error
//!
//! There is no atomicity beyond that: a crash between steps 2 and 4 leaves an
//! orphaned, unregistered file. That is the documented consistency model for
//! a single-operator CLI, not a bug to paper over.
//!
//! Consumers never touch the repository directly; everything goes through the
//! methods here, so the in-memory store can be swapped for a durable backend
//! without touching the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::engine::SqlEngine;
use crate::error::{Result, TabverError};
use crate::layout::StorageLayout;
use crate::model::{Dataset, DatasetRef, DatasetVersion};
use crate::repository::{DatasetRepository, StateDump};

/// Facade composing repository, layout and engine.
#[derive(Debug)]
pub struct Orchestrator {
    settings: Settings,
    layout: StorageLayout,
    repository: DatasetRepository,
    engine: SqlEngine,
}

impl Orchestrator {
    /// Build an orchestrator with defaults derived from `settings`.
    pub fn new(settings: Settings) -> Self {
        let layout = StorageLayout::new(settings.data_dir.clone());
        Self {
            settings,
            layout,
            repository: DatasetRepository::new(),
            engine: SqlEngine::new(),
        }
    }

    /// Build from explicit parts, for tests and embedders.
    pub fn from_parts(
        settings: Settings,
        layout: StorageLayout,
        repository: DatasetRepository,
        engine: SqlEngine,
    ) -> Self {
        Self {
            settings,
            layout,
            repository,
            engine,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ---------------------------
    // Dataset ops
    // ---------------------------

    pub fn create_dataset(
        &mut self,
        dataset_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Dataset> {
        validate_key_segment("dataset id", dataset_id)?;
        self.repository.create_dataset(dataset_id, name, description)
    }

    pub fn list_datasets(&self) -> Vec<Dataset> {
        self.repository.list_datasets()
    }

    pub fn get_dataset(&self, dataset_id: &str) -> Result<Dataset> {
        self.repository.get_dataset(dataset_id)
    }

    // ---------------------------
    // Version ops
    // ---------------------------

    pub fn get_version(&self, dataset_id: &str, version: &str) -> Result<DatasetVersion> {
        self.repository.get_version(dataset_id, version)
    }

    /// Resolve a parsed `id:version` reference to its record.
    pub fn resolve(&self, reference: &DatasetRef) -> Result<DatasetVersion> {
        self.get_version(&reference.dataset_id, &reference.version)
    }

    pub fn list_versions(&self, dataset_id: &str) -> Vec<DatasetVersion> {
        self.repository.list_versions(dataset_id)
    }

    // ---------------------------
    // Imports
    // ---------------------------

    /// Import a CSV file as a new version of an existing dataset.
    ///
    /// The dataset must already exist: checked before any engine work so a
    /// doomed registration wastes no compute.
    pub fn import_csv(
        &mut self,
        dataset_id: &str,
        csv_path: &Path,
        version: &str,
    ) -> Result<DatasetVersion> {
        validate_key_segment("version", version)?;
        self.repository.get_dataset(dataset_id)?;

        let out_path = self.layout.version_path(dataset_id, version);
        let out_path = self.engine.import_csv(csv_path, &out_path)?;

        let params = BTreeMap::from([
            ("csv_path".to_string(), csv_path.display().to_string()),
        ]);
        self.register_version(dataset_id, version, &out_path, "import_csv", params)
    }

    /// Import an Excel workbook sheet as a new version of an existing dataset.
    pub fn import_xlsx(
        &mut self,
        dataset_id: &str,
        xlsx_path: &Path,
        sheet: Option<&str>,
        version: &str,
    ) -> Result<DatasetVersion> {
        validate_key_segment("version", version)?;
        self.repository.get_dataset(dataset_id)?;

        let out_path = self.layout.version_path(dataset_id, version);
        let out_path = self.engine.import_xlsx(xlsx_path, &out_path, sheet)?;

        let mut params = BTreeMap::from([
            ("xlsx_path".to_string(), xlsx_path.display().to_string()),
        ]);
        if let Some(sheet) = sheet {
            params.insert("sheet".to_string(), sheet.to_string());
        }
        self.register_version(dataset_id, version, &out_path, "import_xlsx", params)
    }

    // ---------------------------
    // Preview / profile
    // ---------------------------

    /// Materialize at most `limit` rows of a version.
    pub fn preview(
        &mut self,
        dataset_version: &DatasetVersion,
        limit: usize,
    ) -> Result<polars::prelude::DataFrame> {
        self.record_run(
            dataset_version,
            "preview",
            BTreeMap::from([("limit".to_string(), limit.to_string())]),
        );
        self.engine.preview(Path::new(&dataset_version.path), limit)
    }

    /// Basic column profiling of a version. Engine-side stub today.
    pub fn profile(
        &mut self,
        dataset_version: &DatasetVersion,
    ) -> Result<polars::prelude::DataFrame> {
        self.record_run(dataset_version, "profile", BTreeMap::new());
        self.engine.profile(Path::new(&dataset_version.path))
    }

    // ---------------------------
    // Transforms
    // ---------------------------

    /// Filter rows of a version into a new version of the same dataset.
    pub fn filter(
        &mut self,
        dataset_version: &DatasetVersion,
        where_expr: &str,
        out_version: &str,
    ) -> Result<DatasetVersion> {
        validate_key_segment("version", out_version)?;
        let dataset_id = dataset_version.dataset_id.clone();
        let out_path = self.layout.version_path(&dataset_id, out_version);

        let out_path =
            self.engine
                .filter(Path::new(&dataset_version.path), where_expr, &out_path)?;

        let params = BTreeMap::from([
            ("source".to_string(), dataset_version.reference()),
            ("where".to_string(), where_expr.to_string()),
        ]);
        self.register_version(&dataset_id, out_version, &out_path, "filter", params)
    }

    /// Winsorize a column of a version into a new version.
    pub fn winsorize(
        &mut self,
        dataset_version: &DatasetVersion,
        column: &str,
        p_low: f64,
        p_high: f64,
        out_column: Option<&str>,
        out_version: &str,
    ) -> Result<DatasetVersion> {
        validate_key_segment("version", out_version)?;
        let dataset_id = dataset_version.dataset_id.clone();
        let out_path = self.layout.version_path(&dataset_id, out_version);

        let out_path = self.engine.winsorize(
            Path::new(&dataset_version.path),
            column,
            p_low,
            p_high,
            out_column,
            &out_path,
        )?;

        let mut params = BTreeMap::from([
            ("source".to_string(), dataset_version.reference()),
            ("column".to_string(), column.to_string()),
            ("p_low".to_string(), p_low.to_string()),
            ("p_high".to_string(), p_high.to_string()),
        ]);
        if let Some(out_column) = out_column {
            params.insert("out_column".to_string(), out_column.to_string());
        }
        self.register_version(&dataset_id, out_version, &out_path, "winsorize", params)
    }

    /// Recode a column of a version through a value mapping into a new version.
    pub fn recode(
        &mut self,
        dataset_version: &DatasetVersion,
        column: &str,
        mapping: &serde_json::Map<String, JsonValue>,
        out_column: Option<&str>,
        out_version: &str,
    ) -> Result<DatasetVersion> {
        validate_key_segment("version", out_version)?;
        let dataset_id = dataset_version.dataset_id.clone();
        let out_path = self.layout.version_path(&dataset_id, out_version);

        let out_path = self.engine.recode(
            Path::new(&dataset_version.path),
            column,
            mapping,
            out_column,
            &out_path,
        )?;

        let mut params = BTreeMap::from([
            ("source".to_string(), dataset_version.reference()),
            ("column".to_string(), column.to_string()),
            ("mapping".to_string(), JsonValue::Object(mapping.clone()).to_string()),
        ]);
        if let Some(out_column) = out_column {
            params.insert("out_column".to_string(), out_column.to_string());
        }
        self.register_version(&dataset_id, out_version, &out_path, "recode", params)
    }

    // ---------------------------
    // Stats
    // ---------------------------

    /// Mean of a column of a version, optionally filtered by a predicate.
    pub fn mean(
        &mut self,
        dataset_version: &DatasetVersion,
        column: &str,
        where_expr: Option<&str>,
    ) -> Result<f64> {
        let mut params = BTreeMap::from([("column".to_string(), column.to_string())]);
        if let Some(where_expr) = where_expr {
            params.insert("where".to_string(), where_expr.to_string());
        }
        self.record_run(dataset_version, "mean", params);

        self.engine
            .mean(Path::new(&dataset_version.path), column, where_expr)
    }

    // ---------------------------
    // Diagnostics
    // ---------------------------

    /// Full structural dump of the metadata store.
    pub fn debug_state(&self) -> StateDump {
        self.repository.debug_state()
    }

    // ---------------------------
    // Internals
    // ---------------------------

    /// Steps 3-5 of the sequencing protocol: build the record, register it,
    /// and on registration failure delete the artifact best-effort while
    /// propagating the original error. Provenance is written only once the
    /// version is actually registered, so a rejected version leaves no
    /// dangling operation row.
    fn register_version(
        &mut self,
        dataset_id: &str,
        version: &str,
        out_path: &Path,
        kind: &'static str,
        params: BTreeMap<String, String>,
    ) -> Result<DatasetVersion> {
        let operation_id = Uuid::new_v4().to_string();
        let record = DatasetVersion {
            dataset_id: dataset_id.to_string(),
            version: version.to_string(),
            path: out_path.display().to_string(),
            created_at: chrono::Utc::now(),
            operation_id: Some(operation_id.clone()),
        };

        if let Err(registration_err) = self.repository.add_version(record.clone()) {
            if let Err(cleanup_err) = fs::remove_file(out_path) {
                warn!(
                    path = %out_path.display(),
                    error = %cleanup_err,
                    "failed to clean up artifact after rejected registration"
                );
            }
            return Err(registration_err);
        }

        self.repository.create_operation(&operation_id, kind, params)?;
        debug!(reference = %record.reference(), kind, "registered version");
        Ok(record)
    }

    /// Append to the execution log. Run bookkeeping must never fail the
    /// analytical call it annotates.
    fn record_run(
        &mut self,
        dataset_version: &DatasetVersion,
        method: &str,
        params: BTreeMap<String, String>,
    ) {
        let run_id = Uuid::new_v4().to_string();
        if let Err(err) =
            self.repository
                .create_run(&run_id, &dataset_version.reference(), method, params)
        {
            warn!(method, error = %err, "failed to record run");
        }
    }
}

/// Reject identifiers that cannot serve as a single path segment or that
/// would make `id:version` references ambiguous.
fn validate_key_segment(what: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TabverError::invalid(format!("{what} is empty")));
    }
    if value == "." || value == ".." {
        return Err(TabverError::invalid(format!("{what} '{value}' is reserved")));
    }
    if value.contains(['/', '\\', ':']) {
        return Err(TabverError::invalid(format!(
            "{what} '{value}' must not contain '/', '\\' or ':'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_key_segment;

    #[test]
    fn key_segments_reject_path_and_reference_metacharacters() {
        assert!(validate_key_segment("dataset id", "households_2023").is_ok());
        assert!(validate_key_segment("version", "v1").is_ok());

        for bad in ["", ".", "..", "a/b", "a\\b", "a:b"] {
            assert!(validate_key_segment("dataset id", bad).is_err(), "bad={bad}");
        }
    }
}
