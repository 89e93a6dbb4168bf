use std::path::Path;

use thiserror::Error;

/// Convenience result type used across the crate.
pub type Result<T> = std::result::Result<T, TabverError>;

/// Error type shared by the repository, engine, orchestrator and CLI.
///
/// The variants map onto the tool's error taxonomy: missing things, duplicate
/// identifiers, bad user input, operations that are still stubs, and anything
/// the underlying query engine reports.
#[derive(Debug, Error)]
pub enum TabverError {
    /// A dataset, version, or source file does not exist.
    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },

    /// A create/register hit an identifier that already exists.
    #[error("{what} '{id}' already exists")]
    Duplicate { what: &'static str, id: String },

    /// Malformed user input (identifiers, references, mappings, percentiles).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is declared but not built yet.
    #[error("'{0}' is not implemented yet")]
    Unimplemented(&'static str),

    /// The aggregate has no defined value (no rows matched, or all values null).
    #[error("mean of column '{column}' is undefined (no matching rows, or all values are null)")]
    UndefinedMean { column: String },

    /// Underlying I/O error (e.g. permission denied while writing an artifact).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Excel workbook error.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// JSON serialization error (debug-state dump).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything surfaced by the query engine (bad predicate, unreadable file, ...).
    #[error("engine error: {0}")]
    Engine(#[from] polars::prelude::PolarsError),
}

impl TabverError {
    /// Create a [`TabverError::NotFound`] for a path on disk.
    pub fn file_not_found(what: &'static str, path: &Path) -> Self {
        Self::NotFound {
            what,
            id: path.display().to_string(),
        }
    }

    /// Create an [`TabverError::InvalidArgument`] from any message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
