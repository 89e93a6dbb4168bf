//! Central app configuration.
//!
//! Settings define the *root* where local storage lives (`data_dir`); the
//! exact on-disk naming under that root belongs to
//! [`crate::layout::StorageLayout`]. Kept dependency-free: defaults plus an
//! environment override are all a single-operator CLI needs.

use std::path::PathBuf;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "TABVER_DATA_DIR";

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root directory for local artifacts (Parquet files).
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Settings {
    /// Build settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self {
                data_dir: PathBuf::from(dir),
            },
            _ => Self::default(),
        }
    }
}
