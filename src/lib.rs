//! `tabver` manages versioned tabular datasets from the command line: raw
//! CSV/Excel files are imported into immutable Parquet artifacts, transforms
//! (filter/winsorize/recode) derive new versions, and simple descriptive
//! statistics run over any version.
//!
//! ## Model
//!
//! - A **dataset** is a logical named source with a stable id.
//! - A **version** is an immutable labeled snapshot of its data, keyed by
//!   `(dataset_id, version)` and backed by one Parquet **artifact** on disk.
//! - Imports and transforms always create a *new* version; nothing is ever
//!   overwritten or deleted.
//!
//! ## Architecture
//!
//! - [`layout`]: the single authority mapping `(dataset_id, version)` to an
//!   artifact location under the data root
//! - [`repository`]: the in-memory metadata store (datasets, versions,
//!   operations, runs), a placeholder for a durable backend
//! - [`engine`]: Polars-backed execution of imports, transforms and stats
//!   over Parquet artifacts
//! - [`orchestrator`]: coordinates "compute an artifact, then register its
//!   version", with best-effort artifact cleanup when registration fails
//! - [`cli`]: clap-based command surface; constructed and driven from `main`
//!
//! ## Quick example
//!
//! ```no_run
//! use tabver::config::Settings;
//! use tabver::orchestrator::Orchestrator;
//!
//! # fn main() -> tabver::Result<()> {
//! let mut orc = Orchestrator::new(Settings::default());
//! orc.create_dataset("households_2023", "Households", None)?;
//! let v1 = orc.import_csv("households_2023", "sample.csv".as_ref(), "v1")?;
//! let rows = orc.preview(&v1, 10)?;
//! println!("{rows}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod model;
pub mod orchestrator;
pub mod repository;

pub use error::{Result, TabverError};
