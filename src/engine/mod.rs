//! Transform engine over Parquet artifacts.
//!
//! Wraps Polars, with `polars-sql` as the embedded SQL executor for the
//! operations that accept SQL-ish input (`filter`, `mean`). Every operation
//! takes explicit source/destination paths; the engine never decides *where*
//! a version lives (that is [`crate::layout::StorageLayout`]'s job).
//!
//! Contracts shared by all operations:
//! - parent directories of a destination are created as needed
//! - a missing source fails with a not-found error before any compute
//! - the destination path is returned on success
//!
//! `profile` is declared but not built yet and fails accordingly.

pub mod excel;
pub mod sql;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use polars_sql::SQLContext;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{Result, TabverError};

use self::sql::{validate_identifier, SqlFragment};

/// Engine executing imports, transforms and stats over Parquet artifacts.
///
/// Stateless: each call reads its source, computes, and writes its
/// destination. No connection or cache survives between calls.
#[derive(Debug, Clone, Default)]
pub struct SqlEngine;

impl SqlEngine {
    pub fn new() -> Self {
        Self
    }

    // ---------------------------
    // Imports
    // ---------------------------

    /// Import a CSV file into a Parquet artifact at `out_path`.
    pub fn import_csv(&self, csv_path: &Path, out_path: &Path) -> Result<PathBuf> {
        if !csv_path.is_file() {
            return Err(TabverError::file_not_found("csv file", csv_path));
        }

        let file = File::open(csv_path)?;
        let mut df = CsvReader::new(file).finish()?;
        self.write_artifact(&mut df, out_path)?;

        debug!(rows = df.height(), out = %out_path.display(), "imported csv");
        Ok(out_path.to_path_buf())
    }

    /// Import an Excel workbook sheet into a Parquet artifact at `out_path`.
    ///
    /// Reads the named `sheet` if given, otherwise the first sheet.
    pub fn import_xlsx(
        &self,
        xlsx_path: &Path,
        out_path: &Path,
        sheet: Option<&str>,
    ) -> Result<PathBuf> {
        if !xlsx_path.is_file() {
            return Err(TabverError::file_not_found("xlsx file", xlsx_path));
        }

        let mut df = excel::read_workbook(xlsx_path, sheet)?;
        self.write_artifact(&mut df, out_path)?;

        debug!(rows = df.height(), out = %out_path.display(), "imported xlsx");
        Ok(out_path.to_path_buf())
    }

    // ---------------------------
    // Basic queries
    // ---------------------------

    /// Materialize at most `limit` rows of an artifact.
    pub fn preview(&self, artifact: &Path, limit: usize) -> Result<DataFrame> {
        let df = self.read_artifact(artifact)?;
        Ok(df.head(Some(limit)))
    }

    /// Filter rows with a SQL predicate and write a new artifact.
    ///
    /// `where_expr` is SQL text by design; see [`sql`] for the trust
    /// boundary.
    pub fn filter(&self, artifact: &Path, where_expr: &str, out_path: &Path) -> Result<PathBuf> {
        let predicate = SqlFragment::raw(where_expr);
        let query = format!("SELECT * FROM data WHERE {predicate}");
        let mut df = self.sql_over_artifact(artifact, &query)?;
        self.write_artifact(&mut df, out_path)?;

        debug!(rows = df.height(), out = %out_path.display(), "filtered rows");
        Ok(out_path.to_path_buf())
    }

    /// Average of a column, optionally restricted by a SQL predicate.
    ///
    /// Fails with [`TabverError::UndefinedMean`] when no rows match or every
    /// value is null; callers never see a numeric sentinel.
    pub fn mean(&self, artifact: &Path, column: &str, where_expr: Option<&str>) -> Result<f64> {
        let column_ident = SqlFragment::ident(column)?;
        let mut query = format!("SELECT AVG({column_ident}) AS mean_value FROM data");
        if let Some(where_expr) = where_expr {
            let predicate = SqlFragment::raw(where_expr);
            query.push_str(&format!(" WHERE {predicate}"));
        }

        let df = self.sql_over_artifact(artifact, &query)?;
        let mean = df
            .column("mean_value")?
            .as_materialized_series()
            .cast(&DataType::Float64)?;

        mean.f64()?.get(0).ok_or_else(|| TabverError::UndefinedMean {
            column: column.to_string(),
        })
    }

    // ---------------------------
    // Transforms
    // ---------------------------

    /// Clamp a numeric column to its `[p_low, p_high]` quantiles and write a
    /// new artifact.
    ///
    /// With `out_column` the clamped values land in a new column; without it
    /// the source column is replaced.
    pub fn winsorize(
        &self,
        artifact: &Path,
        column: &str,
        p_low: f64,
        p_high: f64,
        out_column: Option<&str>,
        out_path: &Path,
    ) -> Result<PathBuf> {
        validate_identifier(column)?;
        let out_name = match out_column {
            Some(name) => validate_identifier(name)?,
            None => column,
        };
        if !(0.0..=1.0).contains(&p_low) || !(0.0..=1.0).contains(&p_high) || p_low >= p_high {
            return Err(TabverError::invalid(format!(
                "percentiles must satisfy 0 <= p_low < p_high <= 1 (got p_low={p_low}, p_high={p_high})"
            )));
        }

        let df = self.read_artifact(artifact)?;
        let lo = col(column).quantile(lit(p_low), QuantileMethod::Linear);
        let hi = col(column).quantile(lit(p_high), QuantileMethod::Linear);
        let clamped = when(col(column).lt(lo.clone()))
            .then(lo)
            .when(col(column).gt(hi.clone()))
            .then(hi)
            .otherwise(col(column))
            .alias(out_name);

        let mut out = df.lazy().with_column(clamped).collect()?;
        self.write_artifact(&mut out, out_path)?;

        debug!(rows = out.height(), out = %out_path.display(), "winsorized column");
        Ok(out_path.to_path_buf())
    }

    /// Recode a column through a value mapping and write a new artifact.
    ///
    /// Mapping keys compare against the source value's textual form, so
    /// `{"1": 10}` recodes integer `1`. Values bind as typed literals, never
    /// as SQL text. Unmapped source values become null: the recoded column's
    /// type need not admit the original values.
    pub fn recode(
        &self,
        artifact: &Path,
        column: &str,
        mapping: &serde_json::Map<String, JsonValue>,
        out_column: Option<&str>,
        out_path: &Path,
    ) -> Result<PathBuf> {
        validate_identifier(column)?;
        let out_name = match out_column {
            Some(name) => validate_identifier(name)?,
            None => column,
        };
        if mapping.is_empty() {
            return Err(TabverError::invalid("recode mapping is empty"));
        }

        let mut recoded: Expr = lit(NULL);
        for (key, value) in mapping {
            let matches = col(column).cast(DataType::String).eq(lit(key.as_str()));
            recoded = when(matches).then(json_literal(value)?).otherwise(recoded);
        }

        let df = self.read_artifact(artifact)?;
        let mut out = df.lazy().with_column(recoded.alias(out_name)).collect()?;
        self.write_artifact(&mut out, out_path)?;

        debug!(rows = out.height(), out = %out_path.display(), "recoded column");
        Ok(out_path.to_path_buf())
    }

    /// Column profiling. Not built yet.
    pub fn profile(&self, _artifact: &Path) -> Result<DataFrame> {
        Err(TabverError::Unimplemented("profile"))
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn read_artifact(&self, path: &Path) -> Result<DataFrame> {
        if !path.is_file() {
            return Err(TabverError::file_not_found("artifact", path));
        }
        let file = File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }

    fn write_artifact(&self, df: &mut DataFrame, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(out_path)?;
        ParquetWriter::new(file).finish(df)?;
        Ok(())
    }

    /// Run one SQL query with the artifact registered as table `data`.
    fn sql_over_artifact(&self, path: &Path, query: &str) -> Result<DataFrame> {
        let df = self.read_artifact(path)?;
        let mut ctx = SQLContext::new();
        ctx.register("data", df.lazy());
        debug!(%query, "executing sql");
        Ok(ctx.execute(query)?.collect()?)
    }
}

/// Convert a JSON mapping value into a typed literal expression.
fn json_literal(value: &JsonValue) -> Result<Expr> {
    match value {
        JsonValue::Null => Ok(lit(NULL)),
        JsonValue::Bool(b) => Ok(lit(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(lit(i))
            } else if let Some(f) = n.as_f64() {
                Ok(lit(f))
            } else {
                Err(TabverError::invalid(format!(
                    "recode mapping value {n} is out of range"
                )))
            }
        }
        JsonValue::String(s) => Ok(lit(s.as_str())),
        JsonValue::Array(_) | JsonValue::Object(_) => Err(TabverError::invalid(
            "recode mapping values must be scalars (string/number/bool/null)",
        )),
    }
}
