//! Direct engine coverage: imports, winsorize/recode semantics, mean edge
//! cases, and the operation contracts (missing sources, parent dirs).

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tabver::engine::SqlEngine;
use tabver::TabverError;

const PEOPLE_CSV: &str = "tests/fixtures/people.csv";

/// Import a CSV into a scratch Parquet artifact and return its path.
fn artifact_from_csv(dir: &Path, csv: &str) -> PathBuf {
    let csv_path = dir.join("input.csv");
    fs::write(&csv_path, csv).unwrap();
    let out = dir.join("artifacts/source/data.parquet");
    SqlEngine::new().import_csv(&csv_path, &out).unwrap()
}

fn f64_column(df: &polars::prelude::DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

fn i64_column(df: &polars::prelude::DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn import_csv_creates_parent_dirs_and_preserves_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();

    let out = tmp.path().join("a/b/c/data.parquet");
    let written = engine.import_csv(Path::new(PEOPLE_CSV), &out).unwrap();
    assert_eq!(written, out);
    assert!(out.is_file());

    let rows = engine.preview(&out, 100).unwrap();
    assert_eq!(rows.height(), 3);
}

#[test]
fn import_csv_missing_source_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let err = SqlEngine::new()
        .import_csv(Path::new("no/such.csv"), &tmp.path().join("out.parquet"))
        .unwrap_err();
    assert!(matches!(err, TabverError::NotFound { .. }));
}

#[test]
fn import_xlsx_missing_source_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let err = SqlEngine::new()
        .import_xlsx(
            Path::new("no/such.xlsx"),
            &tmp.path().join("out.parquet"),
            Some("Sheet1"),
        )
        .unwrap_err();
    assert!(matches!(err, TabverError::NotFound { .. }));
}

#[test]
fn preview_missing_artifact_is_not_found() {
    let err = SqlEngine::new()
        .preview(Path::new("no/such.parquet"), 10)
        .unwrap_err();
    assert!(matches!(err, TabverError::NotFound { .. }));
}

#[test]
fn winsorize_clamps_to_quantile_bounds() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "x\n0.0\n10.0\n1000.0\n");

    let out = tmp.path().join("artifacts/w/data.parquet");
    engine
        .winsorize(&src, "x", 0.0, 0.5, None, &out)
        .unwrap();

    // Median of [0, 10, 1000] is 10; the outlier is clamped down, the rest
    // pass through.
    let df = engine.preview(&out, 100).unwrap();
    assert_eq!(
        f64_column(&df, "x"),
        vec![Some(0.0), Some(10.0), Some(10.0)]
    );
}

#[test]
fn winsorize_with_out_column_keeps_the_source() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "x\n0.0\n10.0\n1000.0\n");

    let out = tmp.path().join("artifacts/w2/data.parquet");
    engine
        .winsorize(&src, "x", 0.0, 0.5, Some("x_w"), &out)
        .unwrap();

    let df = engine.preview(&out, 100).unwrap();
    assert_eq!(
        f64_column(&df, "x"),
        vec![Some(0.0), Some(10.0), Some(1000.0)]
    );
    assert_eq!(
        f64_column(&df, "x_w"),
        vec![Some(0.0), Some(10.0), Some(10.0)]
    );
}

#[test]
fn winsorize_rejects_bad_percentiles_and_identifiers() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "x\n1.0\n");
    let out = tmp.path().join("out.parquet");

    for (p_low, p_high) in [(0.9, 0.1), (0.5, 0.5), (-0.1, 0.9), (0.1, 1.5)] {
        let err = engine
            .winsorize(&src, "x", p_low, p_high, None, &out)
            .unwrap_err();
        assert!(
            matches!(err, TabverError::InvalidArgument(_)),
            "p_low={p_low} p_high={p_high}"
        );
    }

    let err = engine
        .winsorize(&src, "x; drop", 0.1, 0.9, None, &out)
        .unwrap_err();
    assert!(matches!(err, TabverError::InvalidArgument(_)));
}

#[test]
fn recode_maps_by_textual_key_and_nulls_the_rest() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "sex\nM\nF\nX\n");

    let mapping = json!({"M": 1, "F": 0});
    let out = tmp.path().join("artifacts/r/data.parquet");
    engine
        .recode(
            &src,
            "sex",
            mapping.as_object().unwrap(),
            Some("sex_code"),
            &out,
        )
        .unwrap();

    let df = engine.preview(&out, 100).unwrap();
    assert_eq!(
        i64_column(&df, "sex_code"),
        vec![Some(1), Some(0), None]
    );
}

#[test]
fn recode_keys_match_numeric_values_textually() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "region\n1\n2\n3\n");

    let mapping = json!({"1": "north", "2": "south"});
    let out = tmp.path().join("artifacts/r2/data.parquet");
    engine
        .recode(
            &src,
            "region",
            mapping.as_object().unwrap(),
            Some("region_name"),
            &out,
        )
        .unwrap();

    let df = engine.preview(&out, 100).unwrap();
    let names: Vec<Option<&str>> = df
        .column("region_name")
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(names, vec![Some("north"), Some("south"), None]);
}

#[test]
fn recode_rejects_non_scalar_values_and_empty_mappings() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = SqlEngine::new();
    let src = artifact_from_csv(tmp.path(), "sex\nM\n");
    let out = tmp.path().join("out.parquet");

    let nested = json!({"M": [1, 2]});
    let err = engine
        .recode(&src, "sex", nested.as_object().unwrap(), None, &out)
        .unwrap_err();
    assert!(matches!(err, TabverError::InvalidArgument(_)));

    let empty = json!({});
    let err = engine
        .recode(&src, "sex", empty.as_object().unwrap(), None, &out)
        .unwrap_err();
    assert!(matches!(err, TabverError::InvalidArgument(_)));
}

#[test]
fn mean_computes_and_respects_predicates() {
    let engine = SqlEngine::new();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("people.parquet");
    engine.import_csv(Path::new(PEOPLE_CSV), &out).unwrap();

    // AVG ignores the null income.
    let mean = engine.mean(&out, "income", None).unwrap();
    assert!((mean - 1500.0).abs() < f64::EPSILON);

    let mean = engine.mean(&out, "income", Some("income > 1500")).unwrap();
    assert!((mean - 2000.0).abs() < f64::EPSILON);
}

#[test]
fn mean_with_no_matching_rows_is_an_explicit_error() {
    let engine = SqlEngine::new();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("people.parquet");
    engine.import_csv(Path::new(PEOPLE_CSV), &out).unwrap();

    let err = engine
        .mean(&out, "income", Some("income > 99999"))
        .unwrap_err();
    assert!(matches!(err, TabverError::UndefinedMean { .. }));
    assert!(err.to_string().contains("income"));
}

#[test]
fn mean_rejects_malformed_column_identifiers() {
    let engine = SqlEngine::new();
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("people.parquet");
    engine.import_csv(Path::new(PEOPLE_CSV), &out).unwrap();

    let err = engine
        .mean(&out, "income); DROP TABLE data", None)
        .unwrap_err();
    assert!(matches!(err, TabverError::InvalidArgument(_)));
}

#[test]
fn profile_fails_unimplemented() {
    let err = SqlEngine::new()
        .profile(Path::new("whatever.parquet"))
        .unwrap_err();
    assert!(matches!(err, TabverError::Unimplemented("profile")));
    assert!(err.to_string().contains("not implemented"));
}
