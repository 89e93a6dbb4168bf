use std::collections::BTreeMap;

use chrono::Utc;
use tabver::model::DatasetVersion;
use tabver::repository::DatasetRepository;
use tabver::TabverError;

fn version(dataset_id: &str, label: &str) -> DatasetVersion {
    DatasetVersion {
        dataset_id: dataset_id.to_string(),
        version: label.to_string(),
        path: format!("data/datasets/{dataset_id}/{label}/data.parquet"),
        created_at: Utc::now(),
        operation_id: None,
    }
}

#[test]
fn create_dataset_twice_fails_with_duplicate() {
    let mut repo = DatasetRepository::new();
    repo.create_dataset("households_2023", "Households", Some("EPH-style survey"))
        .unwrap();

    let err = repo
        .create_dataset("households_2023", "Households again", None)
        .unwrap_err();
    assert!(matches!(err, TabverError::Duplicate { what: "dataset", .. }));
    assert!(err.to_string().contains("households_2023"));
}

#[test]
fn get_dataset_on_missing_id_fails_with_not_found() {
    let repo = DatasetRepository::new();
    let err = repo.get_dataset("nope").unwrap_err();
    assert!(matches!(err, TabverError::NotFound { what: "dataset", .. }));
}

#[test]
fn created_dataset_is_retrievable_with_fields_set() {
    let mut repo = DatasetRepository::new();
    let created = repo
        .create_dataset("households_2023", "Households", None)
        .unwrap();
    assert_eq!(created.dataset_id, "households_2023");
    assert_eq!(created.name, "Households");
    assert_eq!(created.description, None);

    let fetched = repo.get_dataset("households_2023").unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn add_version_twice_fails_and_first_registration_survives() {
    let mut repo = DatasetRepository::new();
    let first = repo.add_version(version("d", "v1")).unwrap();

    let mut second = version("d", "v1");
    second.path = "somewhere/else.parquet".to_string();
    let err = repo.add_version(second).unwrap_err();
    assert!(matches!(err, TabverError::Duplicate { what: "version", .. }));
    assert!(err.to_string().contains("d:v1"));

    assert_eq!(repo.get_version("d", "v1").unwrap(), first);
}

#[test]
fn get_version_on_missing_pair_fails_with_not_found() {
    let mut repo = DatasetRepository::new();
    repo.add_version(version("d", "v1")).unwrap();

    let err = repo.get_version("d", "v2").unwrap_err();
    assert!(matches!(err, TabverError::NotFound { what: "version", .. }));
}

#[test]
fn list_versions_returns_only_that_dataset() {
    let mut repo = DatasetRepository::new();
    repo.add_version(version("d", "v1")).unwrap();
    repo.add_version(version("d", "v2")).unwrap();
    repo.add_version(version("other", "v1")).unwrap();

    let versions = repo.list_versions("d");
    assert_eq!(versions.len(), 2);
    assert!(versions.iter().all(|v| v.dataset_id == "d"));

    assert!(repo.list_versions("unknown").is_empty());
}

#[test]
fn create_operation_twice_fails_with_duplicate() {
    let mut repo = DatasetRepository::new();
    let params = BTreeMap::from([("where".to_string(), "income > 0".to_string())]);
    repo.create_operation("op-1", "filter", params.clone()).unwrap();

    let err = repo.create_operation("op-1", "filter", params).unwrap_err();
    assert!(matches!(err, TabverError::Duplicate { what: "operation", .. }));
}

#[test]
fn orphan_version_is_accepted_without_dataset_check() {
    // Referential integrity is deliberately deferred to the orchestrator's
    // existence checks and a future durable backend.
    let mut repo = DatasetRepository::new();
    repo.add_version(version("never_created", "v1")).unwrap();
    assert_eq!(repo.list_versions("never_created").len(), 1);
}
