use serde_json::json;

use datamart_client::domain::{Classification, Lifecycle, Maturity};
use datamart_client::transform::normalize_dataset;

#[test]
fn golden_record_maps_source_system_names() {
    let raw = json!({
        "GDSId": "GDS-310",
        "SourceSysId": "SYSUID.881102",
        "SourceSysName": "Collateral Register",
        "GoldenDataSetName": "Collateral Positions",
        "DataDescription": "Daily collateral positions per counterparty including haircuts and eligibility flags",
        "BusinessLine": "Risk",
        "BusinessEntity": "Treasury",
        "Maturity": "Prepared for distribution",
        "DataLifecycle": "Active",
        "DataClassification": "Confidential",
        "dataDomain": "Risk Management",
        "DataOwnerID": "owner-310",
        "DataOwnerName": "Treasury Data Owner",
        "DataStewardID": "steward-310",
        "DataStewardName": "Treasury Steward",
        "NbDataElements": "42",
        "HistoricalData": "1",
        "createdAt": "2023-03-05T08:00:00Z",
        "updatedAt": "2024-01-09T08:00:00Z",
        "tags": ["collateral", "risk"]
    });

    let dataset = normalize_dataset(&raw);
    assert_eq!(dataset.id.as_str(), "GDS-310");
    assert_eq!(dataset.maturity, Maturity::PreparedForDistribution);
    assert_eq!(dataset.lifecycle, Lifecycle::Active);
    assert_eq!(dataset.classification, Classification::Confidential);
    assert_eq!(dataset.data_element_count, 42);
    assert!(dataset.historical_data);
    // all completeness signals present
    assert_eq!(dataset.metrics.quality_score, 100);
}

#[test]
fn client_shape_and_nested_contacts() {
    let raw = json!({
        "id": "ds-22",
        "name": "Supplier Ledger",
        "description": "short",
        "dataOwner": {"id": "o-9", "name": "Procurement Lead", "department": "Procurement"},
        "dataSteward": {"id": "s-9", "name": "Procurement Steward"},
        "metrics": {"completeness": 77, "usageCount": 41, "averageRating": 3.6}
    });

    let dataset = normalize_dataset(&raw);
    assert_eq!(dataset.data_owner.department.as_deref(), Some("Procurement"));
    assert_eq!(dataset.data_steward.name, "Procurement Steward");
    assert_eq!(dataset.metrics.completeness, 77);
    assert_eq!(dataset.metrics.usage_count, 41);
    // base 70 + owner 5 + steward 5, description too short, no tags, no elements
    assert_eq!(dataset.metrics.quality_score, 80);
}

#[test]
fn hostile_values_degrade_to_defaults() {
    let raw = json!({
        "id": "ds-31",
        "maturity": 17,
        "dataClassification": ["Restricted"],
        "numberOfDataElements": "many",
        "historicalData": "nope",
        "updatedAt": "not a date",
        "tags": "finance",
        "metrics": {"completeness": 250, "averageRating": -2.0}
    });

    let dataset = normalize_dataset(&raw);
    assert_eq!(dataset.maturity, Maturity::Draft);
    assert_eq!(dataset.classification, Classification::Internal);
    assert_eq!(dataset.data_element_count, 0);
    assert!(!dataset.historical_data);
    assert!(dataset.tags.is_empty());
    assert_eq!(dataset.metrics.completeness, 100);
    assert_eq!(dataset.metrics.average_rating, 0.0);
    assert!(dataset.metrics.is_valid());
}
