use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::domain::{
    Classification, DataContact, Dataset, DatasetId, DatasetMetrics, DatasetPreview, DatasetRating,
    Lifecycle, Maturity, RelatedDataset, Visualization,
};

const DEFAULT_COMPLETENESS: u8 = 85;
const DEFAULT_ACCURACY: u8 = 90;
const DEFAULT_TIMELINESS: u8 = 95;

/// Maps a raw catalog record into the normalized [`Dataset`] shape.
///
/// Upstream systems disagree on field names (`GDSId` vs `id`,
/// `GoldenDataSetName` vs `name`, ...), so every field is resolved through a
/// fallback chain with a safe default. Never fails: unusable values degrade
/// to defaults instead of propagating parse errors.
pub fn normalize_dataset(raw: &Value) -> Dataset {
    let name = text_field(raw, &["GoldenDataSetName", "name"], "Unnamed Dataset");
    let description = text_field(
        raw,
        &["DataDescription", "description"],
        "No description available",
    );
    let data_owner = contact(
        raw,
        &["DataOwnerID", "data_owner_id"],
        &["DataOwnerName"],
        "dataOwner",
        "Unknown Owner",
    );
    let data_steward = contact(
        raw,
        &["DataStewardID", "data_steward_id"],
        &["DataStewardName"],
        "dataSteward",
        "Unknown Steward",
    );
    let tags = string_list(raw, "tags");
    let data_element_count = count_field(raw, &["NbDataElements", "numberOfDataElements"]);

    let quality_score = quality_score(
        &description,
        &data_owner,
        &data_steward,
        &tags,
        data_element_count,
    );
    let metrics_raw = raw.get("metrics");
    let metrics = DatasetMetrics {
        quality_score,
        completeness: metric_field(metrics_raw, "completeness", DEFAULT_COMPLETENESS),
        accuracy: metric_field(metrics_raw, "accuracy", DEFAULT_ACCURACY),
        timeliness: metric_field(metrics_raw, "timeliness", DEFAULT_TIMELINESS),
        usage_count: metrics_raw
            .and_then(|m| m.get("usageCount"))
            .and_then(Value::as_u64)
            .map(|n| n.min(u64::from(u32::MAX)) as u32)
            .unwrap_or(0),
        average_rating: metrics_raw
            .and_then(|m| m.get("averageRating"))
            .and_then(Value::as_f64)
            .map(|r| r.clamp(0.0, 5.0))
            .unwrap_or(0.0),
    };

    Dataset {
        id: dataset_id(raw),
        technical_id: text_field(raw, &["SourceSysId", "technicalId"], "unknown"),
        source_sys_id: text_field(raw, &["SourceSysId", "sourceSysId"], "unknown"),
        source_sys_name: text_field(raw, &["SourceSysName", "sourceSysName"], "Unknown"),
        name,
        description,
        business_line: text_field(raw, &["BusinessLine", "businessLine"], "Unknown"),
        business_entity: text_field(raw, &["BusinessEntity", "businessEntity"], "Unknown"),
        maturity: enum_field(raw, &["Maturity", "maturity"], Maturity::Draft),
        lifecycle: enum_field(raw, &["DataLifecycle", "dataLifecycle"], Lifecycle::Active),
        classification: enum_field(
            raw,
            &["DataClassification", "dataClassification"],
            Classification::Internal,
        ),
        location: text_field(raw, &["Location", "location"], "Unknown"),
        domain: text_field(raw, &["dataDomain", "DataDomain"], "General"),
        sub_domain: text_field(raw, &["DataSubDomain", "dataSubDomain"], "General"),
        data_owner,
        data_steward,
        historical_data: flag_field(raw, &["HistoricalData", "historicalData"]),
        data_element_count,
        created_at: date_field(raw, "createdAt"),
        updated_at: date_field(raw, "updatedAt"),
        tags,
        metrics,
        preview: raw
            .get("preview")
            .and_then(|v| serde_json::from_value::<DatasetPreview>(v.clone()).ok()),
        visualizations: typed_list::<Visualization>(raw, "visualizations"),
        related_datasets: typed_list::<RelatedDataset>(raw, "relatedDatasets"),
        ratings: typed_list::<DatasetRating>(raw, "ratings"),
    }
}

/// Derived quality score: base 70, bumped for completeness signals, clamped
/// to [0, 100].
fn quality_score(
    description: &str,
    owner: &DataContact,
    steward: &DataContact,
    tags: &[String],
    element_count: u32,
) -> u8 {
    let mut score: u32 = 70;
    if description.len() > 50 {
        score += 10;
    }
    if owner.name != "Unknown Owner" {
        score += 5;
    }
    if steward.name != "Unknown Steward" {
        score += 5;
    }
    if !tags.is_empty() {
        score += 5;
    }
    if element_count > 0 {
        score += 5;
    }
    score.min(100) as u8
}

fn dataset_id(raw: &Value) -> DatasetId {
    DatasetId::from_raw(&text_field(raw, &["GDSId", "id"], "unknown"))
}

fn text_field(raw: &Value, keys: &[&str], default: &str) -> String {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| default.to_string())
}

fn enum_field<E: std::str::FromStr>(raw: &Value, keys: &[&str], default: E) -> E {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .filter_map(Value::as_str)
        .find_map(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Boolean coercion: accepts real booleans plus "true"/"yes"/"1" strings.
fn flag_field(raw: &Value, keys: &[&str]) -> bool {
    keys.iter().filter_map(|key| raw.get(key)).any(|v| match v {
        Value::Bool(b) => *b,
        Value::String(s) => {
            let lower = s.trim().to_lowercase();
            lower == "true" || lower == "yes" || lower == "1"
        }
        _ => false,
    })
}

fn count_field(raw: &Value, keys: &[&str]) -> u32 {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
        .map(|n| n.min(u64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

fn metric_field(metrics: Option<&Value>, key: &str, default: u8) -> u8 {
    metrics
        .and_then(|m| m.get(key))
        .and_then(Value::as_u64)
        .map(|n| n.min(100) as u8)
        .unwrap_or(default)
}

fn date_field(raw: &Value, key: &str) -> DateTime<Utc> {
    raw.get(key)
        .and_then(Value::as_str)
        .and_then(parse_datetime)
        .unwrap_or_else(Utc::now)
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn string_list(raw: &Value, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn typed_list<T: serde::de::DeserializeOwned>(raw: &Value, key: &str) -> Vec<T> {
    raw.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn contact(
    raw: &Value,
    id_keys: &[&str],
    name_keys: &[&str],
    nested_key: &str,
    default_name: &str,
) -> DataContact {
    let nested = raw.get(nested_key);
    let id = id_keys
        .iter()
        .filter_map(|key| raw.get(key))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .or_else(|| {
            nested
                .and_then(|v| v.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".to_string());
    let name = name_keys
        .iter()
        .filter_map(|key| raw.get(key))
        .filter_map(Value::as_str)
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
        .or_else(|| {
            nested
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| default_name.to_string());
    DataContact {
        id,
        name,
        email: nested
            .and_then(|v| v.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string),
        department: nested
            .and_then(|v| v.get("department"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalize_source_system_field_names() {
        let raw = json!({
            "GDSId": "GDS-77",
            "SourceSysId": "SYSUID.606733",
            "SourceSysName": "Domo GRC",
            "GoldenDataSetName": "Customer Analytics Dataset",
            "DataDescription": "Comprehensive customer behavior and transaction data for business insights",
            "BusinessLine": "Analytics",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Internal",
            "DataOwnerName": "Analytics Team Lead",
            "DataStewardName": "Data Steward",
            "NbDataElements": "156",
            "HistoricalData": "Yes",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-15T00:00:00Z",
            "tags": ["customer", "analytics"]
        });

        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.id.as_str(), "GDS-77");
        assert_eq!(dataset.name, "Customer Analytics Dataset");
        assert_eq!(dataset.source_sys_name, "Domo GRC");
        assert_eq!(dataset.maturity, Maturity::Published);
        assert_eq!(dataset.lifecycle, Lifecycle::Active);
        assert_eq!(dataset.classification, Classification::Internal);
        assert_eq!(dataset.data_element_count, 156);
        assert!(dataset.historical_data);
        assert_eq!(dataset.tags, vec!["customer", "analytics"]);
    }

    #[test]
    fn normalize_client_field_names() {
        let raw = json!({
            "id": "ds-9",
            "name": "Branch Footfall",
            "description": "short",
            "dataDomain": "Retail",
            "maturity": "draft",
            "dataClassification": "restricted",
            "dataOwner": {"id": "o1", "name": "Retail Ops", "email": "ops@corp.example"},
        });

        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.id.as_str(), "ds-9");
        assert_eq!(dataset.domain, "Retail");
        assert_eq!(dataset.maturity, Maturity::Draft);
        assert_eq!(dataset.classification, Classification::Restricted);
        assert_eq!(dataset.data_owner.name, "Retail Ops");
        assert_eq!(dataset.data_owner.email.as_deref(), Some("ops@corp.example"));
    }

    #[test]
    fn defaults_applied_for_missing_fields() {
        let dataset = normalize_dataset(&json!({"id": "ds-1"}));
        assert_eq!(dataset.name, "Unnamed Dataset");
        assert_eq!(dataset.description, "No description available");
        assert_eq!(dataset.domain, "General");
        assert_eq!(dataset.maturity, Maturity::Draft);
        assert_eq!(dataset.lifecycle, Lifecycle::Active);
        assert_eq!(dataset.classification, Classification::Internal);
        assert_eq!(dataset.data_owner.name, "Unknown Owner");
        assert_eq!(dataset.metrics.completeness, DEFAULT_COMPLETENESS);
        assert_eq!(dataset.metrics.accuracy, DEFAULT_ACCURACY);
        assert_eq!(dataset.metrics.timeliness, DEFAULT_TIMELINESS);
        assert!(!dataset.historical_data);
    }

    #[test]
    fn quality_score_base_for_bare_record() {
        let dataset = normalize_dataset(&json!({"id": "ds-1"}));
        assert_eq!(dataset.metrics.quality_score, 70);
    }

    #[test]
    fn quality_score_full_credit() {
        let raw = json!({
            "id": "ds-2",
            "description": "A long-form description that comfortably exceeds the fifty character bar.",
            "DataOwnerName": "Finance Director",
            "DataStewardName": "Financial Data Steward",
            "tags": ["finance"],
            "numberOfDataElements": 89
        });
        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.metrics.quality_score, 100);
    }

    #[test]
    fn unknown_enum_values_fall_back() {
        let raw = json!({
            "id": "ds-3",
            "maturity": "mystery",
            "dataLifecycle": "limbo",
            "dataClassification": "double secret"
        });
        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.maturity, Maturity::Draft);
        assert_eq!(dataset.lifecycle, Lifecycle::Active);
        assert_eq!(dataset.classification, Classification::Internal);
    }

    #[test]
    fn average_rating_clamped_to_scale() {
        let raw = json!({
            "id": "ds-4",
            "metrics": {"averageRating": 9.4, "usageCount": 12}
        });
        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.metrics.average_rating, 5.0);
        assert_eq!(dataset.metrics.usage_count, 12);
    }

    #[test]
    fn plain_date_accepted() {
        let raw = json!({"id": "ds-5", "updatedAt": "2024-02-01"});
        let dataset = normalize_dataset(&raw);
        assert_eq!(dataset.updated_at.to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }
}
