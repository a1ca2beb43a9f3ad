use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DatamartError;

/// Publication stage of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Maturity {
    #[serde(rename = "Draft")]
    Draft,
    #[serde(rename = "Prepared for distribution")]
    PreparedForDistribution,
    #[serde(rename = "Published")]
    Published,
    #[serde(rename = "Deprecated")]
    Deprecated,
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maturity::Draft => write!(f, "Draft"),
            Maturity::PreparedForDistribution => write!(f, "Prepared for distribution"),
            Maturity::Published => write!(f, "Published"),
            Maturity::Deprecated => write!(f, "Deprecated"),
        }
    }
}

impl FromStr for Maturity {
    type Err = DatamartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "draft" => Ok(Maturity::Draft),
            "prepared" | "prepared for distribution" => Ok(Maturity::PreparedForDistribution),
            "published" => Ok(Maturity::Published),
            "deprecated" => Ok(Maturity::Deprecated),
            other => Err(DatamartError::ResponseParse(format!(
                "unknown maturity level: {other}"
            ))),
        }
    }
}

/// Lifecycle state of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Lifecycle {
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Archived")]
    Archived,
    #[serde(rename = "Deprecated")]
    Deprecated,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Active => write!(f, "Active"),
            Lifecycle::Archived => write!(f, "Archived"),
            Lifecycle::Deprecated => write!(f, "Deprecated"),
        }
    }
}

impl FromStr for Lifecycle {
    type Err = DatamartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "active" => Ok(Lifecycle::Active),
            "archived" => Ok(Lifecycle::Archived),
            "deprecated" => Ok(Lifecycle::Deprecated),
            other => Err(DatamartError::ResponseParse(format!(
                "unknown lifecycle status: {other}"
            ))),
        }
    }
}

/// Sensitivity tier governing handling rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Classification {
    #[serde(rename = "Public")]
    Public,
    #[serde(rename = "Internal")]
    Internal,
    #[serde(rename = "Confidential")]
    Confidential,
    #[serde(rename = "Sensitive personal data")]
    SensitivePersonalData,
    #[serde(rename = "Restricted")]
    Restricted,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Public => write!(f, "Public"),
            Classification::Internal => write!(f, "Internal"),
            Classification::Confidential => write!(f, "Confidential"),
            Classification::SensitivePersonalData => write!(f, "Sensitive personal data"),
            Classification::Restricted => write!(f, "Restricted"),
        }
    }
}

impl FromStr for Classification {
    type Err = DatamartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "public" => Ok(Classification::Public),
            "internal" => Ok(Classification::Internal),
            "confidential" => Ok(Classification::Confidential),
            "sensitive" | "sensitive personal data" => Ok(Classification::SensitivePersonalData),
            "restricted" => Ok(Classification::Restricted),
            other => Err(DatamartError::ResponseParse(format!(
                "unknown classification: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Viewer,
    Contributor,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Viewer => write!(f, "viewer"),
            UserRole::Contributor => write!(f, "contributor"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

/// Stable catalog identifier of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Infallible constructor for already-fetched records whose raw ids may
    /// be messy; empty input degrades to "unknown".
    pub(crate) fn from_raw(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self("unknown".to_string())
        } else {
            Self(trimmed.to_string())
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetId {
    type Err = DatamartError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
            return Err(DatamartError::InvalidDatasetId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Owner or steward reference on a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataContact {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetrics {
    pub quality_score: u8,
    pub completeness: u8,
    pub accuracy: u8,
    pub timeliness: u8,
    pub usage_count: u32,
    pub average_rating: f64,
}

impl DatasetMetrics {
    pub fn is_valid(&self) -> bool {
        self.quality_score <= 100
            && self.completeness <= 100
            && self.accuracy <= 100
            && self.timeliness <= 100
            && (0.0..=5.0).contains(&self.average_rating)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewColumn {
    pub name: String,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub sample_values: Vec<Value>,
}

impl PreviewColumn {
    /// Header label for exports: business name when present, technical name otherwise.
    pub fn display_name(&self) -> &str {
        if self.business_name.is_empty() {
            &self.name
        } else {
            &self.business_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPreview {
    pub columns: Vec<PreviewColumn>,
    pub sample_data: Vec<Vec<Value>>,
    pub row_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationKind {
    Chart,
    Graph,
    Map,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visualization {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VisualizationKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Similar,
    Derived,
    Parent,
    Child,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedDataset {
    pub id: String,
    pub name: String,
    #[serde(rename = "relationshipType")]
    pub relationship: RelationshipKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRating {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A cataloged data asset with governance metadata and quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: DatasetId,
    pub technical_id: String,
    pub source_sys_id: String,
    pub source_sys_name: String,
    pub name: String,
    pub description: String,
    pub business_line: String,
    pub business_entity: String,
    pub maturity: Maturity,
    pub lifecycle: Lifecycle,
    pub classification: Classification,
    pub location: String,
    pub domain: String,
    pub sub_domain: String,
    pub data_owner: DataContact,
    pub data_steward: DataContact,
    pub historical_data: bool,
    pub data_element_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub metrics: DatasetMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<DatasetPreview>,
    #[serde(default)]
    pub visualizations: Vec<Visualization>,
    #[serde(default)]
    pub related_datasets: Vec<RelatedDataset>,
    #[serde(default)]
    pub ratings: Vec<DatasetRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub verified: bool,
    pub dataset_count: u32,
    pub average_dataset_rating: f64,
    pub active_users: u32,
    pub created_at: DateTime<Utc>,
}

/// The authenticated account held by the session gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}
