use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, Envelope, Page, Pagination, Query, unwrap_envelope};
use crate::domain::{
    Classification, Dataset, DatasetId, DatasetPreview, DatasetRating, Maturity, Visualization,
};
use crate::error::DatamartError;
use crate::search::{FacetCount, Facets, SearchFilters, SortKey, SortOrder};
use crate::transform::normalize_dataset;

/// Query parameters for the paginated dataset listing.
#[derive(Debug, Clone, Default)]
pub struct DatasetQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub classification: Option<Classification>,
    pub maturity: Option<Maturity>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub tags: Vec<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetPage {
    pub datasets: Vec<Dataset>,
    pub pagination: Pagination,
}

/// Server-side search response: ranked datasets plus facet counts.
#[derive(Debug, Clone)]
pub struct RemoteSearchResult {
    pub datasets: Vec<Dataset>,
    pub total_count: u64,
    pub facets: Facets,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    pub total_views: u64,
    pub total_downloads: u64,
    pub total_ratings: u64,
    pub average_rating: f64,
    pub total_bookmarks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Csv,
    Json,
    Excel,
}

impl std::fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadFormat::Csv => write!(f, "csv"),
            DownloadFormat::Json => write!(f, "json"),
            DownloadFormat::Excel => write!(f, "excel"),
        }
    }
}

/// Dataset operations of the marketplace API.
pub trait CatalogClient: Send + Sync {
    fn list(&self, query: &DatasetQuery) -> Result<DatasetPage, DatamartError>;
    fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<RemoteSearchResult, DatamartError>;
    fn get(&self, id: &DatasetId) -> Result<Dataset, DatamartError>;
    fn featured(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError>;
    fn popular(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError>;
    fn recent(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError>;
    fn related(&self, id: &DatasetId, limit: u32) -> Result<Vec<Dataset>, DatamartError>;
    fn preview(&self, id: &DatasetId, limit: u32) -> Result<DatasetPreview, DatamartError>;
    fn visualizations(&self, id: &DatasetId) -> Result<Vec<Visualization>, DatamartError>;
    fn ratings(
        &self,
        id: &DatasetId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<DatasetRating>, DatamartError>;
    fn submit_rating(
        &self,
        id: &DatasetId,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError>;
    fn update_rating(
        &self,
        id: &DatasetId,
        rating_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError>;
    fn delete_rating(&self, id: &DatasetId, rating_id: &str) -> Result<(), DatamartError>;
    fn add_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError>;
    fn remove_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError>;
    fn record_view(&self, id: &DatasetId) -> Result<(), DatamartError>;
    fn recent_views(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError>;
    fn download(&self, id: &DatasetId, format: DownloadFormat) -> Result<Vec<u8>, DatamartError>;
    fn download_url(&self, id: &DatasetId, format: DownloadFormat) -> Result<String, DatamartError>;
    fn stats(&self, id: &DatasetId) -> Result<DatasetStats, DatamartError>;
    fn categories(&self) -> Result<Vec<FacetCount>, DatamartError>;
    fn tags(&self, limit: u32) -> Result<Vec<FacetCount>, DatamartError>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
    api: ApiClient,
}

impl HttpCatalogClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn dataset_list(&self, endpoint: &str, query: &Query) -> Result<Vec<Dataset>, DatamartError> {
        let envelope: Envelope<Vec<Value>> = self.api.get(endpoint, query)?;
        Ok(unwrap_envelope(envelope)?
            .iter()
            .map(normalize_dataset)
            .collect())
    }

    fn not_found(id: &DatasetId, err: DatamartError) -> DatamartError {
        match err {
            DatamartError::ApiStatus { status: 404, .. } => {
                DatamartError::DatasetNotFound(id.to_string())
            }
            other => other,
        }
    }
}

#[derive(Debug, Serialize)]
struct RatingBody<'a> {
    rating: u8,
    comment: &'a str,
}

impl CatalogClient for HttpCatalogClient {
    fn list(&self, query: &DatasetQuery) -> Result<DatasetPage, DatamartError> {
        let params = Query::new()
            .add_opt("page", query.page)
            .add_opt("pageSize", query.page_size)
            .add_opt("search", query.search.as_deref())
            .add_opt("category", query.category.as_deref())
            .add_opt("classification", query.classification.map(|c| c.to_string()))
            .add_opt("maturity", query.maturity.map(|m| m.to_string()))
            .add_opt("sortBy", query.sort_by)
            .add_opt("sortOrder", query.sort_order)
            .add_list("tags", query.tags.iter())
            .add_opt("organizationId", query.organization_id.as_deref());

        let page: Page<Value> = self.api.get("/datasets", &params)?;
        Ok(DatasetPage {
            datasets: page.data.iter().map(normalize_dataset).collect(),
            pagination: page.pagination,
        })
    }

    fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<RemoteSearchResult, DatamartError> {
        let params = Query::new()
            .add("q", query)
            .add_list("categories", filters.categories.iter())
            .add_list(
                "classifications",
                filters.classifications.iter().map(|c| c.to_string()),
            )
            .add_list("maturity", filters.maturity.iter().map(|m| m.to_string()))
            .add_opt("qualityMin", filters.quality_range.map(|r| r.min))
            .add_opt("qualityMax", filters.quality_range.map(|r| r.max))
            .add_opt(
                "dateStart",
                filters.date_range.map(|r| r.start.to_rfc3339()),
            )
            .add_opt("dateEnd", filters.date_range.map(|r| r.end.to_rfc3339()))
            .add_list("organizations", filters.organizations.iter())
            .add_list("tags", filters.tags.iter());

        let envelope: Envelope<Value> = self.api.get("/datasets/search", &params)?;
        let data = unwrap_envelope(envelope)?;

        let datasets = data
            .get("datasets")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(normalize_dataset).collect())
            .unwrap_or_default();
        let total_count = data
            .get("totalCount")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let facets = data
            .get("facets")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        Ok(RemoteSearchResult {
            datasets,
            total_count,
            facets,
        })
    }

    fn get(&self, id: &DatasetId) -> Result<Dataset, DatamartError> {
        let envelope: Envelope<Value> = self
            .api
            .get(&format!("/datasets/{id}"), &Query::new())
            .map_err(|err| Self::not_found(id, err))?;
        Ok(normalize_dataset(&unwrap_envelope(envelope)?))
    }

    fn featured(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        self.dataset_list("/datasets/featured", &Query::new().add("limit", limit))
    }

    fn popular(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        self.dataset_list("/datasets/popular", &Query::new().add("limit", limit))
    }

    fn recent(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        self.dataset_list("/datasets/recent", &Query::new().add("limit", limit))
    }

    fn related(&self, id: &DatasetId, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        self.dataset_list(
            &format!("/datasets/{id}/related"),
            &Query::new().add("limit", limit),
        )
        .map_err(|err| Self::not_found(id, err))
    }

    fn preview(&self, id: &DatasetId, limit: u32) -> Result<DatasetPreview, DatamartError> {
        let envelope: Envelope<DatasetPreview> = self
            .api
            .get(
                &format!("/datasets/{id}/preview"),
                &Query::new().add("limit", limit),
            )
            .map_err(|err| Self::not_found(id, err))?;
        unwrap_envelope(envelope)
    }

    fn visualizations(&self, id: &DatasetId) -> Result<Vec<Visualization>, DatamartError> {
        let envelope: Envelope<Vec<Visualization>> = self
            .api
            .get(&format!("/datasets/{id}/visualizations"), &Query::new())
            .map_err(|err| Self::not_found(id, err))?;
        unwrap_envelope(envelope)
    }

    fn ratings(
        &self,
        id: &DatasetId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<DatasetRating>, DatamartError> {
        self.api
            .get(
                &format!("/datasets/{id}/ratings"),
                &Query::new().add("page", page).add("pageSize", page_size),
            )
            .map_err(|err| Self::not_found(id, err))
    }

    fn submit_rating(
        &self,
        id: &DatasetId,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError> {
        let envelope: Envelope<DatasetRating> = self
            .api
            .post(&format!("/datasets/{id}/ratings"), &RatingBody { rating, comment })
            .map_err(|err| Self::not_found(id, err))?;
        unwrap_envelope(envelope)
    }

    fn update_rating(
        &self,
        id: &DatasetId,
        rating_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError> {
        let envelope: Envelope<DatasetRating> = self.api.put(
            &format!("/datasets/{id}/ratings/{rating_id}"),
            &RatingBody { rating, comment },
        )?;
        unwrap_envelope(envelope)
    }

    fn delete_rating(&self, id: &DatasetId, rating_id: &str) -> Result<(), DatamartError> {
        self.api
            .delete(&format!("/datasets/{id}/ratings/{rating_id}"))
    }

    fn add_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError> {
        let _: Value = self
            .api
            .post(&format!("/datasets/{id}/bookmark"), &Value::Null)
            .map_err(|err| Self::not_found(id, err))?;
        Ok(())
    }

    fn remove_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError> {
        self.api.delete(&format!("/datasets/{id}/bookmark"))
    }

    fn record_view(&self, id: &DatasetId) -> Result<(), DatamartError> {
        let _: Value = self
            .api
            .post(&format!("/datasets/{id}/view"), &Value::Null)?;
        Ok(())
    }

    fn recent_views(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        self.dataset_list("/datasets/recent-views", &Query::new().add("limit", limit))
    }

    fn download(&self, id: &DatasetId, format: DownloadFormat) -> Result<Vec<u8>, DatamartError> {
        self.api
            .get_bytes(
                &format!("/datasets/{id}/download"),
                &Query::new().add("format", format),
            )
            .map_err(|err| Self::not_found(id, err))
    }

    fn download_url(&self, id: &DatasetId, format: DownloadFormat) -> Result<String, DatamartError> {
        #[derive(Deserialize)]
        struct DownloadUrl {
            url: String,
        }
        let envelope: Envelope<DownloadUrl> = self
            .api
            .get(
                &format!("/datasets/{id}/download-url"),
                &Query::new().add("format", format),
            )
            .map_err(|err| Self::not_found(id, err))?;
        Ok(unwrap_envelope(envelope)?.url)
    }

    fn stats(&self, id: &DatasetId) -> Result<DatasetStats, DatamartError> {
        let envelope: Envelope<DatasetStats> = self
            .api
            .get(&format!("/datasets/{id}/stats"), &Query::new())
            .map_err(|err| Self::not_found(id, err))?;
        unwrap_envelope(envelope)
    }

    fn categories(&self) -> Result<Vec<FacetCount>, DatamartError> {
        let envelope: Envelope<Vec<FacetCount>> = self.api.get("/datasets/categories", &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn tags(&self, limit: u32) -> Result<Vec<FacetCount>, DatamartError> {
        let envelope: Envelope<Vec<FacetCount>> = self
            .api
            .get("/datasets/tags", &Query::new().add("limit", limit))?;
        unwrap_envelope(envelope)
    }
}
