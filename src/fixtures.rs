use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::{Value, json};

use crate::api::{Page, Pagination};
use crate::catalog::{
    CatalogClient, DatasetPage, DatasetQuery, DatasetStats, DownloadFormat, RemoteSearchResult,
};
use crate::domain::{Dataset, DatasetId, DatasetPreview, DatasetRating, Visualization};
use crate::error::DatamartError;
use crate::search::{
    self, FacetCount, MIN_QUERY_LEN, SearchFilters, SortKey, SortOrder, relevance_score,
};
use crate::transform::normalize_dataset;

/// Deterministic dataset corpus used by `--mock` mode and tests. Records go
/// through the same transform layer as live API responses.
pub fn sample_datasets() -> Vec<Dataset> {
    corpus().iter().map(normalize_dataset).collect()
}

/// In-memory stand-in for the marketplace catalog, interchangeable with the
/// HTTP client at composition time.
pub struct FixtureCatalog {
    datasets: Mutex<Vec<Dataset>>,
    bookmarks: Mutex<HashSet<String>>,
    views: Mutex<Vec<String>>,
    next_rating: Mutex<u64>,
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self::with_datasets(sample_datasets())
    }

    pub fn with_datasets(datasets: Vec<Dataset>) -> Self {
        Self {
            datasets: Mutex::new(datasets),
            bookmarks: Mutex::new(HashSet::new()),
            views: Mutex::new(Vec::new()),
            next_rating: Mutex::new(1),
        }
    }

    fn datasets(&self) -> Result<MutexGuard<'_, Vec<Dataset>>, DatamartError> {
        lock(&self.datasets)
    }

    fn find(&self, id: &DatasetId) -> Result<Dataset, DatamartError> {
        self.datasets()?
            .iter()
            .find(|dataset| dataset.id == *id)
            .cloned()
            .ok_or_else(|| DatamartError::DatasetNotFound(id.to_string()))
    }

    fn matching_query(datasets: &[Dataset], query: &str) -> Vec<Dataset> {
        let trimmed = query.trim();
        if trimmed.len() < MIN_QUERY_LEN {
            return datasets.to_vec();
        }
        datasets
            .iter()
            .filter(|dataset| relevance_score(dataset, trimmed) > 0)
            .cloned()
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DatamartError> {
    mutex
        .lock()
        .map_err(|_| DatamartError::ApiFailure("fixture state lock poisoned".to_string()))
}

impl CatalogClient for FixtureCatalog {
    fn list(&self, query: &DatasetQuery) -> Result<DatasetPage, DatamartError> {
        let datasets = self.datasets()?;
        let mut matched: Vec<Dataset> = Self::matching_query(
            &datasets,
            query.search.as_deref().unwrap_or_default(),
        )
        .into_iter()
        .filter(|dataset| {
            query
                .category
                .as_ref()
                .is_none_or(|category| dataset.domain == *category)
        })
        .filter(|dataset| {
            query
                .classification
                .is_none_or(|classification| dataset.classification == classification)
        })
        .filter(|dataset| query.maturity.is_none_or(|maturity| dataset.maturity == maturity))
        .filter(|dataset| {
            query.tags.is_empty() || dataset.tags.iter().any(|tag| query.tags.contains(tag))
        })
        .filter(|dataset| {
            query
                .organization_id
                .as_ref()
                .is_none_or(|org| dataset.business_line == *org)
        })
        .collect();
        drop(datasets);

        search::sort_datasets(
            &mut matched,
            query.search.as_deref().unwrap_or_default(),
            query.sort_by.unwrap_or(SortKey::Updated),
            query.sort_order.unwrap_or(SortOrder::Desc),
        );

        let page_size = query.page_size.unwrap_or(search::DEFAULT_PAGE_SIZE).max(1);
        let (page, total_pages, range) =
            search::paginate(matched.len(), query.page.unwrap_or(1), page_size);
        let total_count = matched.len() as u64;
        Ok(DatasetPage {
            datasets: matched[range].to_vec(),
            pagination: Pagination {
                page,
                page_size,
                total_count,
                total_pages,
            },
        })
    }

    fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<RemoteSearchResult, DatamartError> {
        let datasets = self.datasets()?;
        let mut matched: Vec<Dataset> = Self::matching_query(&datasets, query)
            .into_iter()
            .filter(|dataset| search::matches_filters(dataset, filters))
            .collect();
        drop(datasets);

        search::sort_datasets(&mut matched, query, SortKey::Relevance, SortOrder::Desc);
        let facets = search::facets(&matched);
        Ok(RemoteSearchResult {
            total_count: matched.len() as u64,
            datasets: matched,
            facets,
        })
    }

    fn get(&self, id: &DatasetId) -> Result<Dataset, DatamartError> {
        self.find(id)
    }

    fn featured(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        let mut datasets = self.datasets()?.clone();
        search::sort_datasets(&mut datasets, "", SortKey::Quality, SortOrder::Desc);
        datasets.truncate(limit as usize);
        Ok(datasets)
    }

    fn popular(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        let mut datasets = self.datasets()?.clone();
        search::sort_datasets(&mut datasets, "", SortKey::Usage, SortOrder::Desc);
        datasets.truncate(limit as usize);
        Ok(datasets)
    }

    fn recent(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        let mut datasets = self.datasets()?.clone();
        search::sort_datasets(&mut datasets, "", SortKey::Updated, SortOrder::Desc);
        datasets.truncate(limit as usize);
        Ok(datasets)
    }

    fn related(&self, id: &DatasetId, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        let dataset = self.find(id)?;
        let datasets = self.datasets()?;
        let mut related: Vec<Dataset> = dataset
            .related_datasets
            .iter()
            .filter_map(|entry| {
                datasets
                    .iter()
                    .find(|candidate| candidate.id.as_str() == entry.id)
                    .cloned()
            })
            .collect();
        // pad with same-domain neighbours when the explicit links run short
        for candidate in datasets.iter() {
            if related.len() >= limit as usize {
                break;
            }
            if candidate.id != dataset.id
                && candidate.domain == dataset.domain
                && !related.iter().any(|d| d.id == candidate.id)
            {
                related.push(candidate.clone());
            }
        }
        related.truncate(limit as usize);
        Ok(related)
    }

    fn preview(&self, id: &DatasetId, limit: u32) -> Result<DatasetPreview, DatamartError> {
        let dataset = self.find(id)?;
        let mut preview = dataset
            .preview
            .ok_or_else(|| DatamartError::ApiFailure(format!("no preview for {id}")))?;
        preview.sample_data.truncate(limit as usize);
        Ok(preview)
    }

    fn visualizations(&self, id: &DatasetId) -> Result<Vec<Visualization>, DatamartError> {
        Ok(self.find(id)?.visualizations)
    }

    fn ratings(
        &self,
        id: &DatasetId,
        page: u32,
        page_size: u32,
    ) -> Result<Page<DatasetRating>, DatamartError> {
        let ratings = self.find(id)?.ratings;
        let page_size = page_size.max(1);
        let (page, total_pages, range) = search::paginate(ratings.len(), page, page_size);
        Ok(Page {
            data: ratings[range].to_vec(),
            pagination: Pagination {
                page,
                page_size,
                total_count: ratings.len() as u64,
                total_pages,
            },
        })
    }

    fn submit_rating(
        &self,
        id: &DatasetId,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError> {
        let mut next = lock(&self.next_rating)?;
        let rating_id = format!("rating-{:04}", *next);
        *next += 1;
        drop(next);

        let entry = DatasetRating {
            id: rating_id,
            user_id: "admin".to_string(),
            user_name: "Administrator".to_string(),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        };

        let mut datasets = self.datasets()?;
        let dataset = datasets
            .iter_mut()
            .find(|dataset| dataset.id == *id)
            .ok_or_else(|| DatamartError::DatasetNotFound(id.to_string()))?;
        dataset.ratings.push(entry.clone());
        let total: u32 = dataset.ratings.iter().map(|r| u32::from(r.rating)).sum();
        dataset.metrics.average_rating = f64::from(total) / dataset.ratings.len() as f64;
        Ok(entry)
    }

    fn update_rating(
        &self,
        id: &DatasetId,
        rating_id: &str,
        rating: u8,
        comment: &str,
    ) -> Result<DatasetRating, DatamartError> {
        let mut datasets = self.datasets()?;
        let dataset = datasets
            .iter_mut()
            .find(|dataset| dataset.id == *id)
            .ok_or_else(|| DatamartError::DatasetNotFound(id.to_string()))?;
        let entry = dataset
            .ratings
            .iter_mut()
            .find(|entry| entry.id == rating_id)
            .ok_or_else(|| DatamartError::ApiFailure(format!("unknown rating {rating_id}")))?;
        entry.rating = rating;
        entry.comment = comment.to_string();
        Ok(entry.clone())
    }

    fn delete_rating(&self, id: &DatasetId, rating_id: &str) -> Result<(), DatamartError> {
        let mut datasets = self.datasets()?;
        let dataset = datasets
            .iter_mut()
            .find(|dataset| dataset.id == *id)
            .ok_or_else(|| DatamartError::DatasetNotFound(id.to_string()))?;
        dataset.ratings.retain(|entry| entry.id != rating_id);
        Ok(())
    }

    fn add_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError> {
        self.find(id)?;
        lock(&self.bookmarks)?.insert(id.to_string());
        Ok(())
    }

    fn remove_bookmark(&self, id: &DatasetId) -> Result<(), DatamartError> {
        lock(&self.bookmarks)?.remove(id.as_str());
        Ok(())
    }

    fn record_view(&self, id: &DatasetId) -> Result<(), DatamartError> {
        let mut datasets = self.datasets()?;
        let dataset = datasets
            .iter_mut()
            .find(|dataset| dataset.id == *id)
            .ok_or_else(|| DatamartError::DatasetNotFound(id.to_string()))?;
        dataset.metrics.usage_count = dataset.metrics.usage_count.saturating_add(1);
        drop(datasets);
        let mut views = lock(&self.views)?;
        views.retain(|seen| seen != id.as_str());
        views.insert(0, id.to_string());
        Ok(())
    }

    fn recent_views(&self, limit: u32) -> Result<Vec<Dataset>, DatamartError> {
        let views = lock(&self.views)?.clone();
        let datasets = self.datasets()?;
        Ok(views
            .iter()
            .take(limit as usize)
            .filter_map(|id| {
                datasets
                    .iter()
                    .find(|dataset| dataset.id.as_str() == id)
                    .cloned()
            })
            .collect())
    }

    fn download(&self, id: &DatasetId, _format: DownloadFormat) -> Result<Vec<u8>, DatamartError> {
        let dataset = self.find(id)?;
        let csv = match &dataset.preview {
            Some(preview) => crate::export::preview_csv(preview, &preview.sample_data),
            None => crate::export::datasets_csv(std::slice::from_ref(&dataset)),
        };
        Ok(csv.into_bytes())
    }

    fn download_url(&self, id: &DatasetId, format: DownloadFormat) -> Result<String, DatamartError> {
        self.find(id)?;
        Ok(format!("https://files.datamart.example/{id}.{format}"))
    }

    fn stats(&self, id: &DatasetId) -> Result<DatasetStats, DatamartError> {
        let dataset = self.find(id)?;
        let bookmarked = lock(&self.bookmarks)?.contains(id.as_str());
        Ok(DatasetStats {
            total_views: u64::from(dataset.metrics.usage_count),
            total_downloads: u64::from(dataset.metrics.usage_count / 3),
            total_ratings: dataset.ratings.len() as u64,
            average_rating: dataset.metrics.average_rating,
            total_bookmarks: u64::from(bookmarked),
        })
    }

    fn categories(&self) -> Result<Vec<FacetCount>, DatamartError> {
        Ok(search::facets(&self.datasets()?).categories)
    }

    fn tags(&self, limit: u32) -> Result<Vec<FacetCount>, DatamartError> {
        let mut tags = search::facets(&self.datasets()?).tags;
        tags.truncate(limit as usize);
        Ok(tags)
    }
}

fn corpus() -> Vec<Value> {
    vec![
        json!({
            "GDSId": "GDS-001",
            "SourceSysId": "SYSUID.606733",
            "SourceSysName": "Domo GRC",
            "GoldenDataSetName": "Customer Analytics Dataset",
            "DataDescription": "Comprehensive customer behavior and transaction data for business insights and predictive analytics",
            "BusinessLine": "Analytics",
            "BusinessEntity": "Customer Intelligence",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Internal",
            "Location": "Global",
            "dataDomain": "Customer Data",
            "DataSubDomain": "Behavioral Analytics",
            "DataOwnerID": "owner-001",
            "DataOwnerName": "Analytics Team Lead",
            "DataStewardID": "steward-001",
            "DataStewardName": "Data Steward",
            "HistoricalData": true,
            "NbDataElements": 156,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-15T00:00:00Z",
            "tags": ["customer", "analytics", "behavior", "transactions"],
            "metrics": {"completeness": 98, "accuracy": 94, "timeliness": 96, "usageCount": 1234, "averageRating": 4.8},
            "preview": {
                "columns": [
                    {"name": "cust_id", "businessName": "Customer ID", "description": "Stable customer key", "dataType": "string", "sampleValues": ["C-1042"]},
                    {"name": "segment", "businessName": "Segment", "description": "Marketing segment", "dataType": "string", "sampleValues": ["retail"]},
                    {"name": "monthly_spend", "businessName": "Monthly Spend", "description": "Rolling 30-day spend", "dataType": "number", "sampleValues": [412.77]}
                ],
                "sampleData": [
                    ["C-1042", "retail", 412.77],
                    ["C-2210", "corporate", 9120.05],
                    ["C-0937", "retail", 88.10]
                ],
                "rowCount": 250000
            },
            "relatedDatasets": [
                {"id": "GDS-008", "name": "Payment Transactions Feed", "relationshipType": "similar", "similarityScore": 0.82},
                {"id": "GDS-002", "name": "Financial Performance Metrics", "relationshipType": "derived", "similarityScore": 0.61}
            ],
            "ratings": [
                {"id": "rating-seed-1", "userId": "u-301", "userName": "Mertens, Lotte", "rating": 5, "comment": "Reliable refresh cadence and clear column docs.", "createdAt": "2024-01-20T09:30:00Z"},
                {"id": "rating-seed-2", "userId": "u-412", "userName": "Okafor, Chidi", "rating": 4, "comment": "Good coverage, segment labels lag a quarter.", "createdAt": "2024-02-02T14:05:00Z"}
            ]
        }),
        json!({
            "GDSId": "GDS-002",
            "SourceSysId": "SYSUID.606734",
            "SourceSysName": "Financial Data Warehouse",
            "GoldenDataSetName": "Financial Performance Metrics",
            "DataDescription": "Revenue, expense, margin and growth indicators consolidated across all reporting entities",
            "BusinessLine": "Finance",
            "BusinessEntity": "Financial Planning",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Confidential",
            "Location": "Global",
            "dataDomain": "Financial Data",
            "DataSubDomain": "Performance Metrics",
            "DataOwnerID": "owner-002",
            "DataOwnerName": "Finance Director",
            "HistoricalData": true,
            "NbDataElements": 89,
            "createdAt": "2023-11-15T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z",
            "tags": ["finance", "metrics", "performance", "revenue"],
            "metrics": {"completeness": 99, "accuracy": 97, "timeliness": 98, "usageCount": 876, "averageRating": 4.9}
        }),
        json!({
            "GDSId": "GDS-003",
            "SourceSysId": "SYSUID.606801",
            "SourceSysName": "Workday Export",
            "GoldenDataSetName": "Employee Headcount Snapshot",
            "DataDescription": "Monthly headcount by unit",
            "BusinessLine": "Human Resources",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Sensitive personal data",
            "dataDomain": "HR Data",
            "DataSubDomain": "Workforce",
            "DataOwnerID": "owner-003",
            "DataOwnerName": "People Analytics Lead",
            "DataStewardID": "steward-003",
            "DataStewardName": "HR Data Steward",
            "NbDataElements": 34,
            "createdAt": "2023-06-01T00:00:00Z",
            "updatedAt": "2023-12-20T00:00:00Z",
            "tags": ["hr", "workforce"],
            "metrics": {"completeness": 92, "accuracy": 95, "timeliness": 88, "usageCount": 210, "averageRating": 4.1}
        }),
        json!({
            "GDSId": "GDS-004",
            "SourceSysId": "SYSUID.606822",
            "SourceSysName": "Risk Engine",
            "GoldenDataSetName": "Credit Risk Exposure",
            "DataDescription": "Counterparty-level credit exposure with collateral and limit utilisation across trading books",
            "BusinessLine": "Risk",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Confidential",
            "dataDomain": "Risk Management",
            "DataSubDomain": "Credit Risk",
            "DataOwnerID": "owner-004",
            "DataOwnerName": "Head of Credit Risk",
            "DataStewardID": "steward-004",
            "DataStewardName": "Risk Data Steward",
            "createdAt": "2023-08-10T00:00:00Z",
            "updatedAt": "2024-01-28T00:00:00Z",
            "tags": ["risk", "credit", "exposure"],
            "metrics": {"completeness": 96, "accuracy": 93, "timeliness": 97, "usageCount": 432, "averageRating": 4.5}
        }),
        json!({
            "GDSId": "GDS-005",
            "SourceSysId": "SYSUID.606915",
            "SourceSysName": "Branch Ops DB",
            "GoldenDataSetName": "Branch Operations Log",
            "DataDescription": "Daily branch activity",
            "BusinessLine": "Operations",
            "Maturity": "Draft",
            "DataLifecycle": "Active",
            "DataClassification": "Internal",
            "dataDomain": "Operations",
            "DataSubDomain": "Branch Network",
            "DataStewardID": "steward-005",
            "DataStewardName": "Operations Steward",
            "createdAt": "2023-04-02T00:00:00Z",
            "updatedAt": "2023-11-05T00:00:00Z",
            "metrics": {"completeness": 74, "accuracy": 81, "timeliness": 70, "usageCount": 58, "averageRating": 3.2}
        }),
        json!({
            "GDSId": "GDS-006",
            "SourceSysId": "SYSUID.607003",
            "SourceSysName": "Strategy Workbench",
            "GoldenDataSetName": "Market Share Tracker",
            "DataDescription": "Quarterly market share estimates per product line, sourced from panel data and public filings",
            "BusinessLine": "Strategy",
            "Maturity": "Prepared for distribution",
            "DataLifecycle": "Active",
            "DataClassification": "Public",
            "dataDomain": "Market Intelligence",
            "DataSubDomain": "Competitive Analysis",
            "DataOwnerID": "owner-006",
            "DataOwnerName": "Strategy Insights Manager",
            "createdAt": "2023-10-01T00:00:00Z",
            "updatedAt": "2024-01-10T00:00:00Z",
            "tags": ["market", "competitors"],
            "metrics": {"completeness": 88, "accuracy": 84, "timeliness": 90, "usageCount": 301, "averageRating": 4.0}
        }),
        json!({
            "GDSId": "GDS-007",
            "SourceSysId": "SYSUID.607119",
            "SourceSysName": "Records Vault",
            "GoldenDataSetName": "Regulatory Filings Archive",
            "DataDescription": "Historical regulatory filings and submission acknowledgements retained for audit purposes",
            "BusinessLine": "Compliance",
            "Maturity": "Deprecated",
            "DataLifecycle": "Archived",
            "DataClassification": "Public",
            "dataDomain": "Compliance & Governance",
            "DataSubDomain": "Filings",
            "DataOwnerID": "owner-007",
            "DataOwnerName": "Compliance Records Owner",
            "HistoricalData": "yes",
            "createdAt": "2020-01-15T00:00:00Z",
            "updatedAt": "2023-09-30T00:00:00Z",
            "metrics": {"completeness": 90, "accuracy": 92, "timeliness": 60, "usageCount": 120, "averageRating": 3.8}
        }),
        json!({
            "GDSId": "GDS-008",
            "SourceSysId": "SYSUID.607200",
            "SourceSysName": "Payments Hub",
            "GoldenDataSetName": "Payment Transactions Feed",
            "DataDescription": "Normalized payment transactions with merchant, channel and settlement attributes, refreshed hourly",
            "BusinessLine": "Finance",
            "Maturity": "Published",
            "DataLifecycle": "Active",
            "DataClassification": "Sensitive personal data",
            "dataDomain": "Financial Data",
            "DataSubDomain": "Payments",
            "DataOwnerID": "owner-008",
            "DataOwnerName": "Payments Platform Owner",
            "DataStewardID": "steward-008",
            "DataStewardName": "Payments Steward",
            "NbDataElements": 204,
            "createdAt": "2023-02-20T00:00:00Z",
            "updatedAt": "2024-02-10T00:00:00Z",
            "tags": ["payments", "transactions", "finance"],
            "metrics": {"completeness": 97, "accuracy": 96, "timeliness": 99, "usageCount": 980, "averageRating": 4.7}
        }),
    ]
}
