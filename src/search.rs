use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{Classification, Dataset, Maturity};
use crate::error::DatamartError;

/// Queries shorter than this are treated as "show all, no relevance boost".
pub const MIN_QUERY_LEN: usize = 2;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRange {
    pub min: u8,
    pub max: u8,
}

impl QualityRange {
    pub fn new(min: u8, max: u8) -> Result<Self, DatamartError> {
        if min > max || max > 100 {
            return Err(DatamartError::InvalidQualityRange { min, max });
        }
        Ok(Self { min, max })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Faceted constraints. An empty dimension means "no constraint", not
/// "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub classifications: Vec<Classification>,
    #[serde(default)]
    pub maturity: Vec<Maturity>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_range: Option<QualityRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.classifications.is_empty()
            && self.maturity.is_empty()
            && self.organizations.is_empty()
            && self.tags.is_empty()
            && self.quality_range.is_none()
            && self.date_range.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Relevance,
    Name,
    Updated,
    Quality,
    Usage,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Relevance => write!(f, "relevance"),
            SortKey::Name => write!(f, "name"),
            SortKey::Updated => write!(f, "updated"),
            SortKey::Quality => write!(f, "quality"),
            SortKey::Usage => write!(f, "usage"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub filters: SearchFilters,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            sort_key: SortKey::Relevance,
            sort_order: SortOrder::Desc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: usize,
}

/// Per-value counts over the filtered result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facets {
    pub categories: Vec<FacetCount>,
    pub classifications: Vec<FacetCount>,
    pub organizations: Vec<FacetCount>,
    pub tags: Vec<FacetCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub datasets: Vec<Dataset>,
    pub total_count: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub facets: Facets,
}

/// Runs the full pipeline: filter, rank, sort, facet, paginate.
pub fn search(datasets: &[Dataset], request: &SearchRequest) -> Result<SearchOutcome, DatamartError> {
    if request.page_size == 0 {
        return Err(DatamartError::InvalidPageSize);
    }

    let mut filtered: Vec<Dataset> = datasets
        .iter()
        .filter(|dataset| matches_filters(dataset, &request.filters))
        .cloned()
        .collect();

    sort_datasets(
        &mut filtered,
        &request.query,
        request.sort_key,
        request.sort_order,
    );

    let facets = facets(&filtered);
    let total_count = filtered.len();
    let (page, total_pages, range) = paginate(total_count, request.page, request.page_size);
    let datasets = filtered[range].to_vec();

    Ok(SearchOutcome {
        datasets,
        total_count,
        page,
        page_size: request.page_size,
        total_pages,
        facets,
    })
}

/// AND across dimensions, OR within a dimension's selected set.
pub fn matches_filters(dataset: &Dataset, filters: &SearchFilters) -> bool {
    if !filters.categories.is_empty() && !filters.categories.contains(&dataset.domain) {
        return false;
    }
    if !filters.classifications.is_empty()
        && !filters.classifications.contains(&dataset.classification)
    {
        return false;
    }
    if !filters.maturity.is_empty() && !filters.maturity.contains(&dataset.maturity) {
        return false;
    }
    if !filters.organizations.is_empty()
        && !filters.organizations.contains(&dataset.business_line)
    {
        return false;
    }
    if !filters.tags.is_empty() && !dataset.tags.iter().any(|tag| filters.tags.contains(tag)) {
        return false;
    }
    if let Some(range) = &filters.quality_range {
        let score = dataset.metrics.quality_score;
        if score < range.min || score > range.max {
            return false;
        }
    }
    if let Some(range) = &filters.date_range {
        if dataset.updated_at < range.start || dataset.updated_at > range.end {
            return false;
        }
    }
    true
}

/// Weighted text-match score: 3x name, 2x description, 2x any tag,
/// 1x domain, 1x owner name (case-insensitive containment).
pub fn relevance_score(dataset: &Dataset, query: &str) -> u32 {
    let needle = query.trim().to_lowercase();
    if needle.len() < MIN_QUERY_LEN {
        return 0;
    }
    let contains = |hay: &str| hay.to_lowercase().contains(&needle);

    let mut score = 0;
    if contains(&dataset.name) {
        score += 3;
    }
    if contains(&dataset.description) {
        score += 2;
    }
    if dataset.tags.iter().any(|tag| contains(tag)) {
        score += 2;
    }
    if contains(&dataset.domain) {
        score += 1;
    }
    if contains(&dataset.data_owner.name) {
        score += 1;
    }
    score
}

/// Stable sort; `Desc` reverses the base comparator, so the default
/// relevance/desc combination puts the highest score first.
pub fn sort_datasets(datasets: &mut [Dataset], query: &str, key: SortKey, order: SortOrder) {
    match key {
        SortKey::Relevance => {
            let mut scored: Vec<(u32, Dataset)> = datasets
                .iter()
                .map(|dataset| (relevance_score(dataset, query), dataset.clone()))
                .collect();
            scored.sort_by(|a, b| {
                let ordering = a.0.cmp(&b.0);
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
            for (slot, (_, dataset)) in datasets.iter_mut().zip(scored) {
                *slot = dataset;
            }
        }
        SortKey::Name => sort_by(datasets, order, |a, b| {
            a.name.to_lowercase().cmp(&b.name.to_lowercase())
        }),
        SortKey::Updated => sort_by(datasets, order, |a, b| {
            a.updated_at
                .timestamp_millis()
                .cmp(&b.updated_at.timestamp_millis())
        }),
        SortKey::Quality => sort_by(datasets, order, |a, b| {
            a.metrics.quality_score.cmp(&b.metrics.quality_score)
        }),
        SortKey::Usage => sort_by(datasets, order, |a, b| {
            a.metrics.usage_count.cmp(&b.metrics.usage_count)
        }),
    }
}

fn sort_by<F>(datasets: &mut [Dataset], order: SortOrder, compare: F)
where
    F: Fn(&Dataset, &Dataset) -> std::cmp::Ordering,
{
    datasets.sort_by(|a, b| {
        let ordering = compare(a, b);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Clamps the requested page into range and returns the slice bounds.
pub fn paginate(total: usize, page: u32, page_size: u32) -> (u32, u32, std::ops::Range<usize>) {
    let total_pages = total.div_ceil(page_size as usize) as u32;
    if total_pages == 0 {
        return (1, 0, 0..0);
    }
    let page = page.clamp(1, total_pages);
    let start = (page as usize - 1) * page_size as usize;
    let end = (start + page_size as usize).min(total);
    (page, total_pages, start..end)
}

pub fn facets(datasets: &[Dataset]) -> Facets {
    Facets {
        categories: count_values(datasets.iter().map(|d| d.domain.clone())),
        classifications: count_values(datasets.iter().map(|d| d.classification.to_string())),
        organizations: count_values(datasets.iter().map(|d| d.business_line.clone())),
        tags: count_values(datasets.iter().flat_map(|d| d.tags.iter().cloned())),
    }
}

fn count_values(values: impl Iterator<Item = String>) -> Vec<FacetCount> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0usize) += 1;
    }
    let mut facets: Vec<FacetCount> = counts
        .into_iter()
        .map(|(name, count)| FacetCount { name, count })
        .collect();
    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    facets
}
