use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cart::{CartAction, CartDraft, CartItem, CartState, CartUpdate, Priority, RequestType};
use crate::catalog::{CatalogClient, DatasetQuery, DatasetStats, DownloadFormat};
use crate::directory::OrganizationClient;
use crate::domain::{Dataset, DatasetId, SessionUser};
use crate::error::DatamartError;
use crate::export;
use crate::highlight::{HighlightSpan, highlight};
use crate::profile::ProfileClient;
use crate::search::{self, Facets, SearchFilters, SearchRequest, SortKey, SortOrder};
use crate::session::{AuthState, IdentityProvider, SessionGate};
use crate::store::{Bookmarks, KeyValueStore};

/// Reviews shorter than this are rejected before reaching the backend.
pub const MIN_COMMENT_LEN: usize = 10;

/// Size of the working set fetched for the client-side search pipeline.
const BROWSE_FETCH_LIMIT: u32 = 500;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn emit(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

#[derive(Debug, Clone)]
pub struct BrowseRequest {
    pub query: String,
    pub filters: SearchFilters,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub page: u32,
    pub page_size: Option<u32>,
}

impl Default for BrowseRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: SearchFilters::default(),
            sort_key: SortKey::Relevance,
            sort_order: SortOrder::Desc,
            page: 1,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub domain: String,
    pub business_line: String,
    pub classification: String,
    pub maturity: String,
    pub quality_score: u8,
    pub usage_count: u32,
    pub average_rating: f64,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub bookmarked: bool,
    pub in_cart: bool,
    pub name_highlights: Vec<HighlightSpan>,
    pub description_highlights: Vec<HighlightSpan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResult {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_count: usize,
    pub facets: Facets,
    pub items: Vec<BrowseItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowResult {
    pub dataset: Dataset,
    pub related: Vec<RelatedSummary>,
    pub stats: Option<DatasetStats>,
    pub bookmarked: bool,
    pub in_cart: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSummary {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub quality_score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub username: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoamiResult {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkResult {
    pub dataset_id: String,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub dataset_id: String,
    pub name: String,
    pub request_type: RequestType,
    pub priority: Priority,
    pub business_justification: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartViewResult {
    pub items: Vec<CartLine>,
    pub count: usize,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub submitted: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub rows: usize,
    pub csv: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResult {
    pub dataset_id: String,
    pub format: DownloadFormat,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationsResult {
    pub organizations: Vec<OrganizationSummary>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub verified: bool,
    pub dataset_count: u32,
    pub average_dataset_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarksResult {
    pub local: Vec<String>,
    pub remote: Vec<String>,
}

/// Landing-page style digest of the catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResult {
    pub featured: Vec<DatasetSummary>,
    pub popular: Vec<DatasetSummary>,
    pub recently_updated: Vec<DatasetSummary>,
    pub recently_viewed: Vec<DatasetSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub quality_score: u8,
    pub usage_count: u32,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResult {
    pub profile: crate::profile::Profile,
    pub interests: Vec<String>,
    pub recently_viewed: Vec<crate::profile::RecentView>,
}

/// Orchestrator wiring the service clients, session gate, cart and the
/// search pipeline together. Generic over the service traits so the HTTP
/// and fixture implementations are interchangeable at composition time.
pub struct App<C, O, P, S, I>
where
    C: CatalogClient,
    O: OrganizationClient,
    P: ProfileClient,
    S: KeyValueStore,
    I: IdentityProvider,
{
    catalog: C,
    directory: O,
    profile: P,
    session: SessionGate<S, I>,
    cart: CartState,
    page_size: u32,
}

impl<C, O, P, S, I> App<C, O, P, S, I>
where
    C: CatalogClient,
    O: OrganizationClient,
    P: ProfileClient,
    S: KeyValueStore,
    I: IdentityProvider,
{
    pub fn new(
        catalog: C,
        directory: O,
        profile: P,
        session: SessionGate<S, I>,
        page_size: u32,
    ) -> Self {
        Self {
            catalog,
            directory,
            profile,
            session,
            cart: CartState::new(),
            page_size,
        }
    }

    /// Rehydrates the persisted session; call once at startup.
    pub fn startup(&mut self) -> Result<&AuthState, DatamartError> {
        self.session.rehydrate()
    }

    pub fn directory(&self) -> &O {
        &self.directory
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn login(
        &mut self,
        username: &str,
        password: &str,
        sink: &dyn ProgressSink,
    ) -> Result<LoginResult, DatamartError> {
        emit(sink, "phase=Resolve; checking credentials");
        let user = self.session.login(username, password)?;
        emit(sink, format!("phase=Store; session persisted for {}", user.username));
        Ok(LoginResult {
            username: user.username,
            name: user.name,
            role: user.role.to_string(),
        })
    }

    pub fn logout(&mut self, sink: &dyn ProgressSink) -> Result<(), DatamartError> {
        emit(sink, "phase=Store; clearing session");
        self.session.logout()
    }

    pub fn whoami(&self) -> WhoamiResult {
        WhoamiResult {
            authenticated: self.session.is_authenticated(),
            user: self.session.current_user().cloned(),
        }
    }

    /// Fetches the working set and runs the client-side pipeline:
    /// filter, rank, sort, facet, paginate, highlight.
    pub fn browse(
        &self,
        request: &BrowseRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BrowseResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; loading catalog window");
        emit(sink, "catalog.request");
        let start = std::time::Instant::now();
        let page = self.catalog.list(&DatasetQuery {
            page: Some(1),
            page_size: Some(BROWSE_FETCH_LIMIT),
            ..DatasetQuery::default()
        })?;
        emit(
            sink,
            format!("catalog.response latency_ms={}", start.elapsed().as_millis()),
        );

        emit(sink, "phase=Rank; filtering and scoring");
        let search_request = SearchRequest {
            query: request.query.clone(),
            filters: request.filters.clone(),
            sort_key: request.sort_key,
            sort_order: request.sort_order,
            page: request.page,
            page_size: request.page_size.unwrap_or(self.page_size),
        };
        let outcome = search::search(&page.datasets, &search_request)?;

        let bookmarks = Bookmarks::new(self.session.store());
        let bookmarked = bookmarks.list().unwrap_or_default();
        let items = outcome
            .datasets
            .iter()
            .map(|dataset| self.browse_item(dataset, &request.query, &bookmarked))
            .collect();

        Ok(BrowseResult {
            query: request.query.clone(),
            page: outcome.page,
            page_size: outcome.page_size,
            total_pages: outcome.total_pages,
            total_count: outcome.total_count,
            facets: outcome.facets,
            items,
        })
    }

    /// Server-ranked variant of [`App::browse`]: the backend does the
    /// filtering and relevance ordering, the client only annotates.
    pub fn browse_remote(
        &self,
        request: &BrowseRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BrowseResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; server-side search");
        emit(sink, "catalog.request");
        let start = std::time::Instant::now();
        let result = self.catalog.search(&request.query, &request.filters)?;
        emit(
            sink,
            format!("catalog.response latency_ms={}", start.elapsed().as_millis()),
        );

        let page_size = request.page_size.unwrap_or(self.page_size);
        let (page, total_pages, range) =
            search::paginate(result.datasets.len(), request.page, page_size.max(1));

        let bookmarks = Bookmarks::new(self.session.store());
        let bookmarked = bookmarks.list().unwrap_or_default();
        let items = result.datasets[range]
            .iter()
            .map(|dataset| self.browse_item(dataset, &request.query, &bookmarked))
            .collect();

        Ok(BrowseResult {
            query: request.query.clone(),
            page,
            page_size,
            total_pages,
            total_count: result.total_count as usize,
            facets: result.facets,
            items,
        })
    }

    fn browse_item(&self, dataset: &Dataset, query: &str, bookmarked: &[String]) -> BrowseItem {
        BrowseItem {
            id: dataset.id.to_string(),
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            domain: dataset.domain.clone(),
            business_line: dataset.business_line.clone(),
            classification: dataset.classification.to_string(),
            maturity: dataset.maturity.to_string(),
            quality_score: dataset.metrics.quality_score,
            usage_count: dataset.metrics.usage_count,
            average_rating: dataset.metrics.average_rating,
            updated_at: dataset.updated_at,
            tags: dataset.tags.clone(),
            bookmarked: bookmarked.iter().any(|id| id == dataset.id.as_str()),
            in_cart: self.cart.is_in_cart(dataset.id.as_str()),
            name_highlights: highlight(&dataset.name, query),
            description_highlights: highlight(&dataset.description, query),
        }
    }

    pub fn show(
        &self,
        id: &DatasetId,
        sink: &dyn ProgressSink,
    ) -> Result<ShowResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Resolve; dataset {id}"));
        emit(sink, "catalog.request");
        let start = std::time::Instant::now();
        let dataset = self.catalog.get(id)?;
        emit(
            sink,
            format!("catalog.response latency_ms={}", start.elapsed().as_millis()),
        );

        if let Err(err) = self.catalog.record_view(id) {
            tracing::debug!(error = %err, "view tracking failed");
        }

        let related = self
            .catalog
            .related(id, 5)
            .unwrap_or_default()
            .iter()
            .map(|related| RelatedSummary {
                id: related.id.to_string(),
                name: related.name.clone(),
                domain: related.domain.clone(),
                quality_score: related.metrics.quality_score,
            })
            .collect();
        let stats = self.catalog.stats(id).ok();

        let bookmarks = Bookmarks::new(self.session.store());
        Ok(ShowResult {
            bookmarked: bookmarks.contains(id.as_str()).unwrap_or(false),
            in_cart: self.cart.is_in_cart(id.as_str()),
            dataset,
            related,
            stats,
        })
    }

    /// Submits a review after validating the rating scale and the minimum
    /// comment length.
    pub fn rate(
        &self,
        id: &DatasetId,
        rating: u8,
        comment: &str,
        sink: &dyn ProgressSink,
    ) -> Result<crate::domain::DatasetRating, DatamartError> {
        self.session.require_authenticated()?;

        if !(1..=5).contains(&rating) {
            return Err(DatamartError::InvalidRating(rating));
        }
        let trimmed = comment.trim();
        if trimmed.len() < MIN_COMMENT_LEN {
            return Err(DatamartError::CommentTooShort {
                min: MIN_COMMENT_LEN,
                got: trimmed.len(),
            });
        }

        emit(sink, format!("phase=Store; submitting review for {id}"));
        self.catalog.submit_rating(id, rating, trimmed)
    }

    /// Toggles the bookmark: the backend call first, then the local list, so
    /// a failed request leaves the persisted state untouched.
    pub fn toggle_bookmark(
        &self,
        id: &DatasetId,
        sink: &dyn ProgressSink,
    ) -> Result<BookmarkResult, DatamartError> {
        self.session.require_authenticated()?;

        let bookmarks = Bookmarks::new(self.session.store());
        let currently = bookmarks.contains(id.as_str()).unwrap_or(false);
        if currently {
            emit(sink, format!("phase=Store; removing bookmark {id}"));
            self.catalog.remove_bookmark(id)?;
        } else {
            emit(sink, format!("phase=Store; adding bookmark {id}"));
            self.catalog.add_bookmark(id)?;
        }
        let bookmarked = bookmarks.toggle(id.as_str())?;
        Ok(BookmarkResult {
            dataset_id: id.to_string(),
            bookmarked,
        })
    }

    pub fn cart_add(
        &mut self,
        id: &DatasetId,
        request_type: RequestType,
        priority: Priority,
        business_justification: String,
        sink: &dyn ProgressSink,
    ) -> Result<CartViewResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Resolve; dataset {id}"));
        let dataset = self.catalog.get(id)?;
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Add(CartDraft {
            dataset,
            request_type,
            priority,
            business_justification,
        }));
        Ok(self.cart_view())
    }

    pub fn cart_remove(&mut self, dataset_id: &str) -> CartViewResult {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Remove(dataset_id.to_string()));
        self.cart_view()
    }

    pub fn cart_update(&mut self, dataset_id: &str, update: CartUpdate) -> CartViewResult {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Update {
            dataset_id: dataset_id.to_string(),
            update,
        });
        self.cart_view()
    }

    pub fn cart_clear(&mut self) -> CartViewResult {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Clear);
        self.cart_view()
    }

    pub fn cart_open(&mut self) {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Open);
    }

    pub fn cart_close(&mut self) {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Close);
    }

    pub fn cart_toggle(&mut self) {
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Toggle);
    }

    pub fn cart_view(&self) -> CartViewResult {
        CartViewResult {
            items: self.cart.items.iter().map(cart_line).collect(),
            count: self.cart.len(),
            is_open: self.cart.is_open,
        }
    }

    /// Hands the pending requests off and resets the cart. Backend
    /// submission is not wired up yet; the items are only logged.
    pub fn submit_requests(&mut self, sink: &dyn ProgressSink) -> Result<SubmitResult, DatamartError> {
        self.session.require_authenticated()?;

        let submitted = self.cart.len();
        for item in &self.cart.items {
            tracing::info!(
                dataset = %item.dataset.id,
                request_type = %item.request_type,
                priority = %item.priority,
                "submitting data request"
            );
            emit(
                sink,
                format!(
                    "phase=Store; request {} ({}, {})",
                    item.dataset.id, item.request_type, item.priority
                ),
            );
        }
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Clear);
        self.cart = std::mem::take(&mut self.cart).apply(CartAction::Close);
        Ok(SubmitResult { submitted })
    }

    /// Exports the full filtered and sorted result set (not just the current
    /// page) as CSV.
    pub fn export_search(
        &self,
        request: &BrowseRequest,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; loading catalog window");
        let page = self.catalog.list(&DatasetQuery {
            page: Some(1),
            page_size: Some(BROWSE_FETCH_LIMIT),
            ..DatasetQuery::default()
        })?;

        let mut matched: Vec<Dataset> = page
            .datasets
            .iter()
            .filter(|dataset| search::matches_filters(dataset, &request.filters))
            .cloned()
            .collect();
        search::sort_datasets(&mut matched, &request.query, request.sort_key, request.sort_order);

        emit(sink, format!("phase=Store; rendering {} rows", matched.len()));
        Ok(ExportResult {
            rows: matched.len(),
            csv: export::datasets_csv(&matched),
        })
    }

    /// Landing digest: featured, popular, recently updated and recently
    /// viewed datasets.
    pub fn home(&self, limit: u32, sink: &dyn ProgressSink) -> Result<HomeResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; loading landing lists");
        let featured = self.catalog.featured(limit)?;
        let popular = self.catalog.popular(limit)?;
        let recently_updated = self.catalog.recent(limit)?;
        let recently_viewed = self.catalog.recent_views(limit).unwrap_or_default();

        Ok(HomeResult {
            featured: summaries(&featured),
            popular: summaries(&popular),
            recently_updated: summaries(&recently_updated),
            recently_viewed: summaries(&recently_viewed),
        })
    }

    /// Account overview from the profile service.
    pub fn profile_overview(&self, sink: &dyn ProgressSink) -> Result<ProfileResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; loading profile");
        let profile = self.profile.current()?;
        let interests = self.profile.interests().unwrap_or_default();
        let recently_viewed = self.profile.recently_viewed().unwrap_or_default();
        Ok(ProfileResult {
            profile,
            interests,
            recently_viewed,
        })
    }

    /// Searches provider organizations by name.
    pub fn search_organizations(
        &self,
        query: &str,
        limit: u32,
        sink: &dyn ProgressSink,
    ) -> Result<OrganizationsResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Fetch; organizations matching {query:?}"));
        let organizations = self.directory.search(query, limit)?;
        Ok(OrganizationsResult {
            total_count: organizations.len() as u64,
            organizations: organizations
                .into_iter()
                .map(|org| OrganizationSummary {
                    id: org.id,
                    name: org.name,
                    verified: org.verified,
                    dataset_count: org.dataset_count,
                    average_dataset_rating: org.average_dataset_rating,
                })
                .collect(),
        })
    }

    /// Fetches the dataset export body itself.
    pub fn download(
        &self,
        id: &DatasetId,
        format: DownloadFormat,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<u8>, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Fetch; downloading {id} as {format}"));
        self.catalog.download(id, format)
    }

    /// Resolves a server-side download URL for the dataset.
    pub fn download_url(
        &self,
        id: &DatasetId,
        format: DownloadFormat,
        sink: &dyn ProgressSink,
    ) -> Result<DownloadUrlResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Resolve; download url for {id}"));
        let url = self.catalog.download_url(id, format)?;
        Ok(DownloadUrlResult {
            dataset_id: id.to_string(),
            format,
            url,
        })
    }

    /// Lists provider organizations registered in the marketplace.
    pub fn organizations(
        &self,
        page: u32,
        page_size: u32,
        sink: &dyn ProgressSink,
    ) -> Result<OrganizationsResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Fetch; loading organizations");
        let listing = self.directory.list(page, page_size)?;
        Ok(OrganizationsResult {
            total_count: listing.pagination.total_count,
            organizations: listing
                .organizations
                .into_iter()
                .map(|org| OrganizationSummary {
                    id: org.id,
                    name: org.name,
                    verified: org.verified,
                    dataset_count: org.dataset_count,
                    average_dataset_rating: org.average_dataset_rating,
                })
                .collect(),
        })
    }

    /// Local bookmark list side by side with the account favorites held by
    /// the backend. The remote list is best-effort.
    pub fn bookmarks(&self, sink: &dyn ProgressSink) -> Result<BookmarksResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, "phase=Resolve; reading bookmark lists");
        let local = Bookmarks::new(self.session.store()).list().unwrap_or_default();
        let remote = match self.profile.favorites() {
            Ok(remote) => remote,
            Err(err) => {
                tracing::debug!(error = %err, "remote favorites unavailable");
                Vec::new()
            }
        };
        Ok(BookmarksResult { local, remote })
    }

    /// Exports a dataset preview with business-friendly headers.
    pub fn export_preview(
        &self,
        id: &DatasetId,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, DatamartError> {
        self.session.require_authenticated()?;

        emit(sink, format!("phase=Fetch; preview for {id}"));
        let preview = self.catalog.preview(id, 100)?;
        Ok(ExportResult {
            rows: preview.sample_data.len(),
            csv: export::preview_csv(&preview, &preview.sample_data),
        })
    }
}

fn summaries(datasets: &[Dataset]) -> Vec<DatasetSummary> {
    datasets
        .iter()
        .map(|dataset| DatasetSummary {
            id: dataset.id.to_string(),
            name: dataset.name.clone(),
            domain: dataset.domain.clone(),
            quality_score: dataset.metrics.quality_score,
            usage_count: dataset.metrics.usage_count,
            average_rating: dataset.metrics.average_rating,
        })
        .collect()
}

fn cart_line(item: &CartItem) -> CartLine {
    CartLine {
        dataset_id: item.dataset.id.to_string(),
        name: item.dataset.name.clone(),
        request_type: item.request_type,
        priority: item.priority,
        business_justification: item.business_justification.clone(),
        added_at: item.added_at,
    }
}
