use assert_matches::assert_matches;

use datamart_client::app::{App, BrowseRequest, ProgressEvent, ProgressSink};
use datamart_client::cart::{CartUpdate, Priority, RequestType};
use datamart_client::directory::{OrganizationClient, OrganizationPage};
use datamart_client::domain::{Dataset, DatasetId, Organization};
use datamart_client::error::DatamartError;
use datamart_client::fixtures::FixtureCatalog;
use datamart_client::profile::{Profile, ProfileClient, RecentView};
use datamart_client::search::{SortKey, SortOrder};
use datamart_client::session::{SessionGate, StaticIdentityProvider};
use datamart_client::store::MemoryStore;

struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct MockDirectory;

impl OrganizationClient for MockDirectory {
    fn list(&self, page: u32, page_size: u32) -> Result<OrganizationPage, DatamartError> {
        Ok(OrganizationPage {
            organizations: Vec::new(),
            pagination: datamart_client::api::Pagination {
                page,
                page_size,
                total_count: 0,
                total_pages: 0,
            },
        })
    }

    fn get(&self, id: &str) -> Result<Organization, DatamartError> {
        Err(DatamartError::ApiFailure(format!("unknown organization {id}")))
    }

    fn search(&self, _query: &str, _limit: u32) -> Result<Vec<Organization>, DatamartError> {
        Ok(Vec::new())
    }

    fn featured(&self, _limit: u32) -> Result<Vec<Organization>, DatamartError> {
        Ok(Vec::new())
    }

    fn datasets(&self, _id: &str, _page: u32, _page_size: u32) -> Result<Vec<Dataset>, DatamartError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct MockProfile;

impl ProfileClient for MockProfile {
    fn current(&self) -> Result<Profile, DatamartError> {
        Err(DatamartError::NotAuthenticated)
    }

    fn favorites(&self) -> Result<Vec<String>, DatamartError> {
        Ok(vec!["GDS-004".to_string()])
    }

    fn add_favorite(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn remove_favorite(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn recently_viewed(&self) -> Result<Vec<RecentView>, DatamartError> {
        Ok(Vec::new())
    }

    fn push_recently_viewed(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn interests(&self) -> Result<Vec<String>, DatamartError> {
        Ok(Vec::new())
    }

    fn update_interests(&self, interests: &[String]) -> Result<Vec<String>, DatamartError> {
        Ok(interests.to_vec())
    }
}

type TestApp = App<FixtureCatalog, MockDirectory, MockProfile, MemoryStore, StaticIdentityProvider>;

fn test_app() -> TestApp {
    let session = SessionGate::new(MemoryStore::new(), StaticIdentityProvider);
    let mut app = App::new(
        FixtureCatalog::new(),
        MockDirectory,
        MockProfile,
        session,
        10,
    );
    app.startup().unwrap();
    app
}

fn logged_in_app() -> TestApp {
    let mut app = test_app();
    app.login("admin", "admin", &NullSink).unwrap();
    app
}

fn id(value: &str) -> DatasetId {
    value.parse().unwrap()
}

#[test]
fn browse_requires_login() {
    let app = test_app();
    let err = app.browse(&BrowseRequest::default(), &NullSink).unwrap_err();
    assert_matches!(err, DatamartError::NotAuthenticated);
}

#[test]
fn login_gates_open_after_valid_credentials() {
    let mut app = test_app();
    let err = app.login("admin", "wrong", &NullSink).unwrap_err();
    assert_matches!(err, DatamartError::InvalidCredentials);
    assert!(!app.whoami().authenticated);

    app.login("admin", "admin", &NullSink).unwrap();
    assert!(app.whoami().authenticated);
    assert!(app.browse(&BrowseRequest::default(), &NullSink).is_ok());
}

#[test]
fn browse_ranks_query_matches_first() {
    let app = logged_in_app();
    let result = app
        .browse(
            &BrowseRequest {
                query: "customer".to_string(),
                ..BrowseRequest::default()
            },
            &NullSink,
        )
        .unwrap();
    assert!(!result.items.is_empty());
    assert_eq!(result.items[0].name, "Customer Analytics Dataset");
    assert!(
        result.items[0]
            .name_highlights
            .iter()
            .any(|span| span.highlighted)
    );
}

#[test]
fn browse_sorts_by_quality_desc() {
    let app = logged_in_app();
    let result = app
        .browse(
            &BrowseRequest {
                sort_key: SortKey::Quality,
                sort_order: SortOrder::Desc,
                ..BrowseRequest::default()
            },
            &NullSink,
        )
        .unwrap();
    let scores: Vec<u8> = result.items.iter().map(|item| item.quality_score).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
}

#[test]
fn remote_browse_uses_server_ranking_and_facets() {
    let app = logged_in_app();
    let result = app
        .browse_remote(
            &BrowseRequest {
                query: "finance".to_string(),
                ..BrowseRequest::default()
            },
            &NullSink,
        )
        .unwrap();
    assert!(!result.items.is_empty());
    assert_eq!(result.total_count, result.items.len());
    let facet_total: usize = result.facets.categories.iter().map(|f| f.count).sum();
    assert_eq!(facet_total, result.total_count);
}

#[test]
fn home_digest_orders_each_list_by_its_metric() {
    let app = logged_in_app();
    let result = app.home(3, &NullSink).unwrap();

    assert_eq!(result.featured.len(), 3);
    for pair in result.featured.windows(2) {
        assert!(pair[0].quality_score >= pair[1].quality_score);
    }
    for pair in result.popular.windows(2) {
        assert!(pair[0].usage_count >= pair[1].usage_count);
    }
    assert!(result.recently_viewed.is_empty());
}

#[test]
fn rate_validates_before_calling_backend() {
    let app = logged_in_app();
    let dataset = id("GDS-001");

    assert_matches!(
        app.rate(&dataset, 0, "long enough comment", &NullSink)
            .unwrap_err(),
        DatamartError::InvalidRating(0)
    );
    assert_matches!(
        app.rate(&dataset, 6, "long enough comment", &NullSink)
            .unwrap_err(),
        DatamartError::InvalidRating(6)
    );
    assert_matches!(
        app.rate(&dataset, 4, "too short", &NullSink).unwrap_err(),
        DatamartError::CommentTooShort { min: 10, .. }
    );

    let rating = app
        .rate(&dataset, 4, "Clear docs and a dependable refresh schedule", &NullSink)
        .unwrap();
    assert_eq!(rating.rating, 4);
}

#[test]
fn adding_same_dataset_twice_keeps_one_item_with_latest_fields() {
    let mut app = logged_in_app();
    let dataset = id("GDS-001");

    app.cart_add(
        &dataset,
        RequestType::Access,
        Priority::Standard,
        "Initial model training access".to_string(),
        &NullSink,
    )
    .unwrap();
    let view = app
        .cart_add(
            &dataset,
            RequestType::Access,
            Priority::Urgent,
            "Initial model training access".to_string(),
            &NullSink,
        )
        .unwrap();

    assert_eq!(view.count, 1);
    assert_eq!(view.items[0].priority, Priority::Urgent);
}

#[test]
fn cart_update_merges_fields() {
    let mut app = logged_in_app();
    let dataset = id("GDS-002");
    app.cart_add(
        &dataset,
        RequestType::Download,
        Priority::Standard,
        "Quarterly forecasting inputs".to_string(),
        &NullSink,
    )
    .unwrap();

    let view = app.cart_update(
        "GDS-002",
        CartUpdate {
            priority: Some(Priority::Critical),
            ..CartUpdate::default()
        },
    );
    assert_eq!(view.items[0].priority, Priority::Critical);
    assert_eq!(view.items[0].request_type, RequestType::Download);
}

#[test]
fn submit_clears_and_closes_the_cart() {
    let mut app = logged_in_app();
    app.cart_add(
        &id("GDS-001"),
        RequestType::Access,
        Priority::Standard,
        "Churn model feature inputs".to_string(),
        &NullSink,
    )
    .unwrap();
    app.cart_add(
        &id("GDS-008"),
        RequestType::Api,
        Priority::Urgent,
        "Fraud scoring pipeline feed".to_string(),
        &NullSink,
    )
    .unwrap();
    app.cart_open();

    let result = app.submit_requests(&NullSink).unwrap();
    assert_eq!(result.submitted, 2);
    assert!(app.cart().is_empty());
    assert!(!app.cart().is_open);
}

#[test]
fn bookmark_toggle_roundtrip() {
    let app = logged_in_app();
    let dataset = id("GDS-003");

    let first = app.toggle_bookmark(&dataset, &NullSink).unwrap();
    assert!(first.bookmarked);
    let listed = app.bookmarks(&NullSink).unwrap();
    assert_eq!(listed.local, vec!["GDS-003"]);
    assert_eq!(listed.remote, vec!["GDS-004"]);

    let second = app.toggle_bookmark(&dataset, &NullSink).unwrap();
    assert!(!second.bookmarked);
    assert!(app.bookmarks(&NullSink).unwrap().local.is_empty());
}

#[test]
fn show_includes_related_and_flags() {
    let mut app = logged_in_app();
    app.cart_add(
        &id("GDS-001"),
        RequestType::Access,
        Priority::Standard,
        "Segment dashboard refresh data".to_string(),
        &NullSink,
    )
    .unwrap();

    let result = app.show(&id("GDS-001"), &NullSink).unwrap();
    assert_eq!(result.dataset.name, "Customer Analytics Dataset");
    assert!(result.in_cart);
    assert!(!result.related.is_empty());
    assert!(result.stats.is_some());
}

#[test]
fn show_unknown_dataset_maps_to_not_found() {
    let app = logged_in_app();
    let err = app.show(&id("GDS-404"), &NullSink).unwrap_err();
    assert_matches!(err, DatamartError::DatasetNotFound(_));
}

#[test]
fn export_search_renders_all_filtered_rows() {
    let app = logged_in_app();
    let result = app
        .export_search(&BrowseRequest::default(), &NullSink)
        .unwrap();
    assert_eq!(result.rows, 8);
    // header + one line per dataset
    assert_eq!(result.csv.lines().count(), 9);
    assert!(result.csv.lines().next().unwrap().contains("\"Name\""));
}

#[test]
fn export_preview_uses_business_headers() {
    let app = logged_in_app();
    let result = app.export_preview(&id("GDS-001"), &NullSink).unwrap();
    assert!(result.csv.starts_with("\"Customer ID\",\"Segment\",\"Monthly Spend\""));
    assert_eq!(result.rows, 3);
}
