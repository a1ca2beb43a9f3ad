use datamart_client::fixtures::sample_datasets;
use datamart_client::search::{
    DateRange, QualityRange, SearchFilters, SearchRequest, SortKey, SortOrder, matches_filters,
    search,
};

fn all(request: SearchRequest) -> SearchRequest {
    SearchRequest {
        page_size: 100,
        ..request
    }
}

#[test]
fn filtering_returns_a_subset_satisfying_every_dimension() {
    let datasets = sample_datasets();
    let filters = SearchFilters {
        organizations: vec!["Finance".to_string()],
        quality_range: Some(QualityRange::new(90, 100).unwrap()),
        ..SearchFilters::default()
    };
    let outcome = search(
        &datasets,
        &all(SearchRequest {
            filters: filters.clone(),
            ..SearchRequest::default()
        }),
    )
    .unwrap();

    assert!(outcome.total_count <= datasets.len());
    for dataset in &outcome.datasets {
        assert!(matches_filters(dataset, &filters));
        assert_eq!(dataset.business_line, "Finance");
    }
}

#[test]
fn empty_filters_preserve_membership() {
    let datasets = sample_datasets();
    let outcome = search(&datasets, &all(SearchRequest::default())).unwrap();
    assert_eq!(outcome.total_count, datasets.len());

    let mut input_ids: Vec<String> = datasets.iter().map(|d| d.id.to_string()).collect();
    let mut output_ids: Vec<String> = outcome.datasets.iter().map(|d| d.id.to_string()).collect();
    input_ids.sort();
    output_ids.sort();
    assert_eq!(input_ids, output_ids);
}

#[test]
fn pagination_reconstructs_the_sorted_list() {
    let datasets = sample_datasets();
    for page_size in [1u32, 2, 3, 5, 8, 11] {
        let full = search(
            &datasets,
            &all(SearchRequest {
                sort_key: SortKey::Usage,
                sort_order: SortOrder::Asc,
                ..SearchRequest::default()
            }),
        )
        .unwrap();

        let mut rebuilt = Vec::new();
        let mut page = 1;
        loop {
            let outcome = search(
                &datasets,
                &SearchRequest {
                    sort_key: SortKey::Usage,
                    sort_order: SortOrder::Asc,
                    page,
                    page_size,
                    ..SearchRequest::default()
                },
            )
            .unwrap();
            rebuilt.extend(outcome.datasets);
            if page >= outcome.total_pages {
                break;
            }
            page += 1;
        }
        assert_eq!(rebuilt, full.datasets, "page_size={page_size}");
    }
}

#[test]
fn name_sort_is_case_insensitive_lexicographic() {
    let datasets = sample_datasets();
    let outcome = search(
        &datasets,
        &all(SearchRequest {
            sort_key: SortKey::Name,
            sort_order: SortOrder::Asc,
            ..SearchRequest::default()
        }),
    )
    .unwrap();
    let names: Vec<String> = outcome
        .datasets
        .iter()
        .map(|d| d.name.to_lowercase())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn updated_sort_orders_by_timestamp() {
    let datasets = sample_datasets();
    let outcome = search(
        &datasets,
        &all(SearchRequest {
            sort_key: SortKey::Updated,
            sort_order: SortOrder::Desc,
            ..SearchRequest::default()
        }),
    )
    .unwrap();
    for pair in outcome.datasets.windows(2) {
        assert!(pair[0].updated_at >= pair[1].updated_at);
    }
}

#[test]
fn date_range_filter_is_inclusive_on_both_ends() {
    let datasets = sample_datasets();
    let mut updated: Vec<_> = datasets.iter().map(|d| d.updated_at).collect();
    updated.sort();
    let filters = SearchFilters {
        date_range: Some(DateRange {
            start: updated[1],
            end: updated[updated.len() - 2],
        }),
        ..SearchFilters::default()
    };
    let outcome = search(
        &datasets,
        &all(SearchRequest {
            filters,
            ..SearchRequest::default()
        }),
    )
    .unwrap();
    assert_eq!(outcome.total_count, datasets.len() - 2);
}

#[test]
fn short_query_shows_all_without_boost() {
    let datasets = sample_datasets();
    let outcome = search(
        &datasets,
        &all(SearchRequest {
            query: "c".to_string(),
            ..SearchRequest::default()
        }),
    )
    .unwrap();
    assert_eq!(outcome.total_count, datasets.len());
}
