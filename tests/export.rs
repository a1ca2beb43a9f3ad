use datamart_client::export::{csv_document, datasets_csv};
use datamart_client::fixtures::sample_datasets;

#[test]
fn csv_round_trips_plain_cells() {
    let headers = vec!["id".to_string(), "name".to_string(), "score".to_string()];
    let rows = vec![
        vec!["GDS-001".to_string(), "Customer Analytics".to_string(), "95".to_string()],
        vec!["GDS-002".to_string(), "Financial Metrics".to_string(), "98".to_string()],
    ];
    let csv = csv_document(&headers, &rows);

    // with no embedded quotes or newlines, split-by-line-then-comma restores
    // the original cells exactly
    let parsed: Vec<Vec<String>> = csv
        .lines()
        .skip(1)
        .map(|line| {
            line.split(',')
                .map(|cell| cell.trim_matches('"').to_string())
                .collect()
        })
        .collect();
    assert_eq!(parsed, rows);
}

#[test]
fn every_cell_is_quoted() {
    let datasets = sample_datasets();
    let csv = datasets_csv(&datasets);
    for line in csv.lines() {
        assert!(line.starts_with('"'), "unquoted line start: {line}");
        assert!(line.ends_with('"'), "unquoted line end: {line}");
    }
}

#[test]
fn quotes_inside_cells_are_doubled() {
    let headers = vec!["comment".to_string()];
    let rows = vec![vec!["said \"fresh daily\", allegedly".to_string()]];
    let csv = csv_document(&headers, &rows);
    let data_line = csv.lines().nth(1).unwrap();
    assert_eq!(data_line, "\"said \"\"fresh daily\"\", allegedly\"");
}

#[test]
fn export_row_order_follows_input_order() {
    let datasets = sample_datasets();
    let csv = datasets_csv(&datasets);
    let exported_ids: Vec<String> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().trim_matches('"').to_string())
        .collect();
    let input_ids: Vec<String> = datasets.iter().map(|d| d.id.to_string()).collect();
    assert_eq!(exported_ids, input_ids);
}
