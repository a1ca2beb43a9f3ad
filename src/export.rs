use serde_json::Value;

use crate::domain::{Dataset, DatasetPreview};

/// Renders rows as CSV: every cell stringified, inner quotes doubled, cell
/// wrapped in quotes, cells joined by comma, rows by newline.
pub fn csv_document(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_row(headers.iter().map(String::as_str)));
    for row in rows {
        lines.push(csv_row(row.iter().map(String::as_str)));
    }
    lines.join("\n")
}

fn csv_row<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Exports preview rows with business-name-or-technical-name headers.
/// The caller passes rows in their currently visible (filtered, sorted)
/// order.
pub fn preview_csv(preview: &DatasetPreview, rows: &[Vec<Value>]) -> String {
    let headers: Vec<String> = preview
        .columns
        .iter()
        .map(|column| column.display_name().to_string())
        .collect();
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    csv_document(&headers, &rendered)
}

/// Exports a search-result table, one row per dataset.
pub fn datasets_csv(datasets: &[Dataset]) -> String {
    let headers = [
        "ID",
        "Name",
        "Domain",
        "Business Line",
        "Classification",
        "Maturity",
        "Quality Score",
        "Usage Count",
        "Last Updated",
    ]
    .map(String::from)
    .to_vec();
    let rows: Vec<Vec<String>> = datasets
        .iter()
        .map(|dataset| {
            vec![
                dataset.id.to_string(),
                dataset.name.clone(),
                dataset.domain.clone(),
                dataset.business_line.clone(),
                dataset.classification.to_string(),
                dataset.maturity.to_string(),
                dataset.metrics.quality_score.to_string(),
                dataset.metrics.usage_count.to_string(),
                dataset.updated_at.to_rfc3339(),
            ]
        })
        .collect();
    csv_document(&headers, &rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
