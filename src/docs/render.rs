use serde_json::{Map, Value};

use super::types::{FileDataset, NormalizedRecord};

/// Blank line between file blocks; each block opens with its own header line.
const BLOCK_SEPARATOR: &str = "\n\n";

fn block_header(dataset: &FileDataset) -> String {
    format!(
        "=== File: {} ({} records) ===",
        dataset.provenance,
        dataset.records.len()
    )
}

fn record_value(record: &NormalizedRecord) -> Value {
    let mut map = Map::with_capacity(record.len());
    for (key, value) in record.fields() {
        map.insert(key.clone(), Value::String(value.clone()));
    }
    Value::Object(map)
}

fn render_block(dataset: &FileDataset) -> String {
    let rows = Value::Array(dataset.records.iter().map(record_value).collect());
    format!("{}\n{:#}", block_header(dataset), rows)
}

/// Render datasets, in order, into one labeled text blob.
///
/// The output depends only on provenance and records, so the same corpus
/// always renders the same text. No size limit is applied here.
pub fn render(datasets: &[FileDataset]) -> String {
    datasets
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}
