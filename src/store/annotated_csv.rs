//! Decoder for the InfluxDB annotated CSV query response.
//!
//! A response is a sequence of blocks. Each block starts with `#datatype`,
//! `#group` and `#default` annotation rows, followed by a header row and the
//! data rows. Rows are grouped into tables by their `(result, table)` pair.

use std::collections::{BTreeMap, HashMap};

use crate::error::{DashboardError, DashboardResult};

use super::{FluxRecord, FluxTable};

// ---

pub fn decode(body: &str) -> DashboardResult<Vec<FluxTable>> {
    // ---
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut tables: Vec<FluxTable> = Vec::new();
    let mut table_index: HashMap<(String, String), usize> = HashMap::new();

    let mut header: Option<Vec<String>> = None;
    let mut defaults: Vec<String> = Vec::new();
    let mut in_annotations = false;

    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            DashboardError::QueryFailed(format!("malformed query response at row {line}: {e}"))
        })?;

        let first = record.get(0).unwrap_or("");
        if first.starts_with('#') {
            // A new annotation run opens a new block with its own header.
            if !in_annotations {
                header = None;
                defaults.clear();
                in_annotations = true;
            }
            if first == "#default" {
                defaults = record.iter().map(str::to_string).collect();
            }
            continue;
        }
        in_annotations = false;

        if record.iter().all(str::is_empty) {
            continue;
        }

        if header.is_none() {
            header = Some(record.iter().map(str::to_string).collect());
            continue;
        }
        let Some(columns) = header.as_ref() else {
            continue;
        };

        let mut values = BTreeMap::new();
        for (i, column) in columns.iter().enumerate() {
            if column.is_empty() {
                continue;
            }
            let raw = record.get(i).unwrap_or("");
            let cell = if raw.is_empty() {
                defaults.get(i).map(String::as_str).unwrap_or("")
            } else {
                raw
            };
            values.insert(column.clone(), cell.to_string());
        }

        if let Some(message) = values.get("error").filter(|m| !m.is_empty()) {
            return Err(DashboardError::QueryFailed(message.clone()));
        }

        let key = (
            values.get("result").cloned().unwrap_or_default(),
            values.get("table").cloned().unwrap_or_default(),
        );
        let slot = *table_index.entry(key).or_insert_with(|| {
            tables.push(FluxTable::default());
            tables.len() - 1
        });
        tables[slot].records.push(FluxRecord { values });
    }

    Ok(tables)
}
