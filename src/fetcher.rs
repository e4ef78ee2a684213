//! Sensor data fetcher.
//!
//! Runs the windowed query against the store and flattens the nested
//! table/record result into typed [`Reading`]s. Only the two configured
//! fields are extracted; records for any other field are skipped.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::QuerySettings;
use crate::error::{DashboardError, DashboardResult};
use crate::models::{Field, Metadata, Reading};
use crate::query::FluxQuery;
use crate::store::{FluxTable, SensorStore};

// ---

/// Flattened result of one poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    // ---
    pub readings: Vec<Reading>,

    /// Tags of the first record seen, if any record came back.
    pub metadata: Option<Metadata>,

    /// Records dropped because of an unknown field or an unreadable cell.
    pub skipped: usize,
}

/// Fetch one window of readings.
///
/// `store` is `None` when no session is open. The arguments are owned so the
/// returned future can be handed to a background task.
pub async fn fetch<S: SensorStore>(
    store: Option<Arc<S>>,
    query: FluxQuery,
    settings: QuerySettings,
) -> DashboardResult<Batch> {
    // ---
    let store = store.ok_or(DashboardError::NotConnected)?;

    debug!("Submitting query:\n{}", query);
    let tables = store.query(&query).await?;

    let batch = flatten(&tables, &settings);
    info!(
        "Fetched {} readings from {} tables ({} skipped)",
        batch.readings.len(),
        tables.len(),
        batch.skipped
    );
    Ok(batch)
}

/// Flatten store tables into readings, in result order.
pub fn flatten(tables: &[FluxTable], settings: &QuerySettings) -> Batch {
    // ---
    let mut batch = Batch::default();

    for (t, table) in tables.iter().enumerate() {
        for (r, record) in table.records.iter().enumerate() {
            if batch.metadata.is_none() {
                batch.metadata = Some(Metadata {
                    location: record.tag_or_na("location"),
                    process_stage: record.tag_or_na("process_stage"),
                    sensor_id: record.tag_or_na("sensor_id"),
                });
            }

            let name = record.field().unwrap_or("");
            let Some(field) = Field::from_store_name(name, settings) else {
                batch.skipped += 1;
                continue;
            };

            let (Some(timestamp), Some(value)) = (record.time(), record.value()) else {
                debug!(
                    "Skipping record {} of table {}: unreadable _time/_value ({:?}/{:?})",
                    r,
                    t,
                    record.get("_time"),
                    record.get("_value")
                );
                batch.skipped += 1;
                continue;
            };

            batch.readings.push(Reading {
                timestamp,
                field,
                value,
                location: record.tag_or_na("location"),
                process_stage: record.tag_or_na("process_stage"),
                sensor_id: record.tag_or_na("sensor_id"),
            });
        }
    }

    batch
}
