//! Merges fetched readings into the accumulated dataset and pivots it into rows.
//!
//! Each poll re-requests a trailing window, so consecutive batches overlap.
//! The dataset is keyed by `(timestamp, field)`; a re-seen key replaces the
//! stored value (last write wins). Because every operation is an upsert by
//! key, the resulting rows do not depend on how readings were split across
//! batches.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{Field, Reading, Row, Series};

// ---

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    value: f64,
    location: String,
    process_stage: String,
}

/// Accumulated, deduplicated readings for the current session.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    dataset: BTreeMap<(DateTime<Utc>, Field), Entry>,
    retention: Option<Duration>,
}

impl Reconciler {
    /// `retention` bounds the dataset to a window ending at its newest
    /// timestamp; `None` keeps everything.
    pub fn new(retention: Option<Duration>) -> Self {
        // ---
        Reconciler {
            dataset: BTreeMap::new(),
            retention,
        }
    }

    /// Upsert a batch and return the regrouped rows.
    pub fn merge<I>(&mut self, readings: I) -> Vec<Row>
    where
        I: IntoIterator<Item = Reading>,
    {
        // ---
        let before = self.dataset.len();
        let mut incoming = 0usize;

        for reading in readings {
            incoming += 1;
            self.dataset.insert(
                (reading.timestamp, reading.field),
                Entry {
                    value: reading.value,
                    location: reading.location,
                    process_stage: reading.process_stage,
                },
            );
        }

        let pruned = self.prune();
        debug!(
            "Merged {} readings: {} -> {} keys ({} pruned)",
            incoming,
            before,
            self.dataset.len(),
            pruned
        );

        self.rows()
    }

    /// Drop entries older than the retention window.
    fn prune(&mut self) -> usize {
        // ---
        let (Some(window), Some(((newest, _), _))) = (self.retention, self.dataset.last_key_value())
        else {
            return 0;
        };
        let cutoff = *newest - window;

        let before = self.dataset.len();
        self.dataset.retain(|(ts, _), _| *ts >= cutoff);
        before - self.dataset.len()
    }

    /// One row per distinct timestamp, in ascending time order.
    ///
    /// Location and stage come from the temperature entry when there is
    /// one, otherwise from the humidity entry.
    pub fn rows(&self) -> Vec<Row> {
        // ---
        let mut rows: Vec<Row> = Vec::new();

        // Keys sort by timestamp then field, and Temperature < Humidity.
        for ((timestamp, field), entry) in &self.dataset {
            if rows.last().map_or(true, |row| row.timestamp != *timestamp) {
                rows.push(Row {
                    timestamp: *timestamp,
                    location: entry.location.clone(),
                    process_stage: entry.process_stage.clone(),
                    temperature: None,
                    humidity: None,
                });
            }
            let Some(row) = rows.last_mut() else {
                continue;
            };
            match field {
                Field::Temperature => row.temperature = Some(entry.value),
                Field::Humidity => row.humidity = Some(entry.value),
            }
        }

        rows
    }

    /// Time-ordered values of one field.
    pub fn series(&self, field: Field) -> Series {
        // ---
        self.dataset
            .iter()
            .filter(|((_, f), _)| *f == field)
            .map(|((ts, _), entry)| (*ts, entry.value))
            .collect()
    }

    /// Number of distinct `(timestamp, field)` keys.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn distinct_timestamps(&self) -> usize {
        // ---
        let mut count = 0;
        let mut last = None;
        for (ts, _) in self.dataset.keys() {
            if last != Some(ts) {
                count += 1;
                last = Some(ts);
            }
        }
        count
    }

    /// Forget everything; used when a fresh session starts.
    pub fn clear(&mut self) {
        self.dataset.clear();
    }
}
