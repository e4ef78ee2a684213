//! Time-series store seam.
//!
//! The dashboard talks to the store through two traits: a [`Connector`]
//! that opens a client from [`StoreSettings`], and the [`SensorStore`]
//! client itself (health check, query, close). The InfluxDB v2 HTTP binding
//! lives in [`influx`]; tests substitute an in-memory fake.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::config::StoreSettings;
use crate::error::DashboardResult;
use crate::query::FluxQuery;

mod annotated_csv;
#[cfg(test)]
pub(crate) mod fake;
pub mod influx;

pub use influx::{InfluxConnector, InfluxStore};

// ---

/// Result of a store health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    // ---
    pub status: String,
    pub message: String,
}

impl Health {
    pub fn is_pass(&self) -> bool {
        self.status == "pass"
    }
}

/// One record of a query result: column name to raw cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxRecord {
    values: BTreeMap<String, String>,
}

impl FluxRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        // ---
        FluxRecord {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// The `_field` column.
    pub fn field(&self) -> Option<&str> {
        self.get("_field")
    }

    /// The `_value` column as a finite float. `NaN` and infinities are
    /// treated as unreadable.
    pub fn value(&self) -> Option<f64> {
        self.get("_value")?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// The `_time` column, normalized to UTC.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        // ---
        DateTime::parse_from_rfc3339(self.get("_time")?)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// A tag column, or `N/A` when the record does not carry it.
    pub fn tag_or_na(&self, name: &str) -> String {
        // ---
        self.get(name)
            .filter(|v| !v.is_empty())
            .unwrap_or("N/A")
            .to_string()
    }
}

/// A group of records sharing one series key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxTable {
    pub records: Vec<FluxRecord>,
}

/// An open client to the sensor store.
pub trait SensorStore: Send + Sync + 'static {
    /// Ask the store whether it is ready to serve queries.
    fn health(&self) -> impl Future<Output = DashboardResult<Health>> + Send;

    /// Run a query and return its tables of records.
    fn query(&self, query: &FluxQuery)
        -> impl Future<Output = DashboardResult<Vec<FluxTable>>> + Send;

    /// Release the client. Called exactly once per opened client.
    fn close(&self);
}

/// Opens store clients.
pub trait Connector: Send + Sync + 'static {
    type Store: SensorStore;

    fn connect(&self, settings: &StoreSettings) -> DashboardResult<Self::Store>;
}
