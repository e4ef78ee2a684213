//! Simple data models for the sensor dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QuerySettings;

// ---

/// The two sensor fields the dashboard understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Humidity,
}

impl Field {
    /// Map a store field name onto a known field; anything else is `None`.
    pub fn from_store_name(name: &str, settings: &QuerySettings) -> Option<Field> {
        // ---
        if name == settings.temperature_field {
            Some(Field::Temperature)
        } else if name == settings.humidity_field {
            Some(Field::Humidity)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
        }
    }
}

/// One measurement sample as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub field: Field,
    pub value: f64,
    pub location: String,
    pub process_stage: String,
    pub sensor_id: String,
}

/// One time point across both fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    // ---
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub process_stage: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl Row {
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
        }
    }
}

/// Descriptive tags of the monitored sensor, discovered on the first fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    // ---
    pub location: String,
    pub process_stage: String,
    pub sensor_id: String,
}

/// A time-ordered `(timestamp, value)` series for one field.
pub type Series = Vec<(DateTime<Utc>, f64)>;
