//! Flux query construction.
//!
//! The dashboard only ever issues one query shape: a trailing time window
//! over one measurement, filtered to the two sensor fields and one
//! location/stage/sensor, aggregated with `mean`. Building it is a pure
//! function of [`QuerySettings`]; the store is the only thing that can
//! reject it.

use std::fmt;
use std::str::FromStr;

use crate::config::QuerySettings;

// ---

const DURATION_UNITS: [&str; 10] = ["ns", "us", "ms", "mo", "s", "m", "h", "d", "w", "y"];

/// A Flux duration literal such as `1h`, `30s` or `1h30m`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxDuration(String);

impl FluxDuration {
    pub fn hours(n: u32) -> Self {
        FluxDuration(format!("{n}h"))
    }

    pub fn minutes(n: u32) -> Self {
        FluxDuration(format!("{n}m"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FluxDuration {
    type Err = String;

    /// Accepts one or more `<digits><unit>` groups.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        let literal = s.trim();
        if literal.is_empty() {
            return Err("empty duration".to_string());
        }

        let mut rest = literal;
        while !rest.is_empty() {
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return Err(format!("'{literal}' is not a Flux duration"));
            }
            rest = &rest[digits..];

            // Longest units first so "ms" and "mo" win over "m".
            let unit = DURATION_UNITS
                .iter()
                .filter(|u| rest.starts_with(*u))
                .max_by_key(|u| u.len())
                .ok_or_else(|| format!("'{literal}' has an unknown duration unit"))?;
            rest = &rest[unit.len()..];
        }

        Ok(FluxDuration(literal.to_string()))
    }
}

impl fmt::Display for FluxDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque query payload submitted by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxQuery(String);

impl FluxQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FluxQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the windowed aggregation query for the configured sensor.
pub fn build_query(settings: &QuerySettings) -> FluxQuery {
    // ---
    let text = format!(
        r#"from(bucket: "{bucket}")
  |> range(start: -{lookback})
  |> filter(fn: (r) => r["_measurement"] == "{measurement}")
  |> filter(fn: (r) => r["_field"] == "{humidity}" or r["_field"] == "{temperature}")
  |> filter(fn: (r) => r["location"] == "{location}")
  |> filter(fn: (r) => r["process_stage"] == "{stage}")
  |> filter(fn: (r) => r["sensor_id"] == "{sensor}")
  |> aggregateWindow(every: {every}, fn: mean, createEmpty: false)
  |> yield(name: "mean")"#,
        bucket = escape(&settings.bucket),
        lookback = settings.lookback,
        measurement = escape(&settings.measurement),
        humidity = escape(&settings.humidity_field),
        temperature = escape(&settings.temperature_field),
        location = escape(&settings.location),
        stage = escape(&settings.process_stage),
        sensor = escape(&settings.sensor_id),
        every = settings.aggregate_every,
    );

    FluxQuery(text)
}

/// Escape a value for use inside a Flux string literal.
fn escape(value: &str) -> String {
    // ---
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}
