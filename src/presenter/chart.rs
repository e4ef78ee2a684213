//! Line chart presenter.
//!
//! Every render is a full redraw: the previous frame and its hover binding
//! are released, timestamps are converted to the display zone, and a fresh
//! binding is attached to the new points. Stored readings are never touched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

use crate::error::{DashboardError, DashboardResult};
use crate::locale::Locale;
use crate::models::Field;

// ---

const HOVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TICK_FORMAT: &str = "%H:%M:%S";

/// One plotted point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    // ---
    /// Instant as stored.
    pub utc: DateTime<Utc>,

    /// Same instant in the display zone, RFC 3339 with offset.
    pub local: String,

    /// Axis tick label (`HH:MM:SS`).
    pub tick: String,

    pub value: f64,
}

/// Hover text for one plotted index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverText {
    pub index: usize,
    pub value: f64,
    pub time: String,
    pub text: String,
}

/// Pointer inspection attached to one drawn frame.
///
/// A binding belongs to exactly one generation of a chart; the presenter
/// drops it before the next redraw attaches a new one.
#[derive(Debug, PartialEq)]
pub struct HoverBinding {
    generation: u64,
    label: String,
    time_label: &'static str,
    times: Vec<DateTime<Utc>>,
    formatted: Vec<String>,
    values: Vec<f64>,
}

impl HoverBinding {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text for the point at `index`, values to two decimals.
    pub fn inspect(&self, index: usize) -> Option<HoverText> {
        // ---
        let value = *self.values.get(index)?;
        let time = self.formatted.get(index)?.clone();
        Some(HoverText {
            index,
            value,
            text: format!(
                "{}: {:.2}\n{}: {}",
                self.label, value, self.time_label, time
            ),
            time,
        })
    }

    /// Index of the plotted point nearest to a pointer instant.
    pub fn resolve(&self, at: DateTime<Utc>) -> Option<usize> {
        // ---
        if self.times.is_empty() {
            return None;
        }
        let idx = self.times.partition_point(|t| *t < at);
        if idx == 0 {
            return Some(0);
        }
        if idx == self.times.len() {
            return Some(idx - 1);
        }
        let before = at - self.times[idx - 1];
        let after = self.times[idx] - at;
        Some(if after < before { idx } else { idx - 1 })
    }
}

/// A fully drawn chart, ready for the view.
#[derive(Debug, Clone, Serialize)]
pub struct ChartFrame {
    // ---
    pub chart: Field,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub generation: u64,
    pub points: Vec<ChartPoint>,

    #[serde(skip)]
    pub hover: Arc<HoverBinding>,
}

/// Draws one field's series.
#[derive(Debug)]
pub struct ChartPresenter {
    field: Field,
    tz: Tz,
    locale: Locale,
    generation: u64,
    binding: Option<Arc<HoverBinding>>,
}

impl ChartPresenter {
    pub fn new(field: Field, tz: Tz, locale: Locale) -> Self {
        // ---
        ChartPresenter {
            field,
            tz,
            locale,
            generation: 0,
            binding: None,
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Localized series label, e.g. `Temperature (°C)`.
    pub fn label(&self) -> &'static str {
        // ---
        let labels = self.locale.labels();
        match self.field {
            Field::Temperature => labels.temperature,
            Field::Humidity => labels.humidity,
        }
    }

    /// The binding of the last successful redraw.
    pub fn current_binding(&self) -> Option<&Arc<HoverBinding>> {
        self.binding.as_ref()
    }

    /// Forget the current binding; the generation counter keeps counting.
    pub fn release(&mut self) {
        self.binding = None;
    }

    /// Redraw from a time-ordered series.
    ///
    /// The previous binding is released first, so a failed redraw leaves the
    /// chart without one.
    pub fn render(&mut self, series: &[(DateTime<Utc>, f64)]) -> DashboardResult<ChartFrame> {
        // ---
        if let Some(old) = self.binding.take() {
            debug!(
                "Released hover binding {} of {} chart",
                old.generation,
                self.field.as_str()
            );
        }

        if let Some(idx) = series.iter().position(|(_, v)| !v.is_finite()) {
            return Err(DashboardError::RenderFailed(format!(
                "{} series has a non-finite value at index {}",
                self.field.as_str(),
                idx
            )));
        }

        let labels = self.locale.labels();
        let title = self.label();
        let y_label = title.split(' ').next().unwrap_or(title).to_string();

        let mut points = Vec::with_capacity(series.len());
        let mut formatted = Vec::with_capacity(series.len());
        for (ts, value) in series {
            let local = ts.with_timezone(&self.tz);
            formatted.push(local.format(HOVER_TIME_FORMAT).to_string());
            points.push(ChartPoint {
                utc: *ts,
                local: local.to_rfc3339(),
                tick: local.format(TICK_FORMAT).to_string(),
                value: *value,
            });
        }

        let zone = series
            .first()
            .map(|(ts, _)| ts.with_timezone(&self.tz))
            .unwrap_or_else(|| Utc::now().with_timezone(&self.tz))
            .format("%Z")
            .to_string();

        self.generation += 1;
        let binding = Arc::new(HoverBinding {
            generation: self.generation,
            label: y_label.clone(),
            time_label: labels.time,
            times: series.iter().map(|(ts, _)| *ts).collect(),
            formatted,
            values: series.iter().map(|(_, v)| *v).collect(),
        });
        self.binding = Some(binding.clone());

        Ok(ChartFrame {
            chart: self.field,
            title: format!("{} {}", title, labels.vs_time),
            x_label: format!("{} ({})", labels.time, zone),
            y_label,
            generation: self.generation,
            points,
            hover: binding,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, h, m, 0).unwrap()
    }

    fn presenter() -> ChartPresenter {
        ChartPresenter::new(Field::Temperature, chrono_tz::Asia::Jakarta, Locale::En)
    }

    #[test]
    fn test_converts_to_display_zone() {
        // ---
        let series = vec![(at(10, 0), 25.3), (at(10, 1), 25.5)];
        let frame = presenter().render(&series).unwrap();

        // Asia/Jakarta is UTC+7
        assert_eq!(frame.points[0].tick, "17:00:00");
        assert_eq!(frame.points[0].local, "2025-03-26T17:00:00+07:00");
        assert_eq!(frame.points[0].utc, at(10, 0));
        assert_eq!(frame.x_label, "Time (WIB)");
        assert_eq!(frame.title, "Temperature (°C) vs Time");
        assert_eq!(frame.y_label, "Temperature");

        // input untouched
        assert_eq!(series[0].0, at(10, 0));
    }

    #[test]
    fn test_hover_text() {
        // ---
        let frame = presenter()
            .render(&[(at(10, 0), 25.3), (at(10, 1), 25.456)])
            .unwrap();

        let hover = frame.hover.inspect(1).unwrap();
        assert_eq!(hover.value, 25.456);
        assert_eq!(hover.time, "2025-03-26 17:01:00");
        assert_eq!(hover.text, "Temperature: 25.46\nTime: 2025-03-26 17:01:00");
        assert!(frame.hover.inspect(2).is_none());
    }

    #[test]
    fn test_hover_localized() {
        // ---
        let mut chart = ChartPresenter::new(Field::Humidity, chrono_tz::Asia::Jakarta, Locale::Id);
        let frame = chart.render(&[(at(10, 0), 60.1)]).unwrap();

        assert_eq!(
            frame.hover.inspect(0).unwrap().text,
            "Kelembaban: 60.10\nWaktu: 2025-03-26 17:00:00"
        );
    }

    #[test]
    fn test_redraw_rebinds_hover() {
        // ---
        let mut chart = presenter();
        let first = chart.render(&[(at(10, 0), 25.0)]).unwrap();
        let second = chart.render(&[(at(10, 0), 25.0), (at(10, 1), 26.0)]).unwrap();

        assert_eq!(first.generation + 1, second.generation);
        let current = chart.current_binding().unwrap();
        assert_eq!(current.generation(), second.generation);

        // The presenter no longer holds the first binding.
        assert_eq!(Arc::strong_count(&first.hover), 1);
        assert_eq!(Arc::strong_count(&second.hover), 2);
    }

    #[test]
    fn test_release_drops_binding() {
        // ---
        let mut chart = presenter();
        let first = chart.render(&[(at(10, 0), 25.0)]).unwrap();
        chart.release();

        assert!(chart.current_binding().is_none());
        assert_eq!(Arc::strong_count(&first.hover), 1);

        let second = chart.render(&[(at(11, 0), 26.0)]).unwrap();
        assert_eq!(second.generation, first.generation + 1);
    }

    #[test]
    fn test_non_finite_value_fails() {
        // ---
        let mut chart = presenter();
        chart.render(&[(at(10, 0), 25.0)]).unwrap();

        let err = chart.render(&[(at(10, 0), f64::NAN)]).unwrap_err();
        assert_eq!(err.kind(), "render_failed");
        assert!(chart.current_binding().is_none());
    }

    #[test]
    fn test_pointer_resolves_to_nearest_point() {
        // ---
        let frame = presenter()
            .render(&[(at(10, 0), 1.0), (at(10, 10), 2.0), (at(10, 20), 3.0)])
            .unwrap();
        let hover = &frame.hover;

        assert_eq!(hover.resolve(at(9, 0)), Some(0));
        assert_eq!(hover.resolve(at(10, 4)), Some(0));
        assert_eq!(hover.resolve(at(10, 6)), Some(1));
        assert_eq!(hover.resolve(at(10, 10)), Some(1));
        assert_eq!(hover.resolve(at(11, 0)), Some(2));
    }

    #[test]
    fn test_empty_series_has_no_hover_target() {
        // ---
        let frame = presenter().render(&[]).unwrap();
        assert!(frame.points.is_empty());
        assert_eq!(frame.hover.resolve(at(10, 0)), None);
    }
}
