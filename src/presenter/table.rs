//! Sortable table presenter.
//!
//! The grid is rebuilt from scratch on every render. Sorting belongs to the
//! grid, not to the rows handed in: the active sort is suspended while the
//! grid is repopulated and applied once afterwards.

use std::cmp::Ordering;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::locale::Locale;
use crate::models::Row;

// ---

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Time,
    Location,
    ProcessStage,
    Temperature,
    Humidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: Column,
    pub order: SortOrder,
}

/// One rendered grid row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Time, location, stage, temperature, humidity.
    pub cells: [String; 5],

    #[serde(skip)]
    source: Row,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGrid {
    pub headers: [String; 5],
    pub rows: Vec<TableRow>,
    pub sort: Option<SortState>,
    pub sorting_enabled: bool,
}

/// Two decimals, or `N/A` for an absent value.
pub fn format_value(value: Option<f64>) -> String {
    // ---
    match value {
        Some(v) => format!("{v:.2}"),
        None => "N/A".to_string(),
    }
}

/// Owns the grid and its interactive sort state.
#[derive(Debug)]
pub struct TablePresenter {
    tz: Tz,
    grid: TableGrid,
}

impl TablePresenter {
    pub fn new(tz: Tz, locale: Locale) -> Self {
        // ---
        let labels = locale.labels();
        TablePresenter {
            tz,
            grid: TableGrid {
                headers: [
                    labels.time.to_string(),
                    labels.location.to_string(),
                    labels.process_stage.to_string(),
                    labels.temperature.to_string(),
                    labels.humidity.to_string(),
                ],
                rows: Vec::new(),
                sort: None,
                sorting_enabled: true,
            },
        }
    }

    pub fn grid(&self) -> &TableGrid {
        &self.grid
    }

    /// Replace the grid contents with one line per row.
    pub fn render(&mut self, rows: &[Row]) -> &TableGrid {
        // ---
        self.grid.sorting_enabled = false;

        self.grid.rows = rows
            .iter()
            .map(|row| TableRow {
                cells: [
                    row.timestamp
                        .with_timezone(&self.tz)
                        .format(TIME_FORMAT)
                        .to_string(),
                    row.location.clone(),
                    row.process_stage.clone(),
                    format_value(row.temperature),
                    format_value(row.humidity),
                ],
                source: row.clone(),
            })
            .collect();

        self.grid.sorting_enabled = true;
        self.apply_sort();
        &self.grid
    }

    /// Change the interactive sort and re-order the current grid.
    pub fn sort_by(&mut self, column: Column, order: SortOrder) -> &TableGrid {
        // ---
        self.grid.sort = Some(SortState { column, order });
        self.apply_sort();
        &self.grid
    }

    fn apply_sort(&mut self) {
        // ---
        let Some(SortState { column, order }) = self.grid.sort else {
            return;
        };
        if !self.grid.sorting_enabled {
            return;
        }

        self.grid.rows.sort_by(|a, b| {
            let ordering = compare(&a.source, &b.source, column);
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

/// Typed comparison; absent values sort after present ones.
fn compare(a: &Row, b: &Row, column: Column) -> Ordering {
    // ---
    fn optional(a: Option<f64>, b: Option<f64>) -> Ordering {
        match (a, b) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match column {
        Column::Time => a.timestamp.cmp(&b.timestamp),
        Column::Location => a.location.cmp(&b.location),
        Column::ProcessStage => a.process_stage.cmp(&b.process_stage),
        Column::Temperature => optional(a.temperature, b.temperature),
        Column::Humidity => optional(a.humidity, b.humidity),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 26, h, m, 0).unwrap()
    }

    fn row(ts: DateTime<Utc>, temperature: Option<f64>, humidity: Option<f64>) -> Row {
        // ---
        Row {
            timestamp: ts,
            location: "Gudang Fermentasi 1".to_string(),
            process_stage: "Fermentasi".to_string(),
            temperature,
            humidity,
        }
    }

    fn presenter() -> TablePresenter {
        TablePresenter::new(chrono_tz::Asia::Jakarta, Locale::En)
    }

    #[test]
    fn test_formats_cells() {
        // ---
        let mut table = presenter();
        let grid = table.render(&[row(at(10, 0), Some(25.3), None)]);

        assert_eq!(
            grid.rows[0].cells,
            [
                "2025-03-26 17:00:00".to_string(),
                "Gudang Fermentasi 1".to_string(),
                "Fermentasi".to_string(),
                "25.30".to_string(),
                "N/A".to_string(),
            ]
        );
        assert!(grid.sorting_enabled);
    }

    #[test]
    fn test_headers_localized() {
        // ---
        let table = TablePresenter::new(chrono_tz::Asia::Jakarta, Locale::Id);
        assert_eq!(table.grid().headers[0], "Waktu");
        assert_eq!(table.grid().headers[4], "Kelembaban (%)");
    }

    #[test]
    fn test_render_replaces_rows() {
        // ---
        let mut table = presenter();
        table.render(&[row(at(10, 0), Some(1.0), Some(2.0)), row(at(10, 1), None, None)]);
        let grid = table.render(&[row(at(11, 0), Some(3.0), Some(4.0))]);

        assert_eq!(grid.rows.len(), 1);
        assert_eq!(grid.rows[0].cells[3], "3.00");
    }

    #[test]
    fn test_sort_numeric_with_absent_last() {
        // ---
        let mut table = presenter();
        table.render(&[
            row(at(10, 0), Some(25.0), None),
            row(at(10, 1), None, None),
            row(at(10, 2), Some(9.5), None),
        ]);

        let grid = table.sort_by(Column::Temperature, SortOrder::Asc);
        let temps: Vec<&str> = grid.rows.iter().map(|r| r.cells[3].as_str()).collect();
        assert_eq!(temps, vec!["9.50", "25.00", "N/A"]);

        let grid = table.sort_by(Column::Time, SortOrder::Desc);
        assert_eq!(grid.rows[0].cells[0], "2025-03-26 17:02:00");
    }

    #[test]
    fn test_sort_survives_repopulation() {
        // ---
        let mut table = presenter();
        table.sort_by(Column::Time, SortOrder::Desc);

        let grid = table.render(&[row(at(10, 0), Some(1.0), None), row(at(10, 5), Some(2.0), None)]);

        assert_eq!(
            grid.sort,
            Some(SortState {
                column: Column::Time,
                order: SortOrder::Desc
            })
        );
        assert_eq!(grid.rows[0].cells[0], "2025-03-26 17:05:00");
    }

    #[test]
    fn test_format_value() {
        // ---
        assert_eq!(format_value(Some(60.0)), "60.00");
        assert_eq!(format_value(Some(25.456)), "25.46");
        assert_eq!(format_value(None), "N/A");
    }
}
