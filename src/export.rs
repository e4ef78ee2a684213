//! Spreadsheet export of the reconciled rows.
//!
//! Excel has no timezone-aware date type, so timestamps are written as naive
//! local times in the display zone. The zone is recorded in the workbook
//! properties and in the time column header.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use rust_xlsxwriter::{DocProperties, Format, Workbook, XlsxError};
use tracing::info;

use crate::error::{DashboardError, DashboardResult};
use crate::locale::Locale;
use crate::models::Row;

// ---

/// Writes rows to an `.xlsx` file with a fixed column schema.
#[derive(Debug, Clone)]
pub struct Exporter {
    tz: Tz,
    locale: Locale,
}

impl Exporter {
    pub fn new(tz: Tz, locale: Locale) -> Self {
        Exporter { tz, locale }
    }

    /// Export `rows` to `destination`, appending `.xlsx` when missing.
    ///
    /// Returns the path actually written. No file is created for an empty
    /// row set.
    pub fn export(&self, rows: &[Row], destination: &Path) -> DashboardResult<PathBuf> {
        // ---
        if rows.is_empty() {
            return Err(DashboardError::NoData);
        }

        let path = with_xlsx_extension(destination);
        self.write_workbook(rows, &path)
            .map_err(|e| DashboardError::WriteFailed(format!("{}: {}", path.display(), e)))?;

        info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(path)
    }

    fn write_workbook(&self, rows: &[Row], path: &Path) -> Result<(), XlsxError> {
        // ---
        let labels = self.locale.labels();

        let mut workbook = Workbook::new();
        let properties = DocProperties::new()
            .set_title("Sensor readings")
            .set_comment(format!(
                "Timestamps are local time in {} without offset",
                self.tz.name()
            ));
        workbook.set_properties(&properties);

        let header_format = Format::new().set_bold();
        let time_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let value_format = Format::new().set_num_format("0.00");

        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Data")?;

        let headers = [
            format!("{} ({})", labels.time, self.tz.name()),
            labels.location.to_string(),
            labels.process_stage.to_string(),
            labels.temperature.to_string(),
            labels.humidity.to_string(),
        ];
        for (col, header) in headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (i, row) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            let local = row.timestamp.with_timezone(&self.tz).naive_local();

            worksheet.write_datetime_with_format(r, 0, &local, &time_format)?;
            worksheet.write_string(r, 1, &row.location)?;
            worksheet.write_string(r, 2, &row.process_stage)?;
            if let Some(t) = row.temperature {
                worksheet.write_number_with_format(r, 3, t, &value_format)?;
            }
            if let Some(h) = row.humidity {
                worksheet.write_number_with_format(r, 4, h, &value_format)?;
            }
        }

        worksheet.set_column_width(0, 28)?;
        worksheet.set_column_width(1, 22)?;
        worksheet.set_column_width(2, 16)?;
        worksheet.set_column_width(3, 18)?;
        worksheet.set_column_width(4, 16)?;

        workbook.save(path)
    }
}

fn with_xlsx_extension(path: &Path) -> PathBuf {
    // ---
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));

    if has_ext {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".xlsx");
        PathBuf::from(name)
    }
}
