//! Spreadsheet Export
//!
//! Writes readings as `.xlsx` with the column layout of the straddle log
//! sheet. Times are written on the exchange clock.

use crate::StorageError;
use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use chrono::Duration;
use premium_window::Reading;
use rust_xlsxwriter::{Format, Workbook};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sheet header, in column order
pub const HEADERS: [&str; 5] = ["Time", "Strike Price", "CE Price", "PE Price", "Total Premium"];

/// One spreadsheet row
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub time: String,
    pub strike_price: f64,
    pub call_price: f64,
    pub put_price: f64,
    pub total_premium: f64,
}

/// Spreadsheet writer for readings
#[derive(Debug, Clone, Copy)]
pub struct XlsxExporter {
    /// Exchange clock offset from UTC
    utc_offset: Duration,
}

impl XlsxExporter {
    /// Create an exporter writing times at `utc_offset_minutes` from UTC
    pub fn new(utc_offset_minutes: i64) -> Self {
        Self {
            utc_offset: Duration::minutes(utc_offset_minutes),
        }
    }

    /// Sheet row for a reading
    pub fn row(&self, reading: &Reading) -> ExportRow {
        ExportRow {
            time: (reading.timestamp + self.utc_offset).format(TIME_FORMAT).to_string(),
            strike_price: reading.strike_price,
            call_price: reading.call_price,
            put_price: reading.put_price,
            total_premium: reading.total_premium,
        }
    }

    /// Write all readings to `path`, replacing any existing file
    ///
    /// # Errors
    /// Returns error if the workbook cannot be written
    pub fn export(&self, path: &Path, readings: &[Reading]) -> Result<usize, StorageError> {
        let rows: Vec<ExportRow> = readings.iter().map(|r| self.row(r)).collect();
        write_sheet(path, &rows)?;

        info!("Exported {} readings to {}", rows.len(), path.display());
        Ok(rows.len())
    }

    /// Add one reading below the rows already in `path`, returning the row count
    ///
    /// A missing file is created with the header.
    pub fn append(&self, path: &Path, reading: &Reading) -> Result<usize, StorageError> {
        let mut rows = if path.exists() { read_sheet(path)? } else { Vec::new() };
        rows.push(self.row(reading));
        write_sheet(path, &rows)?;

        info!("Appended reading at {} to {}", reading.timestamp, path.display());
        Ok(rows.len())
    }
}

/// Read the data rows of the first sheet, skipping the header
pub fn read_sheet(path: &Path) -> Result<Vec<ExportRow>, StorageError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(Vec::new()),
    };

    let rows = range
        .rows()
        .skip(1)
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(parse_row)
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn parse_row(cells: &[Data]) -> Result<ExportRow, StorageError> {
    let number = |column: usize| {
        cells.get(column).and_then(|c| c.as_f64()).ok_or_else(|| {
            StorageError::ExportError(format!("column {} is not a number", HEADERS[column]))
        })
    };

    Ok(ExportRow {
        time: cells
            .first()
            .and_then(|c| c.as_string())
            .ok_or_else(|| StorageError::ExportError("missing Time column".to_string()))?,
        strike_price: number(1)?,
        call_price: number(2)?,
        put_price: number(3)?,
        total_premium: number(4)?,
    })
}

fn write_sheet(path: &Path, rows: &[ExportRow]) -> Result<(), StorageError> {
    ensure_parent(path)?;

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (column, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, column as u16, *title, &bold)?;
    }
    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        sheet.write_string(line, 0, &row.time)?;
        sheet.write_number(line, 1, row.strike_price)?;
        sheet.write_number(line, 2, row.call_price)?;
        sheet.write_number(line, 3, row.put_price)?;
        sheet.write_number(line, 4, row.total_premium)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}
