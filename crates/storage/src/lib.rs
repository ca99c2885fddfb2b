//! Storage Layer
//!
//! Provides the in-memory session log shared by the poller and the
//! dashboard, plus spreadsheet export of readings.

mod export;
mod session;

pub use export::{read_sheet, ExportRow, XlsxExporter, HEADERS};
pub use session::{AlertBanner, ChartSnapshot, SessionLog};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Lock error: {0}")]
    LockError(String),
    #[error("No readings recorded yet")]
    NoData,
    #[error("Export error: {0}")]
    ExportError(String),
}

impl From<rust_xlsxwriter::XlsxError> for StorageError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        StorageError::ExportError(err.to_string())
    }
}

impl From<calamine::XlsxError> for StorageError {
    fn from(err: calamine::XlsxError) -> Self {
        StorageError::ExportError(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::ExportError(err.to_string())
    }
}
