//! # Spreadsheet Decoding
//!
//! Turns uploaded CSV, JSON, Excel 2007+ (.xlsx) and Excel 97-2003 (.xls)
//! files into a [`Table`]. The format is chosen from the file extension;
//! every decoder failure surfaces as [`TaskSheetError::ReadError`].

pub(crate) mod cell;
pub mod criteria;
pub(crate) mod csv;
mod excel;
mod json;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xls;
mod xlsx;

use crate::error::ResultMessage;
use crate::error::TaskSheetError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::xls::XlsSpreadsheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use crate::table::Table;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Missing part '{0}' in workbook")]
    FileError(String),

    #[error("Workbook contains no worksheets")]
    SpreadsheetEmptyError,

    #[error("Workbook is password protected")]
    SpreadsheetPasswordProtectedError,

    #[error("Worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Invalid cell value '{1}' at {0}")]
    CellValueError(String, String),

    #[error("Shared string {1} referenced at {0} does not exist")]
    SharedStringError(String, usize),

    #[error("File is not valid {0}")]
    EncodingError(String),

    #[error("Expected {1} fields in line {0}, saw {2}")]
    FieldCountError(u64, usize, usize),

    #[error("JSON must be an array of records or an object of columns")]
    JsonLayoutError,
}

/// Upload formats, keyed by file extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Xlsx,
    Xls,
    Csv,
    Json,
}

impl FileFormat {
    /// Accepts `xlsx` or `.xlsx` in any case.
    pub fn from_extension(extension: &str) -> Result<Self, TaskSheetError> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "" => Err(TaskSheetError::UnsupportedFormat(String::new())),
            other => Err(TaskSheetError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TaskSheetError> {
        let extension = path
            .as_ref()
            .extension()
            .map(|extension| extension.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Extension with its leading dot, lowercase.
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => ".xlsx",
            Self::Xls => ".xls",
            Self::Csv => ".csv",
            Self::Json => ".json",
        }
    }

    /// JSON uploads are accepted for ingestion but not structure analysis.
    pub const fn is_analyzable(&self) -> bool {
        !matches!(self, Self::Json)
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Decodes an in-memory upload.
pub fn read_table(bytes: &[u8], format: FileFormat, criteria: &Criteria) -> Result<Table, TaskSheetError> {
    if bytes.len() > criteria.max_file_size {
        Err(TaskSheetError::FileTooLarge { size: bytes.len(), limit: criteria.max_file_size })?
    }
    tracing::debug!(target: "tasksheet::read", format = %format, size = bytes.len(), "decoding spreadsheet");
    let table = match format {
        FileFormat::Csv => self::csv::read_table(bytes, criteria),
        FileFormat::Json => self::json::read_table(bytes, criteria),
        FileFormat::Xlsx => XlsxSpreadsheet::open(bytes.to_vec()).and_then(|mut spreadsheet| spreadsheet.read_table(criteria)),
        FileFormat::Xls => XlsSpreadsheet::open(bytes.to_vec()).and_then(|mut spreadsheet| spreadsheet.read_table(criteria)),
    }
    .or_read_error();
    match &table {
        Ok(table) => tracing::debug!(target: "tasksheet::read", rows = table.len(), columns = table.columns().len(), "decoded spreadsheet"),
        Err(error) => tracing::warn!(target: "tasksheet::read", format = %format, error = %error, "failed to decode spreadsheet"),
    }
    table
}

/// Decodes a file on disk, choosing the decoder from its extension.
pub fn read_table_from_path<P: AsRef<Path>>(path: P, criteria: &Criteria) -> Result<(FileFormat, Table), TaskSheetError> {
    let path = path.as_ref();
    if !path.exists() {
        Err(TaskSheetError::NotFound(path.display().to_string()))?
    }
    let format = FileFormat::from_path(path)?;
    let size = path.metadata().map_err(TaskSheetError::from).or_read_error()?.len() as usize;
    if size > criteria.max_file_size {
        Err(TaskSheetError::FileTooLarge { size, limit: criteria.max_file_size })?
    }
    let bytes = std::fs::read(path).map_err(TaskSheetError::from).or_read_error()?;
    let table = read_table(&bytes, format, criteria)?;
    Ok((format, table))
}
