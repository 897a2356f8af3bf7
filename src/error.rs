use thiserror::Error;

/// Main error type for the tasksheet library.
/// Aggregates the public error taxonomy with the internal decoder errors that
/// are collapsed into `ReadError` at the read boundary.
#[derive(Error, Debug)]
pub enum TaskSheetError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error reading file: {0}")]
    ReadError(String),

    #[error("Cannot update progress: no suitable columns found")]
    NoSuitableColumns,

    #[error("File too large: {size} bytes exceeds the limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Row {index} out of range for a table with {rows} rows")]
    RowOutOfRange { index: usize, rows: usize },

    #[error("Invalid percentage '{0}'")]
    InvalidPercentage(String),

    #[error("Export failed: {0}")]
    ExportError(#[from] rust_xlsxwriter::XlsxError),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    CfbHelperError(#[from] crate::helpers::cfb::CfbError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    Biff8HelperError(#[from] crate::helpers::biff8::Biff8Error),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    #[error("{0}")]
    XlsError(#[from] crate::spreadsheet::xls::XlsError),
}

impl TaskSheetError {
    /// Collapses decoder failures into `ReadError`, keeping the caller-facing
    /// variants as they are.
    pub(crate) fn into_read_error(self) -> Self {
        match self {
            Self::NotFound(_)
            | Self::UnsupportedFormat(_)
            | Self::ReadError(_)
            | Self::FileTooLarge { .. } => self,
            other => Self::ReadError(other.to_string()),
        }
    }
}

pub(crate) trait ResultOptionChain {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self;
}

impl<T, E> ResultOptionChain for Result<Option<T>, E> {
    fn ok_none_else<F>(self, f: F) -> Self
    where
        F: FnOnce() -> Self,
    {
        match self {
            Ok(None) => f(),
            _ => self,
        }
    }
}

pub(crate) trait ResultMessage {
    fn or_read_error(self) -> Self;
}

impl<T> ResultMessage for Result<T, TaskSheetError> {
    fn or_read_error(self) -> Self {
        self.map_err(TaskSheetError::into_read_error)
    }
}
