//! # Task Sheet
//!
//! Decoding, validation and normalization for uploaded project task
//! spreadsheets.
//!
//! ## Features
//!
//! - **Multi-format decoding**: `.xlsx`, `.xls`, `.csv` and `.json` files into one
//!   in-memory [`Table`]
//! - **Structure analysis**: required/extra column checks and advisory
//!   data-quality suggestions, rendered as a plain-text report
//! - **Row normalization**: calendar dates stored as `YYYY-MM-DD`, progress
//!   stored as a fraction and displayed as a whole percentage
//! - **Export**: tables written back to XLSX or CSV for download
//!
//! ## Pipeline
//!
//! [`ingest`] runs the upload path end to end: decode, normalize for storage,
//! then analyze the normalized table. Views are produced on demand with
//! [`normalize_for_display`] or [`filter_for_display`].

pub mod analyzer;
pub mod error;
pub mod export;
mod helpers;
pub mod normalizer;
pub mod schema;
pub mod spreadsheet;
pub mod table;

pub use analyzer::analyze;
pub use analyzer::analyze_path;
pub use analyzer::render_error;
pub use analyzer::render_report;
pub use analyzer::AnalysisResult;
pub use error::TaskSheetError;
pub use normalizer::filter_for_display;
pub use normalizer::normalize_for_display;
pub use normalizer::normalize_for_ingest;
pub use normalizer::update_progress;
pub use normalizer::TaskView;
pub use schema::Options;
pub use schema::TaskSchema;
pub use spreadsheet::criteria::Criteria;
pub use spreadsheet::read_table;
pub use spreadsheet::read_table_from_path;
pub use spreadsheet::FileFormat;
pub use table::Table;
pub use table::Value;

use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

/// Outcome of the upload path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ingested {
    pub format: FileFormat,
    /// Normalized table, ready to be stored
    pub table: Table,
    /// Absent for formats the analyzer does not inspect
    pub analysis: Option<AnalysisResult>,
}

/// Decodes an uploaded file, normalizes it for storage and analyzes the
/// result. The format comes from the extension of `file_name`.
pub fn ingest(bytes: &[u8], file_name: &str, options: &Options) -> Result<Ingested, TaskSheetError> {
    let format = FileFormat::from_path(Path::new(file_name))?;
    tracing::info!(target: "tasksheet::ingest", file = %file_name, format = %format, size = bytes.len(), "ingesting upload");

    let table = read_table(bytes, format, &options.criteria)?;
    let table = normalize_for_ingest(table, &options.schema);
    let analysis = if format.is_analyzable() {
        Some(analyze(&table, format, &options.schema)?)
    } else {
        None
    };

    tracing::info!(
        target: "tasksheet::ingest",
        rows = table.len(),
        columns = table.columns().len(),
        valid = analysis.as_ref().map(|analysis| analysis.valid),
        "ingested upload"
    );
    Ok(Ingested { format, table, analysis })
}
