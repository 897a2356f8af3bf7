//! # Structure Analysis
//!
//! Checks a decoded table against the [`TaskSchema`]: which required
//! columns are missing, which columns are extra, and a data-quality pass
//! whose findings are advisory. Only missing columns make a table invalid.

mod report;

pub use report::render_error;
pub use report::render_report;

use crate::error::TaskSheetError;
use crate::schema::Options;
use crate::schema::TaskSchema;
use crate::spreadsheet::read_table_from_path;
use crate::spreadsheet::FileFormat;
use crate::table::date::date_of;
use crate::table::ColumnKind;
use crate::table::Table;
use crate::table::Value;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

/// Summary of one table checked against the schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_format: FileFormat,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Storage kind per column, parallel to `columns`
    pub column_kinds: Vec<ColumnKind>,
    /// Schema columns absent from the table, in schema order
    pub missing_columns: Vec<String>,
    /// Table columns outside the schema, in table order
    pub extra_columns: Vec<String>,
    pub valid: bool,
    /// Rows whose every cell is blank
    pub empty_rows: usize,
    pub suggestions: Vec<String>,
}

impl AnalysisResult {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// Analyzes an in-memory table decoded from `format`.
pub fn analyze(table: &Table, format: FileFormat, schema: &TaskSchema) -> Result<AnalysisResult, TaskSheetError> {
    if !format.is_analyzable() {
        Err(TaskSheetError::UnsupportedFormat(format.extension().to_owned()))?
    }

    let columns = table.columns().to_vec();
    let missing_columns: Vec<String> = schema
        .columns
        .iter()
        .filter(|column| !table.has_column(column))
        .cloned()
        .collect();
    let extra_columns: Vec<String> = columns
        .iter()
        .filter(|column| !schema.columns.contains(*column))
        .cloned()
        .collect();
    let column_kinds = columns
        .iter()
        .map(|column| table.column_kind(column).unwrap_or(ColumnKind::Empty))
        .collect();
    let empty_rows = table
        .rows()
        .iter()
        .filter(|record| record.iter().all(Value::is_blank))
        .count();

    let mut suggestions = Vec::new();
    if !missing_columns.is_empty() {
        suggestions.push(format!("Add missing columns: {}", missing_columns.join(", ")));
    }
    if !extra_columns.is_empty() {
        suggestions.push(format!("Consider removing extra columns: {}", extra_columns.join(", ")));
    }
    if empty_rows > 0 {
        suggestions.push(format!("Remove {empty_rows} empty rows"));
    }
    if let Some(suggestion) = check_progress(table, &schema.progress_column) {
        suggestions.push(suggestion);
    }
    for column in &schema.date_columns {
        if has_invalid_dates(table, column) {
            suggestions.push(format!("{column} column has invalid date format"));
        }
    }

    let valid = missing_columns.is_empty();
    tracing::info!(
        target: "tasksheet::analyze",
        format = %format,
        rows = table.len(),
        valid,
        missing = missing_columns.len(),
        suggestions = suggestions.len(),
        "analyzed table structure"
    );
    Ok(AnalysisResult {
        file_format: format,
        rows: table.len(),
        columns,
        column_kinds,
        missing_columns,
        extra_columns,
        valid,
        empty_rows,
        suggestions,
    })
}

/// Reads and analyzes a file on disk. Existence is checked before the
/// extension, and JSON files are refused before any decoding.
pub fn analyze_path<P: AsRef<Path>>(path: P, options: &Options) -> Result<AnalysisResult, TaskSheetError> {
    let path = path.as_ref();
    if !path.exists() {
        Err(TaskSheetError::NotFound(path.display().to_string()))?
    }
    let format = FileFormat::from_path(path)?;
    if !format.is_analyzable() {
        Err(TaskSheetError::UnsupportedFormat(format.extension().to_owned()))?
    }
    let (format, table) = read_table_from_path(path, &options.criteria)?;
    analyze(&table, format, &options.schema)
}

/// Text progress should be numeric; numeric progress should stay within 100.
fn check_progress(table: &Table, column: &str) -> Option<String> {
    let values = table.column_values(column)?;
    match ColumnKind::detect(values.iter().copied()) {
        ColumnKind::Text => Some(format!("{column} column contains text - should be numeric (0-100 or 0-1)")),
        ColumnKind::Number if values.iter().filter_map(|value| value.as_number()).any(|number| number > 100.0) => {
            Some(format!("{column} values exceed 100 - check format"))
        }
        _ => None,
    }
}

fn has_invalid_dates(table: &Table, column: &str) -> bool {
    table
        .column_values(column)
        .map(|values| values.iter().any(|value| !value.is_blank() && date_of(value).is_none()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_columns() -> Vec<String> {
        TaskSchema::default().columns
    }

    fn row(progress: Value, start: &str) -> Vec<Value> {
        vec![
            "Apollo".into(),
            "Design".into(),
            "Ana".into(),
            start.into(),
            Value::Number(3.0),
            "2024-01-04".into(),
            progress,
        ]
    }

    #[test]
    fn complete_table_is_valid() {
        let table = Table::new(schema_columns(), vec![row(Value::Number(0.5), "2024-01-01")]);
        let result = analyze(&table, FileFormat::Csv, &TaskSchema::default()).unwrap();

        assert!(result.valid);
        assert!(result.missing_columns.is_empty());
        assert!(result.extra_columns.is_empty());
        assert!(result.suggestions.is_empty());
        assert_eq!(result.rows, 1);
        assert_eq!(result.column_count(), 7);
        assert_eq!(result.column_kinds[6], ColumnKind::Number);
    }

    #[test]
    fn missing_and_extra_columns_keep_their_order() {
        let columns = vec!["Owner".to_owned(), "Task Name".to_owned(), "Notes".to_owned(), "Progress".to_owned()];
        let table = Table::new(columns, vec![]);
        let result = analyze(&table, FileFormat::Xlsx, &TaskSchema::default()).unwrap();

        assert!(!result.valid);
        assert_eq!(result.missing_columns, ["Project Name", "Assigned to", "Start Date", "Days Required", "End Date"]);
        assert_eq!(result.extra_columns, ["Owner", "Notes"]);
        assert_eq!(result.suggestions, [
            "Add missing columns: Project Name, Assigned to, Start Date, Days Required, End Date",
            "Consider removing extra columns: Owner, Notes",
        ]);
    }

    #[test]
    fn data_quality_suggestions_are_advisory_and_ordered() {
        let blank = vec![Value::Empty; 7];
        let table = Table::new(
            schema_columns(),
            vec![row("50%".into(), "soon"), blank.clone(), blank, row(Value::Number(1.0), "03/04/2024")],
        );
        let result = analyze(&table, FileFormat::Csv, &TaskSchema::default()).unwrap();

        assert!(result.valid);
        assert_eq!(result.empty_rows, 2);
        assert_eq!(result.suggestions, [
            "Remove 2 empty rows",
            "Progress column contains text - should be numeric (0-100 or 0-1)",
            "Start Date column has invalid date format",
        ]);
    }

    #[test]
    fn progress_above_one_hundred() {
        let table = Table::new(schema_columns(), vec![row(Value::Number(150.0), "2024-01-01")]);
        let result = analyze(&table, FileFormat::Xls, &TaskSchema::default()).unwrap();
        assert_eq!(result.suggestions, ["Progress values exceed 100 - check format"]);
    }

    #[test]
    fn progress_suggestions_name_the_configured_column() {
        let schema = TaskSchema { progress_column: "Complete".to_owned(), ..TaskSchema::default() };
        let columns = vec!["Task Name".to_owned(), "Complete".to_owned()];

        let table = Table::new(columns.clone(), vec![vec!["Design".into(), "half".into()]]);
        let result = analyze(&table, FileFormat::Csv, &schema).unwrap();
        assert!(result.suggestions.contains(&"Complete column contains text - should be numeric (0-100 or 0-1)".to_owned()));

        let table = Table::new(columns, vec![vec!["Design".into(), Value::Number(250.0)]]);
        let result = analyze(&table, FileFormat::Csv, &schema).unwrap();
        assert!(result.suggestions.contains(&"Complete values exceed 100 - check format".to_owned()));
    }

    #[test]
    fn json_is_not_analyzable() {
        let error = analyze(&Table::default(), FileFormat::Json, &TaskSchema::default()).unwrap_err();
        assert_eq!(error.to_string(), "Unsupported file type: .json");
    }
}
