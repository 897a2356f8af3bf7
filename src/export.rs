//! Writes a stored table back out for download.

use crate::error::TaskSheetError;
use crate::table::Table;
use crate::table::Value;
use rust_xlsxwriter::Format;
use rust_xlsxwriter::Workbook;
use rust_xlsxwriter::XlsxError;

/// Single-sheet workbook with a bold header row. Numbers stay numeric,
/// every other cell is written as its display text and empty cells are
/// skipped.
pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, TaskSheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header = Format::new().set_bold();

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, to_col(col)?, name, &header)?;
    }
    for (row, record) in table.rows().iter().enumerate() {
        let row = u32::try_from(row + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, value) in record.iter().enumerate() {
            let col = to_col(col)?;
            match value {
                Value::Empty => {}
                Value::Number(number) => {
                    worksheet.write_number(row, col, *number)?;
                }
                value => {
                    worksheet.write_string(row, col, &value.to_string())?;
                }
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;
    tracing::debug!(target: "tasksheet::export", rows = table.len(), bytes = buffer.len(), "wrote xlsx");
    Ok(buffer)
}

/// Comma separated text with a header line.
pub fn to_csv(table: &Table) -> Result<String, TaskSheetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for record in table.rows() {
        writer.write_record(record.iter().map(|value| value.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|error| error.into_error())?;
    Ok(String::from_utf8(bytes).map_err(|error| error.utf8_error())?)
}

fn to_col(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}
