use crate::error::TaskSheetError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::header_names;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use crate::table::Value;

/// Decodes UTF-8 CSV. The first record is the header; shorter records are
/// padded with empty cells.
pub(crate) fn read_table(bytes: &[u8], criteria: &Criteria) -> Result<Table, TaskSheetError> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        Err(SpreadsheetError::EncodingError("UTF-8".to_owned()))?
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Table::default());
    };
    let columns = header_names(header.iter().map(str::to_owned).collect());

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.len() > columns.len() {
            let line = record.position().map(|position| position.line()).unwrap_or_default();
            Err(SpreadsheetError::FieldCountError(line, columns.len(), record.len()))?
        }
        let mut row: Vec<Value> = record.iter().map(|field| parse_field(field, criteria)).collect();
        row.resize(columns.len(), Value::Empty);
        rows.push(row);
    }
    Ok(Table::new(columns, rows))
}

/// Null literals become empty, finite numbers become numbers, anything
/// else stays text.
pub(crate) fn parse_field(field: &str, criteria: &Criteria) -> Value {
    if criteria.is_null(field) || criteria.is_null(field.trim()) {
        return Value::Empty;
    }
    match field.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Value::Number(number),
        _ => Value::Text(field.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_header_and_typed_cells() {
        let csv = "\u{feff}Task Name,Progress,Start Date\nDesign,50%,2024-01-01\nBuild,75,\n";
        let table = read_table(csv.as_bytes(), &Criteria::default()).unwrap();

        assert_eq!(table.columns(), ["Task Name", "Progress", "Start Date"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Progress"), Some(&Value::from("50%")));
        assert_eq!(table.get(0, "Start Date"), Some(&Value::from("2024-01-01")));
        assert_eq!(table.get(1, "Progress"), Some(&Value::Number(75.0)));
        assert_eq!(table.get(1, "Start Date"), Some(&Value::Empty));
    }

    #[test]
    fn pads_short_rows_and_rejects_long_ones() {
        let table = read_table(b"A,B,C\n1\n,,\n", &Criteria::default()).unwrap();
        assert_eq!(table.rows()[0], [Value::Number(1.0), Value::Empty, Value::Empty]);
        assert!(table.rows()[1].iter().all(Value::is_blank));

        let error = read_table(b"A,B\n1,2,3\n", &Criteria::default()).unwrap_err();
        assert_eq!(error.to_string(), "Expected 2 fields in line 2, saw 3");
    }

    #[test]
    fn names_blank_and_duplicate_headers() {
        let table = read_table(b"Task,,Task\nx,y,z\n", &Criteria::default()).unwrap();
        assert_eq!(table.columns(), ["Task", "Unnamed: 1", "Task.1"]);
    }

    #[test]
    fn null_literals_are_empty() {
        let table = read_table(b"Progress\nN/A\nnull\n0.5\n", &Criteria::default()).unwrap();
        assert_eq!(table.column_values("Progress").unwrap(), [&Value::Empty, &Value::Empty, &Value::Number(0.5)]);
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(read_table(b"Task\n\xff\xfe\xfa\n", &Criteria::default()).is_err());
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = read_table(b"", &Criteria::default()).unwrap();
        assert!(table.columns().is_empty());
    }
}
