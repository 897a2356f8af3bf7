use crate::error::TaskSheetError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use crate::table::Value;
use serde_json::Map;
use serde_json::Value as JsonValue;

/// Decodes either an array of records or a column-oriented object
/// (`{"col": {"0": v}}` or `{"col": [v]}`). Column order is order of first
/// appearance.
pub(crate) fn read_table(bytes: &[u8], criteria: &Criteria) -> Result<Table, TaskSheetError> {
    let document: JsonValue = serde_json::from_slice(bytes)?;
    match document {
        JsonValue::Array(records) => read_records(records, criteria),
        JsonValue::Object(columns) => read_columns(columns, criteria),
        _ => Err(SpreadsheetError::JsonLayoutError)?,
    }
}

fn read_records(records: Vec<JsonValue>, criteria: &Criteria) -> Result<Table, TaskSheetError> {
    let mut columns = Vec::<String>::new();
    let mut objects = Vec::with_capacity(records.len());
    for record in records {
        let JsonValue::Object(object) = record else {
            return Err(SpreadsheetError::JsonLayoutError.into());
        };
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.to_owned());
            }
        }
        objects.push(object);
    }

    let rows = objects
        .into_iter()
        .map(|mut object| {
            columns
                .iter()
                .map(|column| object.remove(column).map(|value| to_value(value, criteria)).unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(Table::new(columns, rows))
}

fn read_columns(object: Map<String, JsonValue>, criteria: &Criteria) -> Result<Table, TaskSheetError> {
    let mut index = Vec::<String>::new();
    let mut cells = Vec::<(String, Vec<(String, JsonValue)>)>::new();
    for (column, values) in object {
        let values: Vec<(String, JsonValue)> = match values {
            JsonValue::Object(values) => values.into_iter().collect(),
            JsonValue::Array(values) => values.into_iter().enumerate().map(|(row, value)| (row.to_string(), value)).collect(),
            _ => Err(SpreadsheetError::JsonLayoutError)?,
        };
        for (key, _) in &values {
            if !index.contains(key) {
                index.push(key.to_owned());
            }
        }
        cells.push((column, values));
    }

    let columns: Vec<String> = cells.iter().map(|(column, _)| column.to_owned()).collect();
    let mut rows = vec![vec![Value::Empty; columns.len()]; index.len()];
    for (col, (_, values)) in cells.into_iter().enumerate() {
        for (key, value) in values {
            if let Some(row) = index.iter().position(|candidate| *candidate == key) {
                rows[row][col] = to_value(value, criteria);
            }
        }
    }
    Ok(Table::new(columns, rows))
}

fn to_value(value: JsonValue, criteria: &Criteria) -> Value {
    match value {
        JsonValue::Null => Value::Empty,
        JsonValue::Bool(flag) => Value::Text(if flag { "TRUE" } else { "FALSE" }.to_owned()),
        JsonValue::Number(number) => number.as_f64().map(Value::Number).unwrap_or_default(),
        JsonValue::String(text) if criteria.is_null(&text) => Value::Empty,
        JsonValue::String(text) => Value::Text(text),
        nested => Value::Text(nested.to_string()),
    }
}
