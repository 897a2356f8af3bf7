//! In-memory task table: ordered column names plus rows of [`Value`]s.
//! Columns are looked up by exact name (case and spacing matter).

mod column;
pub(crate) mod date;
mod value;

pub use column::ColumnKind;
pub use date::parse_date;
pub use value::Value;

use crate::error::TaskSheetError;
use crate::schema::TaskSchema;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table, padding or truncating every row to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Empty);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|record| &record[col])
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(|record| &record[col]).collect())
    }

    /// Storage kind of a column, `None` when the column does not exist.
    pub fn column_kind(&self, column: &str) -> Option<ColumnKind> {
        self.column_values(column).map(|values| ColumnKind::detect(values.into_iter()))
    }

    /// Replaces every cell of a column at once.
    pub(crate) fn replace_column(&mut self, col: usize, values: Vec<Value>) {
        for (record, value) in self.rows.iter_mut().zip(values) {
            record[col] = value;
        }
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: Value) {
        self.rows[row][col] = value;
    }

    /// Rows where every `(column, value)` pair matches the cell text. Pairs
    /// with an empty value or an unknown column do not restrict the result.
    pub fn filter(&self, filters: &[(String, String)]) -> Table {
        let rows = self
            .matching_rows(filters)
            .into_iter()
            .map(|row| self.rows[row].clone())
            .collect();
        Table { columns: self.columns.to_owned(), rows }
    }

    /// Indexes of the rows [`Table::filter`] keeps, in table order.
    pub fn matching_rows(&self, filters: &[(String, String)]) -> Vec<usize> {
        let active: Vec<(usize, &str)> = filters
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(column, value)| self.column_index(column).map(|col| (col, value.as_str())))
            .collect();
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, record)| active.iter().all(|(col, value)| record[*col].to_string() == *value))
            .map(|(row, _)| row)
            .collect()
    }

    /// Overwrites one cell with typed text; see [`TaskSchema`] for how the
    /// progress column is stored.
    pub fn edit_cell(&mut self, row: usize, column: &str, text: &str, schema: &TaskSchema) -> Result<(), TaskSheetError> {
        let col = self
            .column_index(column)
            .ok_or_else(|| TaskSheetError::ColumnNotFound(column.to_owned()))?;
        if row >= self.rows.len() {
            Err(TaskSheetError::RowOutOfRange { index: row, rows: self.rows.len() })?
        }
        self.rows[row][col] = schema.cell_value(column, text)?;
        Ok(())
    }

    /// Appends a row. Known columns take the given value and the rest stay
    /// empty; a table without columns takes its columns from the pairs.
    /// Nothing is appended when a value is rejected.
    pub fn append_row(&mut self, values: &[(String, String)], schema: &TaskSchema) -> Result<(), TaskSheetError> {
        let columns = if self.columns.is_empty() {
            values.iter().map(|(column, _)| column.to_owned()).collect()
        } else {
            self.columns.to_owned()
        };
        let mut record = vec![Value::Empty; columns.len()];
        for (column, text) in values {
            if let Some(col) = columns.iter().position(|name| name == column) {
                record[col] = schema.cell_value(column, text)?;
            }
        }
        self.columns = columns;
        self.rows.push(record);
        Ok(())
    }
}
