use crate::error::TaskSheetError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::criteria::Criteria;
use crate::table::Table;
use crate::table::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Cells collected from one worksheet, in any order.
pub(crate) struct Sheet {
    pub(crate) name: String,
    cells: Vec<Cell>,
    /// Actual data range
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn push(&mut self, cell: Cell) {
        if self.col_lower_bound.map(|lower| cell.col < lower).unwrap_or(true) {
            self.col_lower_bound = Some(cell.col);
        }
        if self.col_upper_bound.map(|upper| upper < cell.col).unwrap_or(true) {
            self.col_upper_bound = Some(cell.col);
        }
        self.cells.push(cell);
    }

    /// Lays the cells out as a table. The first row holding a non-blank
    /// cell is the header; rows below it keep their position, so gaps in
    /// the sheet become fully empty rows.
    pub(crate) fn into_table(self, shared_strings: &[String], criteria: &Criteria) -> Result<Table, TaskSheetError> {
        let (Some(col_lower), Some(col_upper)) = (self.col_lower_bound, self.col_upper_bound) else {
            return Ok(Table::default());
        };
        let width = col_upper - col_lower + 1;

        let mut rows = BTreeMap::<usize, Vec<Value>>::new();
        for cell in &self.cells {
            let value = match cell.to_value(shared_strings)? {
                Value::Text(text) if criteria.is_null(&text) => Value::Empty,
                value => value,
            };
            let record = rows.entry(cell.row).or_insert_with(|| vec![Value::Empty; width]);
            record[cell.col - col_lower] = value;
        }

        let Some(header_row) = rows
            .iter()
            .find(|(_, record)| record.iter().any(|value| !value.is_blank()))
            .map(|(row, _)| *row)
        else {
            return Ok(Table::default());
        };
        let last_row = rows.keys().next_back().copied().unwrap_or(header_row);

        let header = rows.remove(&header_row).unwrap_or_default();
        let columns = header_names(header.iter().map(Value::to_string).collect());
        let records = (header_row + 1..=last_row)
            .map(|row| rows.remove(&row).unwrap_or_else(|| vec![Value::Empty; width]))
            .collect();
        Ok(Table::new(columns, records))
    }
}

/// Names blank headers `Unnamed: <index>` and suffixes repeated names with
/// `.1`, `.2` in order of appearance.
pub(crate) fn header_names(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashMap::<String, usize>::new();
    let mut names = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let name = if name.trim().is_empty() { format!("Unnamed: {index}") } else { name };
        let mut candidate = name.to_owned();
        if let Some(mut count) = seen.get(&name).copied() {
            loop {
                count += 1;
                candidate = format!("{name}.{count}");
                if !seen.contains_key(&candidate) {
                    break;
                }
            }
            seen.insert(name, count);
        }
        seen.insert(candidate.to_owned(), 0);
        names.push(candidate);
    }
    names
}
