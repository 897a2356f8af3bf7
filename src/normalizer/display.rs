use crate::schema::TaskSchema;
use crate::table::Table;
use crate::table::Value;
use serde::Deserialize;
use serde::Serialize;

/// Binary progress tag used to color a task's progress bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressColor {
    /// No progress at all
    Empty,
    /// Anything above zero, including complete
    Started,
}

impl ProgressColor {
    fn of(progress: u8) -> Self {
        if progress == 0 { ProgressColor::Empty } else { ProgressColor::Started }
    }

    pub fn css(&self) -> &'static str {
        match self {
            ProgressColor::Empty => "red",
            ProgressColor::Started => "lightgreen",
        }
    }
}

/// One rendered task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    /// Row position in the stored table, usable with [`Table::edit_cell`]
    pub index: usize,
    /// Cells parallel to [`TaskView::columns`], progress as a whole percentage
    pub cells: Vec<Value>,
    pub progress: u8,
    pub color: ProgressColor,
    /// Progress bar width in percent
    pub width: u8,
}

/// Display-only projection of a table. Never written back to storage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub columns: Vec<String>,
    pub rows: Vec<TaskRow>,
}

impl TaskView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Renders every row of `table`. Progress becomes an integer percentage,
/// or 0 for every row when the table has no progress column.
pub fn normalize_for_display(table: &Table, schema: &TaskSchema) -> TaskView {
    render(table, schema, 0..table.len())
}

/// Renders the rows of `table` matching `filters`. A row renders the same
/// here as it does in [`normalize_for_display`].
pub fn filter_for_display(table: &Table, filters: &[(String, String)], schema: &TaskSchema) -> TaskView {
    render(table, schema, table.matching_rows(filters))
}

fn render<I: IntoIterator<Item = usize>>(table: &Table, schema: &TaskSchema, rows: I) -> TaskView {
    let column = table.column_index(&schema.progress_column);
    let percentages = percentages(table, column);

    let mut columns = table.columns().to_vec();
    if column.is_none() {
        columns.push(schema.progress_column.to_owned());
    }

    let rows = rows
        .into_iter()
        .map(|index| {
            let progress = percentages.get(index).copied().unwrap_or(0);
            let mut cells = table.rows()[index].clone();
            match column {
                Some(col) => cells[col] = Value::Number(f64::from(progress)),
                None => cells.push(Value::Number(0.0)),
            }
            TaskRow { index, cells, progress, color: ProgressColor::of(progress), width: progress }
        })
        .collect();
    TaskView { columns, rows }
}

/// Whole percentage per row from the stored fraction. Cells holding no
/// number render as 0.
fn percentages(table: &Table, column: Option<usize>) -> Vec<u8> {
    let Some(col) = column else {
        return vec![0; table.len()];
    };
    table
        .rows()
        .iter()
        .map(|record| match record[col].as_number() {
            Some(fraction) if fraction.is_finite() => (fraction * 100.0).round().clamp(0.0, 100.0) as u8,
            _ => 0,
        })
        .collect()
}
