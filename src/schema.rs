//! Column-name configuration for task tables.

use crate::error::TaskSheetError;
use crate::normalizer::fraction_from_text;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::csv::parse_field;
use crate::table::Value;
use serde::Deserialize;
use serde::Serialize;

/// Names of the columns a task table is expected to carry, plus the
/// candidate lists used to locate the task and progress columns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSchema {
    /// Required columns, in report order
    pub columns: Vec<String>,
    /// Columns normalized and checked as calendar dates
    pub date_columns: Vec<String>,
    pub progress_column: String,
    /// Tried in order to find the column identifying a task
    pub task_candidates: Vec<String>,
    /// Tried in order to find the column holding progress
    pub progress_candidates: Vec<String>,
}

impl TaskSchema {
    /// First task candidate present among `columns`.
    pub fn task_column<'a>(&'a self, columns: &[String]) -> Option<&'a str> {
        first_present(&self.task_candidates, columns)
    }

    /// First progress candidate present among `columns`.
    pub fn progress_candidate<'a>(&'a self, columns: &[String]) -> Option<&'a str> {
        first_present(&self.progress_candidates, columns)
    }

    /// Stored value for text typed into `column`. Cells are typed the way
    /// CSV fields are; the progress column takes a percentage and stores
    /// the fraction.
    pub(crate) fn cell_value(&self, column: &str, text: &str) -> Result<Value, TaskSheetError> {
        let value = parse_field(text, &Criteria::default());
        if column != self.progress_column || value.is_blank() {
            return Ok(value);
        }
        fraction_from_text(text).map(Value::Number)
    }
}

fn first_present<'a>(candidates: &'a [String], columns: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|candidate| columns.contains(*candidate))
        .map(String::as_str)
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

impl Default for TaskSchema {
    fn default() -> Self {
        TaskSchema {
            columns: names(&["Project Name", "Task Name", "Assigned to", "Start Date", "Days Required", "End Date", "Progress"]),
            date_columns: names(&["Start Date", "End Date"]),
            progress_column: "Progress".to_owned(),
            task_candidates: names(&["Task Name", "Task", "Name", "Title"]),
            progress_candidates: names(&["Progress", "Complete", "Done", "Status"]),
        }
    }
}

/// Everything the ingest pipeline needs: how to decode and what to expect.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub criteria: Criteria,
    pub schema: TaskSchema,
}
