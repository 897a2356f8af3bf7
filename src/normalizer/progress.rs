use crate::error::TaskSheetError;
use crate::schema::TaskSchema;
use crate::table::Value;
use crate::table::Table;

/// Sets the progress of every row whose task column reads `task_id`.
///
/// The percentage is clamped to [0, 100] and stored as a fraction. The task
/// and progress columns are the first present entries of the schema's
/// candidate lists; when either is missing the table is left untouched and
/// [`TaskSheetError::NoSuitableColumns`] is returned. Returns the number of
/// rows updated, which may be zero.
pub fn update_progress(table: &mut Table, task_id: &str, percentage: i64, schema: &TaskSchema) -> Result<usize, TaskSheetError> {
    let (Some(task_column), Some(progress_column)) = (
        schema.task_column(table.columns()),
        schema.progress_candidate(table.columns()),
    ) else {
        return Err(TaskSheetError::NoSuitableColumns);
    };
    let (Some(task), Some(progress)) = (table.column_index(task_column), table.column_index(progress_column)) else {
        return Err(TaskSheetError::NoSuitableColumns);
    };

    let fraction = to_fraction(percentage as f64);
    let rows: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, record)| record[task].to_string() == task_id)
        .map(|(row, _)| row)
        .collect();
    for &row in &rows {
        table.set(row, progress, Value::Number(fraction));
    }

    tracing::info!(
        target: "tasksheet::progress",
        task = %task_id,
        column = %progress_column,
        fraction,
        updated = rows.len(),
        "updated task progress"
    );
    Ok(rows.len())
}

/// Stored fraction for a percentage typed as text, such as `80`, `80%` or
/// `12.5`. Out-of-range percentages are clamped.
pub(crate) fn fraction_from_text(text: &str) -> Result<f64, TaskSheetError> {
    text.trim()
        .trim_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|percentage| percentage.is_finite())
        .map(to_fraction)
        .ok_or_else(|| TaskSheetError::InvalidPercentage(text.to_owned()))
}

fn to_fraction(percentage: f64) -> f64 {
    percentage.clamp(0.0, 100.0) / 100.0
}

/// Reads a user-entered percentage such as `75` or `75%`.
pub fn parse_percentage(text: &str) -> Result<i64, TaskSheetError> {
    text.trim()
        .trim_matches('%')
        .trim()
        .parse::<i64>()
        .map_err(|_| TaskSheetError::InvalidPercentage(text.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> Table {
        let columns: Vec<String> = columns.iter().map(|column| column.to_string()).collect();
        let rows = vec![
            vec!["Task 1".into(), Value::Number(0.1)],
            vec!["Task 2".into(), Value::Number(0.2)],
            vec!["Task 1".into(), Value::Empty],
        ];
        Table::new(columns, rows)
    }

    #[test]
    fn updates_every_matching_row() {
        let mut table = table(&["Task Name", "Progress"]);
        let updated = update_progress(&mut table, "Task 1", 40, &TaskSchema::default()).unwrap();

        assert_eq!(updated, 2);
        assert_eq!(table.get(0, "Progress"), Some(&Value::Number(0.4)));
        assert_eq!(table.get(1, "Progress"), Some(&Value::Number(0.2)));
        assert_eq!(table.get(2, "Progress"), Some(&Value::Number(0.4)));
    }

    #[test]
    fn clamps_the_percentage() {
        let mut table = table(&["Task Name", "Progress"]);
        update_progress(&mut table, "Task 1", 150, &TaskSchema::default()).unwrap();
        assert_eq!(table.get(0, "Progress"), Some(&Value::Number(1.0)));

        update_progress(&mut table, "Task 2", -5, &TaskSchema::default()).unwrap();
        assert_eq!(table.get(1, "Progress"), Some(&Value::Number(0.0)));
    }

    #[test]
    fn falls_back_to_candidate_columns() {
        let mut table = table(&["Title", "Status"]);
        assert_eq!(update_progress(&mut table, "Task 2", 100, &TaskSchema::default()).unwrap(), 1);
        assert_eq!(table.get(1, "Status"), Some(&Value::Number(1.0)));
        assert_eq!(update_progress(&mut table, "Task 9", 100, &TaskSchema::default()).unwrap(), 0);
    }

    #[test]
    fn no_suitable_columns_leaves_table_unchanged() {
        let mut table = table(&["Owner", "Progress"]);
        let original = table.clone();
        let error = update_progress(&mut table, "Task 1", 50, &TaskSchema::default()).unwrap_err();

        assert!(matches!(error, TaskSheetError::NoSuitableColumns));
        assert_eq!(table, original);

        let mut table = self::table(&["Task Name", "Notes"]);
        assert!(matches!(update_progress(&mut table, "Task 1", 50, &TaskSchema::default()), Err(TaskSheetError::NoSuitableColumns)));
    }

    #[test]
    fn text_percentages_become_fractions() {
        assert_eq!(fraction_from_text("80").unwrap(), 0.8);
        assert_eq!(fraction_from_text(" 12.5% ").unwrap(), 0.125);
        assert_eq!(fraction_from_text("150").unwrap(), 1.0);
        assert_eq!(fraction_from_text("-3").unwrap(), 0.0);
        assert!(matches!(fraction_from_text("soon"), Err(TaskSheetError::InvalidPercentage(_))));
    }

    #[test]
    fn parses_percentages() {
        assert_eq!(parse_percentage("75").unwrap(), 75);
        assert_eq!(parse_percentage(" 80% ").unwrap(), 80);
        assert_eq!(parse_percentage("150").unwrap(), 150);
        assert!(matches!(parse_percentage("half"), Err(TaskSheetError::InvalidPercentage(text)) if text == "half"));
        assert!(parse_percentage("7.5").is_err());
    }
}
