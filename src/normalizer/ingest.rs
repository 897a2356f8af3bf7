use crate::schema::TaskSchema;
use crate::table::date::date_of;
use crate::table::ColumnKind;
use crate::table::Table;
use crate::table::Value;

/// Canonicalizes a freshly decoded table for storage: date columns become
/// `YYYY-MM-DD` text and progress becomes a fraction in [0, 1]. A column
/// that cannot be converted as a whole is left exactly as it was.
pub fn normalize_for_ingest(mut table: Table, schema: &TaskSchema) -> Table {
    for column in &schema.date_columns {
        if let Some(col) = table.column_index(column) {
            match normalize_dates(&table, col) {
                Some(values) => table.replace_column(col, values),
                None => tracing::debug!(target: "tasksheet::ingest", column = %column, "left date column unchanged"),
            }
        }
    }
    if let Some(col) = table.column_index(&schema.progress_column) {
        match scale_progress(&table, col) {
            Some(values) => table.replace_column(col, values),
            None => tracing::debug!(target: "tasksheet::ingest", column = %schema.progress_column, "left progress column unchanged"),
        }
    }
    table
}

fn normalize_dates(table: &Table, col: usize) -> Option<Vec<Value>> {
    table
        .rows()
        .iter()
        .map(|record| match &record[col] {
            value if value.is_blank() => Some(Value::Empty),
            value => date_of(value).map(|date| Value::Text(date.format("%Y-%m-%d").to_string())),
        })
        .collect()
}

/// Progress column as fractions. Text columns are read as percentages with
/// an optional trailing `%`; numeric columns are divided by 100 when any
/// value exceeds 1. `None` when the column cannot be converted.
fn scale_progress(table: &Table, col: usize) -> Option<Vec<Value>> {
    let values: Vec<&Value> = table.rows().iter().map(|record| &record[col]).collect();
    match ColumnKind::detect(values.iter().copied()) {
        ColumnKind::Text => values
            .iter()
            .map(|value| match value {
                value if value.is_blank() => Some(Value::Empty),
                Value::Number(number) => Some(to_fraction(*number / 100.0)),
                Value::Text(text) => parse_percent(text).map(|number| to_fraction(number / 100.0)),
                _ => None,
            })
            .collect(),
        ColumnKind::Number => {
            let scale = values
                .iter()
                .filter_map(|value| value.as_number())
                .any(|number| number > 1.0);
            let divisor = if scale { 100.0 } else { 1.0 };
            Some(
                values
                    .iter()
                    .map(|value| value.as_number().map(|number| to_fraction(number / divisor)).unwrap_or_default())
                    .collect(),
            )
        }
        _ => None,
    }
}

fn parse_percent(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches('%')
        .trim_end()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn to_fraction(number: f64) -> Value {
    Value::Number(number.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(column: &str, values: Vec<Value>) -> Table {
        Table::new(vec![column.to_owned()], values.into_iter().map(|value| vec![value]).collect())
    }

    fn progress(table: &Table) -> Vec<Value> {
        table.column_values("Progress").unwrap().into_iter().cloned().collect()
    }

    #[test]
    fn text_progress_becomes_fraction() {
        let normalized = normalize_for_ingest(table("Progress", vec!["50%".into(), " 20 % ".into(), Value::Number(75.0), Value::Empty]), &TaskSchema::default());
        assert_eq!(progress(&normalized), [Value::Number(0.5), Value::Number(0.2), Value::Number(0.75), Value::Empty]);
    }

    #[test]
    fn percentage_numbers_are_scaled() {
        let normalized = normalize_for_ingest(table("Progress", vec![Value::Number(75.0), Value::Number(0.0)]), &TaskSchema::default());
        assert_eq!(progress(&normalized), [Value::Number(0.75), Value::Number(0.0)]);
    }

    #[test]
    fn fractions_are_a_fixed_point() {
        let schema = TaskSchema::default();
        let once = normalize_for_ingest(table("Progress", vec!["40%".into(), Value::Number(100.0)]), &schema);
        let twice = normalize_for_ingest(once.clone(), &schema);
        assert_eq!(progress(&once), [Value::Number(0.4), Value::Number(1.0)]);
        assert_eq!(once, twice);
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let normalized = normalize_for_ingest(table("Progress", vec![Value::Number(150.0), Value::Number(-20.0)]), &TaskSchema::default());
        assert_eq!(progress(&normalized), [Value::Number(1.0), Value::Number(0.0)]);
    }

    #[test]
    fn unparseable_progress_is_left_alone() {
        let original = table("Progress", vec!["50%".into(), "half".into()]);
        assert_eq!(normalize_for_ingest(original.clone(), &TaskSchema::default()), original);
    }

    #[test]
    fn dates_become_iso_text() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let normalized = normalize_for_ingest(
            table("Start Date", vec!["2024-01-01".into(), "January 15, 2024".into(), Value::Date(date), Value::Empty]),
            &TaskSchema::default(),
        );
        let values: Vec<String> = normalized.column_values("Start Date").unwrap().iter().map(|value| value.to_string()).collect();
        assert_eq!(values, ["2024-01-01", "2024-01-15", "2024-02-01", ""]);
        assert_eq!(normalized.get(0, "Start Date"), Some(&Value::from("2024-01-01")));
    }

    #[test]
    fn invalid_dates_leave_the_column_untouched() {
        let original = table("End Date", vec!["2024-01-01".into(), "next week".into()]);
        assert_eq!(normalize_for_ingest(original.clone(), &TaskSchema::default()), original);
    }

    #[test]
    fn missing_columns_are_ignored() {
        let original = table("Task Name", vec!["Design".into()]);
        assert_eq!(normalize_for_ingest(original.clone(), &TaskSchema::default()), original);
    }
}
