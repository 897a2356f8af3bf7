//! Upload-to-view pipeline tests
//!
//! Exercises the public API end to end:
//! - decoding uploads from memory and from disk
//! - ingest normalization and structure analysis
//! - display views, filtering and progress updates
//! - export and re-import

use tasksheet::export;
use tasksheet::normalizer::ProgressColor;
use tasksheet::table::ColumnKind;
use tasksheet::*;
use tempfile::TempDir;

const TASKS_CSV: &str = "\
Project Name,Task Name,Assigned to,Start Date,Days Required,End Date,Progress
Apollo,Task 1,Ana,2024-01-01,3,2024-01-04,50%
Apollo,Task 2,Ben,\"January 8, 2024\",2,2024-01-10,0%
Zephyr,Task 3,Ana,15/01/2024,5,20/01/2024,100%
";

fn ingest_tasks() -> Table {
    ingest(TASKS_CSV.as_bytes(), "tasks.csv", &Options::default()).unwrap().table
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(column, value)| (column.to_string(), value.to_string())).collect()
}

fn display_progress(view: &TaskView) -> Vec<u8> {
    view.rows.iter().map(|row| row.progress).collect()
}

#[test]
fn upload_is_normalized_and_valid() {
    let ingested = ingest(TASKS_CSV.as_bytes(), "tasks.csv", &Options::default()).unwrap();
    let table = &ingested.table;

    let progress: Vec<&Value> = table.column_values("Progress").unwrap();
    assert_eq!(progress, [&Value::Number(0.5), &Value::Number(0.0), &Value::Number(1.0)]);

    let starts: Vec<String> = table.column_values("Start Date").unwrap().iter().map(|value| value.to_string()).collect();
    assert_eq!(starts, ["2024-01-01", "2024-01-08", "2024-01-15"]);
    assert_eq!(table.get(2, "End Date"), Some(&Value::from("2024-01-20")));

    let analysis = ingested.analysis.unwrap();
    assert!(analysis.valid);
    assert_eq!(analysis.rows, 3);
    assert!(analysis.suggestions.is_empty());
    assert!(render_report(&analysis).contains("✅ Structure: Valid - All required columns present"));
}

#[test]
fn ingest_normalization_is_a_fixed_point() {
    let table = ingest_tasks();
    let again = normalize_for_ingest(table.clone(), &TaskSchema::default());
    assert_eq!(again, table);
}

#[test]
fn percentage_progress_scales_to_fractions() {
    let table = Table::new(
        vec!["Task Name".into(), "Progress".into()],
        vec![vec!["Task 1".into(), Value::Number(75.0)], vec!["Task 2".into(), Value::Number(10.0)]],
    );
    let table = normalize_for_ingest(table, &TaskSchema::default());
    assert_eq!(table.get(0, "Progress"), Some(&Value::Number(0.75)));
    assert_eq!(table.get(1, "Progress"), Some(&Value::Number(0.1)));
}

#[test]
fn display_uses_whole_percentages() {
    let view = normalize_for_display(&ingest_tasks(), &TaskSchema::default());
    assert_eq!(display_progress(&view), [50, 0, 100]);
    assert_eq!(view.rows[1].color, ProgressColor::Empty);
    assert_eq!(view.rows[2].width, 100);

    let bare = Table::new(vec!["Task Name".into()], vec![vec!["Task 1".into()], vec!["Task 2".into()]]);
    let view = normalize_for_display(&bare, &TaskSchema::default());
    assert_eq!(display_progress(&view), [0, 0]);
    assert!(!bare.has_column("Progress"));
}

#[test]
fn filtered_view_agrees_with_full_view() {
    let table = ingest_tasks();
    let schema = TaskSchema::default();
    let filters = pairs(&[("Assigned to", "Ana"), ("Project Name", "")]);

    let filtered = filter_for_display(&table, &filters, &schema);
    let full = normalize_for_display(&table, &schema);
    let expected: Vec<_> = table.matching_rows(&filters).into_iter().map(|row| full.rows[row].clone()).collect();
    assert_eq!(filtered.rows, expected);

    let subset = normalize_for_display(&table.filter(&filters), &schema);
    assert_eq!(display_progress(&subset), display_progress(&filtered));
    assert_eq!(display_progress(&filtered), [50, 100]);
}

#[test]
fn progress_updates_clamp_and_require_columns() {
    let schema = TaskSchema::default();
    let mut table = ingest_tasks();
    assert_eq!(update_progress(&mut table, "Task 1", 150, &schema).unwrap(), 1);
    assert_eq!(table.get(0, "Progress"), Some(&Value::Number(1.0)));
    assert_eq!(display_progress(&normalize_for_display(&table, &schema))[0], 100);

    let mut notes = Table::new(vec!["Owner".into(), "Notes".into()], vec![vec!["Ana".into(), "late".into()]]);
    let before = notes.clone();
    assert!(matches!(update_progress(&mut notes, "Task 1", 50, &schema), Err(TaskSheetError::NoSuitableColumns)));
    assert_eq!(notes, before);
}

#[test]
fn stored_edits_render_in_both_views() {
    let schema = TaskSchema::default();
    let upload = "Task Name,Assigned to,Progress\nDesign,Ana,50%\nBuild,Ben,25%\n";
    let mut table = ingest(upload.as_bytes(), "tasks.csv", &Options::default()).unwrap().table;
    assert_eq!(display_progress(&normalize_for_display(&table, &schema)), [50, 25]);

    table.edit_cell(1, "Progress", "80", &schema).unwrap();
    table.append_row(&pairs(&[("Task Name", "Test"), ("Assigned to", "Ana"), ("Progress", "0")]), &schema).unwrap();
    update_progress(&mut table, "Design", 60, &schema).unwrap();
    assert_eq!(table.column_kind("Progress"), Some(ColumnKind::Number));

    let full = normalize_for_display(&table, &schema);
    assert_eq!(display_progress(&full), [60, 80, 0]);
    assert_eq!(full.rows[2].color, ProgressColor::Empty);

    let ana = filter_for_display(&table, &pairs(&[("Assigned to", "Ana")]), &schema);
    assert_eq!(display_progress(&ana), [60, 0]);
    let ben = filter_for_display(&table, &pairs(&[("Assigned to", "Ben")]), &schema);
    assert_eq!(display_progress(&ben), [80]);
    assert_eq!(ben.rows[0].index, 1);
}

#[test]
fn xlsx_export_reads_back_to_the_same_table() {
    let table = ingest_tasks();
    let bytes = export::to_xlsx(&table).unwrap();
    let decoded = read_table(&bytes, FileFormat::Xlsx, &Criteria::default()).unwrap();
    assert_eq!(decoded, table);
}

#[test]
fn csv_export_reingests_unchanged() {
    let table = ingest_tasks();
    let csv = export::to_csv(&table).unwrap();
    let again = ingest(csv.as_bytes(), "export.csv", &Options::default()).unwrap();
    assert_eq!(again.table, table);
}

#[test]
fn csv_and_json_keep_column_order() {
    let csv = "Progress,Task Name,Owner\n0.5,Design,Ana\n";
    let table = read_table(csv.as_bytes(), FileFormat::Csv, &Criteria::default()).unwrap();
    assert_eq!(table.columns(), ["Progress", "Task Name", "Owner"]);

    let json = r#"[{"Progress": 0.5, "Task Name": "Design"}, {"Task Name": "Build", "Owner": "Ben"}]"#;
    let table = read_table(json.as_bytes(), FileFormat::Json, &Criteria::default()).unwrap();
    assert_eq!(table.columns(), ["Progress", "Task Name", "Owner"]);
    assert_eq!(table.get(1, "Progress"), Some(&Value::Empty));
}

#[test]
fn analyze_path_reports_file_errors() {
    let dir = TempDir::new().unwrap();
    let options = Options::default();

    let missing = dir.path().join("missing.csv");
    assert!(matches!(analyze_path(&missing, &options), Err(TaskSheetError::NotFound(_))));

    let text = dir.path().join("notes.txt");
    std::fs::write(&text, "hello").unwrap();
    let error = analyze_path(&text, &options).unwrap_err();
    assert_eq!(render_error(&error), "❌ Error: Unsupported file type: .txt");

    let json = dir.path().join("tasks.json");
    std::fs::write(&json, "[]").unwrap();
    assert!(matches!(analyze_path(&json, &options), Err(TaskSheetError::UnsupportedFormat(extension)) if extension == ".json"));

    let broken = dir.path().join("broken.xlsx");
    std::fs::write(&broken, "not a zip").unwrap();
    assert!(matches!(analyze_path(&broken, &options), Err(TaskSheetError::ReadError(_))));
}

#[test]
fn analyze_path_reads_csv_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.csv");
    std::fs::write(&path, "Task Name,Progress,Notes\nDesign,80,\n,,\n").unwrap();

    let result = analyze_path(&path, &Options::default()).unwrap();
    assert!(!result.valid);
    assert_eq!(result.empty_rows, 1);
    assert_eq!(result.extra_columns, ["Notes"]);

    let report = render_report(&result);
    assert!(report.starts_with("📁 File Type: .CSV\n📊 Data: 2 rows, 3 columns\n⚠️ Structure: Invalid"));
    assert!(report.contains("   • Remove 1 empty rows"));
}
