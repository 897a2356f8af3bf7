use crate::analyzer::AnalysisResult;
use crate::error::TaskSheetError;
use std::fmt::Display;

/// Human-readable report; suggestions keep the order they were raised in.
pub fn render_report(result: &AnalysisResult) -> String {
    let mut lines = Vec::<String>::new();
    lines.push(format!("📁 File Type: {}", result.file_format.extension().to_uppercase()));
    lines.push(format!("📊 Data: {} rows, {} columns", result.rows, result.column_count()));

    if result.valid {
        lines.push("✅ Structure: Valid - All required columns present".to_owned());
    } else {
        lines.push("⚠️ Structure: Invalid".to_owned());
        if !result.missing_columns.is_empty() {
            lines.push(format!("   Missing: {}", result.missing_columns.join(", ")));
        }
    }

    if !result.extra_columns.is_empty() {
        lines.push(format!("ℹ️ Extra columns: {}", result.extra_columns.join(", ")));
    }

    if !result.suggestions.is_empty() {
        lines.push("\n💡 Suggestions:".to_owned());
        for suggestion in &result.suggestions {
            lines.push(format!("   • {suggestion}"));
        }
    }

    lines.push("\n🔧 Recommended Actions:".to_owned());
    if result.valid {
        lines.push("   • File is ready to use".to_owned());
        lines.push("   • Upload directly to dashboard".to_owned());
    } else {
        lines.push("   • Fix missing columns before upload".to_owned());
        lines.push("   • Use template file as reference".to_owned());
    }

    lines.join("\n")
}

/// One-line rendering of a failed analysis.
pub fn render_error(error: &TaskSheetError) -> String {
    format!("❌ Error: {error}")
}

impl Display for AnalysisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&render_report(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::FileFormat;
    use crate::table::ColumnKind;

    fn result(valid: bool) -> AnalysisResult {
        AnalysisResult {
            file_format: FileFormat::Csv,
            rows: 3,
            columns: vec!["Task Name".into(), "Notes".into()],
            column_kinds: vec![ColumnKind::Text, ColumnKind::Empty],
            missing_columns: if valid { vec![] } else { vec!["Progress".into()] },
            extra_columns: vec!["Notes".into()],
            valid,
            empty_rows: 1,
            suggestions: vec!["Remove 1 empty rows".into()],
        }
    }

    #[test]
    fn renders_invalid_report() {
        let expected = [
            "📁 File Type: .CSV",
            "📊 Data: 3 rows, 2 columns",
            "⚠️ Structure: Invalid",
            "   Missing: Progress",
            "ℹ️ Extra columns: Notes",
            "",
            "💡 Suggestions:",
            "   • Remove 1 empty rows",
            "",
            "🔧 Recommended Actions:",
            "   • Fix missing columns before upload",
            "   • Use template file as reference",
        ]
        .join("\n");
        assert_eq!(render_report(&result(false)), expected);
    }

    #[test]
    fn renders_valid_report() {
        let report = result(true).to_string();
        assert!(report.contains("✅ Structure: Valid - All required columns present"));
        assert!(!report.contains("Missing:"));
        assert!(report.ends_with("   • File is ready to use\n   • Upload directly to dashboard"));
    }

    #[test]
    fn renders_errors() {
        let error = TaskSheetError::UnsupportedFormat(".txt".to_owned());
        assert_eq!(render_error(&error), "❌ Error: Unsupported file type: .txt");
    }
}
