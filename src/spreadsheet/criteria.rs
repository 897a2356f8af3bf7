use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

/// Largest upload accepted by default (16 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

/// Options controlling how a spreadsheet is decoded into a table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Worksheet to read; the first worksheet when absent.
    pub sheet_name: Option<String>,

    /// Text values read as empty cells (default: [`DEFAULT_NULLS`]).
    pub nulls: HashSet<String>,

    /// Read error cells (`#N/A`, `#DIV/0!`) as empty instead of failing.
    pub error_as_null: bool,

    /// Uploads larger than this are rejected before decoding.
    pub max_file_size: usize,
}

impl Criteria {
    pub(crate) fn is_null(&self, text: &str) -> bool {
        self.nulls.contains(text)
    }
}

/// Text read as a missing value unless configured otherwise.
pub const DEFAULT_NULLS: [&str; 14] = [
    "", "#N/A", "#NA", "N/A", "n/a", "NA", "<NA>", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None",
];

impl Default for Criteria {
    fn default() -> Self {
        Criteria {
            sheet_name: None,
            nulls: DEFAULT_NULLS.iter().map(|null| null.to_string()).collect(),
            error_as_null: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}
