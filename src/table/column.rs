use crate::table::Value;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// Inferred storage kind of a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// No cell holds a value
    Empty,
    Number,
    /// Dates and date-times
    Date,
    /// Any text cell, or a mix of numbers and dates
    Text,
}

impl ColumnKind {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Empty => None,
            Value::Number(_) => Some(Self::Number),
            Value::Date(_) | Value::DateTime(_) => Some(Self::Date),
            Value::Text(_) => Some(Self::Text),
        }
    }

    /// The most specific kind shared by every non-empty cell.
    pub fn detect<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut detected = Self::Empty;
        for kind in values.into_iter().filter_map(Self::of) {
            detected = match (detected, kind) {
                (Self::Empty, kind) => kind,
                (current, kind) if current == kind => current,
                _ => return Self::Text,
            };
        }
        detected
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number)
    }

    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::Text)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Number => "number",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
