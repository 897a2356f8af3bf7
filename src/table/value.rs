use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;

/// A single cell of a task table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<f64> for Value {
    fn from(number: f64) -> Self {
        Value::Number(number)
    }
}

impl From<NaiveDate> for Value {
    fn from(date: NaiveDate) -> Self {
        Value::Date(date)
    }
}

impl Display for Value {
    /// Whole numbers print without a fractional part, dates as `YYYY-MM-DD`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => write!(f, "{}", *number as i64),
            Value::Number(number) => write!(f, "{number}"),
            Value::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_values() {
        assert_eq!(Value::Empty.to_string(), "");
        assert_eq!(Value::Number(75.0).to_string(), "75");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-01-05");
        let datetime = date.and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(Value::DateTime(datetime).to_string(), "2024-01-05 08:30:00");
    }

    #[test]
    fn blank_values() {
        assert!(Value::Empty.is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(!Value::from("x").is_blank());
        assert!(!Value::Number(0.0).is_blank());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&Value::Number(0.5)).unwrap();
        assert_eq!(json, r#"{"type":"number","value":0.5}"#);
        let json = serde_json::to_string(&Value::Empty).unwrap();
        assert_eq!(json, r#"{"type":"empty"}"#);
    }
}
