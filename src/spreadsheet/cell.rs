use crate::error::TaskSheetError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Value;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeDelta;

/// Storage type of a worksheet cell, decided from the cell tag and its number format.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values stored as `0` / `1`
    Boolean,
    Number,
    /// Serial date/time in the 1900 date system
    NumberDateTime1900,
    NumberDate1900,
    NumberTime1900,
    /// Serial date/time in the 1904 date system
    NumberDateTime1904,
    NumberDate1904,
    NumberTime1904,
    /// ISO 8601 date/time text (`t="d"` cells)
    IsoDateTime,
    InlineString,
    /// Index into the shared string table
    SharedString,
    Error,
}

impl CellType {
    /// Maps the built-in date and time format ids to cell types.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Classifies a custom number format code by its unquoted date and time tokens.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }
}

/// Excel error codes as displayed in a cell.
pub(crate) fn to_error_value(value: u8) -> &'static str {
    match value {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#ERROR!",
    }
}

/// Raw cell as read from a worksheet.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    pub(crate) row: usize,
    pub(crate) col: usize,
    pub(crate) kind: CellType,
    pub(crate) value: String,
}

impl Cell {
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Resolves the raw text into a table value.
    pub(crate) fn to_value(&self, shared_strings: &[String]) -> Result<Value, TaskSheetError> {
        let value = match self.kind {
            CellType::Empty | CellType::Error => Value::Empty,
            CellType::Boolean => Value::Text(if self.value == "1" { "TRUE" } else { "FALSE" }.to_owned()),
            CellType::Number => Value::Number(self.to_double()?),
            CellType::NumberDate1900 => Value::Date(self.to_datetime(false)?.date()),
            CellType::NumberDate1904 => Value::Date(self.to_datetime(true)?.date()),
            CellType::NumberDateTime1900 => Value::DateTime(self.to_datetime(false)?),
            CellType::NumberDateTime1904 => Value::DateTime(self.to_datetime(true)?),
            CellType::NumberTime1900 | CellType::NumberTime1904 => Value::Text(self.to_time_string()?),
            CellType::IsoDateTime => self.to_iso_value(),
            CellType::InlineString => Value::Text(self.value.to_owned()),
            CellType::SharedString => {
                let index = self.value.parse::<usize>()?;
                let string = shared_strings
                    .get(index)
                    .ok_or_else(|| SpreadsheetError::SharedStringError(self.reference(), index))?;
                Value::Text(string.to_owned())
            }
        };
        Ok(value)
    }

    fn to_double(&self) -> Result<f64, TaskSheetError> {
        Ok(self.value.trim().parse::<f64>()?)
    }

    /// Serial number to date-time. Day 60 is the phantom 1900-02-29 of the
    /// 1900 date system, so earlier serials are shifted by one day.
    fn to_datetime(&self, is_1904: bool) -> Result<NaiveDateTime, TaskSheetError> {
        let serial = self.to_double()?;
        let days = serial.trunc() as i64;
        let offset = if is_1904 {
            1462
        } else if days < 60 {
            1
        } else {
            0
        };
        let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
        NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|epoch| epoch.and_hms_opt(0, 0, 0))
            .zip(TimeDelta::try_days(days + offset))
            .and_then(|(epoch, days)| epoch.checked_add_signed(days))
            .zip(TimeDelta::try_milliseconds(milliseconds))
            .and_then(|(date, time)| date.checked_add_signed(time))
            .ok_or_else(|| SpreadsheetError::CellValueError(self.reference(), self.value.to_owned()).into())
    }

    fn to_time_string(&self) -> Result<String, TaskSheetError> {
        let mut seconds = (self.to_double()?.fract() * 86_400f64).round() as i64;
        let hours = seconds / 3600;
        seconds %= 3600;
        let minutes = seconds / 60;
        seconds %= 60;
        Ok(format!("{hours:02}:{minutes:02}:{seconds:02}"))
    }

    fn to_iso_value(&self) -> Value {
        let text = self.value.trim();
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            if datetime.time() == chrono::NaiveTime::MIN {
                Value::Date(datetime.date())
            } else {
                Value::DateTime(datetime)
            }
        } else if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            Value::Date(date)
        } else {
            Value::Text(text.to_owned())
        }
    }
}
