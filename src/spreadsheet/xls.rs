use crate::error::ResultOptionChain;
use crate::error::TaskSheetError;
use crate::helpers::biff8::Biff8Reader;
use crate::helpers::cfb::Cfb;
use crate::match_biff8_record;
use crate::spreadsheet::cell::to_error_value;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel::load_number_formats;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use either::Either;
use std::collections::HashMap;
use thiserror::Error;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const DATE1904: u16 = 34;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const XF: u16 = 224;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const RK: u16 = 638;
const FORMAT: u16 = 1054;
const BOF: u16 = 2057;

#[derive(Error, Debug)]
pub enum XlsError {
    #[error("Invalid code page '{0}'")]
    CodePageError(u16),

    #[error("Invalid formula value '{0:#018x}'")]
    FormulaValueError(u64),
}

/// Excel 97-2003 workbook: the globals substream is parsed on open,
/// worksheets on demand.
pub(crate) struct XlsSpreadsheet {
    reader: Biff8Reader,
    shared_strings: Vec<String>,
    number_formats: Vec<CellType>,
    /// Worksheets with the stream offset of their BOF record
    sheets: Vec<(String, usize)>,
}

impl XlsSpreadsheet {
    pub(crate) fn open(bytes: Vec<u8>) -> Result<XlsSpreadsheet, TaskSheetError> {
        let cfb = Cfb::parse(bytes)?;
        let mut reader = cfb.read("Workbook")
            .ok_none_else(|| cfb.read("Book"))?
            .map(Biff8Reader::new)
            .ok_or(SpreadsheetError::SpreadsheetEmptyError)?;
        let mut is_1904 = false;
        let mut shared_strings = Vec::new();
        let mut custom_formats: HashMap<String, CellType> = HashMap::new();
        let mut format_indexes: Vec<String> = Vec::new();
        let mut sheets: Vec<(String, usize)> = Vec::new();
        match_biff8_record!(reader => {
            EOF => break,
            FILE_PASS => Err(SpreadsheetError::SpreadsheetPasswordProtectedError)?,
            DATE1904 if reader.read_u16()? == 1 => is_1904 = true,
            CODE_PAGE => {
                let code_page = reader.read_u16()?;
                reader.encoding = codepage::to_encoding(code_page).ok_or(XlsError::CodePageError(code_page))?;
            }
            FORMAT => {
                let id = reader.read_u16()?;
                let format = reader.read_unicode_string()?;
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
            XF => {
                reader.skip(2)?;
                let id = reader.read_u16()?;
                format_indexes.push(id.to_string());
            }
            SST => shared_strings = load_shared_strings(&mut reader)?,
            BOUND_SHEET8 => {
                let pointer = reader.read_usize()?;
                reader.skip(1)?;
                let kind = reader.read_u8()?;
                let sheet_name = reader.read_short_unicode_string()?;
                // Chart and macro sheets carry no cell grid
                if kind == 0 {
                    sheets.push((sheet_name, pointer));
                }
            }
        });
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError)?
        }

        let number_formats = load_number_formats(format_indexes, custom_formats, is_1904);
        Ok(XlsSpreadsheet { reader, shared_strings, number_formats, sheets })
    }

    /// Reads the selected worksheet into a table.
    pub(crate) fn read_table(&mut self, criteria: &Criteria) -> Result<Table, TaskSheetError> {
        let selected = match &criteria.sheet_name {
            Some(name) => self.sheets.iter().find(|(sheet_name, _)| sheet_name == name),
            None => self.sheets.first(),
        };
        let (sheet_name, pointer) = selected
            .cloned()
            .ok_or_else(|| SpreadsheetError::SheetNotFound(criteria.sheet_name.to_owned().unwrap_or_default()))?;
        let sheet = self.read_sheet(&sheet_name, pointer, criteria)?;
        sheet.into_table(&self.shared_strings, criteria)
    }

    fn read_sheet(&mut self, sheet_name: &str, pointer: usize, criteria: &Criteria) -> Result<Sheet, TaskSheetError> {
        let mut sheet = Sheet::new(sheet_name);
        self.reader.goto(pointer);
        // Skip the BOF record opening the substream
        self.reader.next()?;
        while let Some(tag) = self.reader.next()? {
            match tag {
                BOF | EOF => break,
                MUL_RK => {
                    let row = self.reader.read_u16()? as usize;
                    let col_lower_bound = self.reader.read_u16()? as usize;
                    let col_upper_bound = self.reader.u16_from_end(2)? as usize;
                    for col in col_lower_bound..=col_upper_bound {
                        let index = self.reader.read_u16()? as usize;
                        let value = self.reader.read_rk_number()?;
                        let kind = self.number_format(index);
                        sheet.push(Cell { row, col, kind, value: value.to_string() });
                    }
                }
                BOOL_ERR | NUMBER | RK | LABEL_SST | LABEL | FORMULA => {
                    let row = self.reader.read_u16()? as usize;
                    let col = self.reader.read_u16()? as usize;
                    let (either, value) = match tag {
                        BOOL_ERR => read_bool_or_error_cell(&mut self.reader)?,
                        NUMBER => read_number_cell(&mut self.reader)?,
                        RK => read_rk_cell(&mut self.reader)?,
                        LABEL_SST => read_label_sst_cell(&mut self.reader)?,
                        LABEL => read_label_cell(&mut self.reader)?,
                        _ => read_formula_cell(&mut self.reader)?,
                    };
                    let kind = match either {
                        Either::Left(kind) => kind,
                        Either::Right(index) => self.number_format(index),
                    };
                    if kind != CellType::Error {
                        if !value.is_empty() {
                            sheet.push(Cell { row, col, kind, value });
                        }
                    } else if !criteria.error_as_null {
                        Err(SpreadsheetError::CellValueError(index_to_reference(row, col), value))?
                    }
                }
                _ => (),
            }
        }
        Ok(sheet)
    }

    fn number_format(&self, index: usize) -> CellType {
        self.number_formats.get(index).copied().unwrap_or(CellType::Number)
    }
}

fn load_shared_strings(reader: &mut Biff8Reader) -> Result<Vec<String>, TaskSheetError> {
    reader.skip(4)?;
    let count = reader.read_usize()?;
    let mut shared_strings: Vec<String> = Vec::with_capacity(count.min(65_536));
    for _ in 0..count {
        shared_strings.push(reader.read_rich_extended_string()?);
    }
    Ok(shared_strings)
}

/// Cell payloads decode to either a fixed type or an XF index whose number
/// format decides the type.
type CellPayload = (Either<CellType, usize>, String);

fn read_bool_or_error_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    reader.skip(2)?;
    let value = reader.read_u8()?;
    let flag = reader.read_u8()?;
    if flag == 0 {
        Ok((Either::Left(CellType::Boolean), value.to_string()))
    } else {
        Ok((Either::Left(CellType::Error), to_error_value(value).to_owned()))
    }
}

fn read_number_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_f64()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_rk_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    let index = reader.read_u16()? as usize;
    let value = reader.read_rk_number()?;
    Ok((Either::Right(index), value.to_string()))
}

fn read_label_sst_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    reader.skip(2)?;
    let value = reader.read_usize()?;
    Ok((Either::Left(CellType::SharedString), value.to_string()))
}

fn read_label_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    reader.skip(2)?;
    let value = reader.read_unicode_string()?;
    Ok((Either::Left(CellType::InlineString), value))
}

/// Cached formula result: a number, or a tagged string, boolean, error or
/// empty string. String results follow in a STRING record.
fn read_formula_cell(reader: &mut Biff8Reader) -> Result<CellPayload, TaskSheetError> {
    let index = reader.read_u16()? as usize;
    let formula = reader.read_u64()?;
    let is_number = (formula & 0xFFFF_0000_0000_0000) != 0xFFFF_0000_0000_0000;
    let flag = formula & 0xFF;
    if is_number {
        Ok((Either::Right(index), f64::from_bits(formula).to_string()))
    } else if flag == 0 {
        match reader.next()? {
            Some(STRING) => Ok((Either::Left(CellType::InlineString), reader.read_unicode_string()?)),
            _ => Err(XlsError::FormulaValueError(formula))?,
        }
    } else if flag == 1 {
        let value = if (formula & 0xFF_0000) > 0 { "1" } else { "0" };
        Ok((Either::Left(CellType::Boolean), value.to_owned()))
    } else if flag == 2 {
        let code = ((formula >> 16) & 0xFF) as u8;
        Ok((Either::Left(CellType::Error), to_error_value(code).to_owned()))
    } else if flag == 3 {
        Ok((Either::Left(CellType::InlineString), String::new()))
    } else {
        Err(XlsError::FormulaValueError(formula))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: u16, data: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&kind.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u16).to_le_bytes());
        bytes.extend_from_slice(data);
        bytes
    }

    fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
        [row.to_le_bytes(), col.to_le_bytes(), xf.to_le_bytes()].concat()
    }

    fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
        let mut data = cell_header(row, col, 0);
        data.extend_from_slice(&(text.len() as u16).to_le_bytes());
        data.push(0);
        data.extend_from_slice(text.as_bytes());
        record(LABEL, &data)
    }

    fn number(row: u16, col: u16, value: f64) -> Vec<u8> {
        let mut data = cell_header(row, col, 0);
        data.extend_from_slice(&value.to_le_bytes());
        record(NUMBER, &data)
    }

    fn reader_for(records: Vec<Vec<u8>>) -> Biff8Reader {
        Biff8Reader::new(records.concat())
    }

    #[test]
    fn reads_cell_records_into_a_sheet() {
        let mut spreadsheet = XlsSpreadsheet {
            reader: reader_for(vec![
                record(BOF, &[0; 16]),
                label(0, 0, "Task Name"),
                label(0, 1, "Progress"),
                label(1, 0, "Design"),
                number(1, 1, 40.0),
                record(EOF, &[]),
            ]),
            shared_strings: Vec::new(),
            number_formats: vec![CellType::Number],
            sheets: vec![("Tasks".to_owned(), 0)],
        };
        let table = spreadsheet.read_table(&Criteria::default()).unwrap();

        assert_eq!(table.columns(), ["Task Name", "Progress"]);
        assert_eq!(table.get(0, "Task Name").map(ToString::to_string).as_deref(), Some("Design"));
        assert_eq!(table.get(0, "Progress").and_then(|value| value.as_number()), Some(40.0));
    }

    #[test]
    fn reads_formula_results() {
        let mut data = cell_header(0, 0, 0);
        data.extend_from_slice(&0.25f64.to_le_bytes());
        let mut reader = reader_for(vec![record(FORMULA, &data)]);
        reader.next().unwrap();
        reader.skip(4).unwrap();
        let (either, value) = read_formula_cell(&mut reader).unwrap();
        assert!(matches!(either, Either::Right(0)));
        assert_eq!(value, "0.25");

        // Boolean TRUE result
        let mut data = cell_header(0, 0, 0);
        data.extend_from_slice(&0xFFFF_0000_0001_0001u64.to_le_bytes());
        let mut reader = reader_for(vec![record(FORMULA, &data)]);
        reader.next().unwrap();
        reader.skip(4).unwrap();
        let (either, value) = read_formula_cell(&mut reader).unwrap();
        assert!(matches!(either, Either::Left(CellType::Boolean)));
        assert_eq!(value, "1");
    }

    #[test]
    fn error_cells_respect_criteria() {
        let mut data = cell_header(1, 0, 0);
        data.extend_from_slice(&[0x2A, 0x01]);
        let records = vec![
            record(BOF, &[0; 16]),
            label(0, 0, "Progress"),
            record(BOOL_ERR, &data),
            record(EOF, &[]),
        ];
        let mut spreadsheet = XlsSpreadsheet {
            reader: reader_for(records.clone()),
            shared_strings: Vec::new(),
            number_formats: Vec::new(),
            sheets: vec![("Tasks".to_owned(), 0)],
        };
        let criteria = Criteria { error_as_null: false, ..Criteria::default() };
        let error = spreadsheet.read_table(&criteria).unwrap_err();
        assert_eq!(error.to_string(), "Invalid cell value '#N/A' at A2");

        spreadsheet.reader = reader_for(records);
        let table = spreadsheet.read_table(&Criteria::default()).unwrap();
        assert_eq!(table.columns(), ["Progress"]);
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_non_compound_files() {
        assert!(XlsSpreadsheet::open(vec![0u8; 64]).is_err());
    }
}
