//! BIFF8 record reader for the Excel 97-2003 workbook stream.
//! Records may be split across CONTINUE records; reads transparently span them.

use crate::error::TaskSheetError;
use crate::helpers::bytes::le_f64;
use crate::helpers::bytes::le_u16;
use crate::helpers::bytes::le_u32;
use crate::helpers::bytes::le_u64;
use crate::helpers::bytes::le_usize;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Fewer than {0} bytes remaining in record")]
    NoEnoughDataError(usize),
}

/// Cursor over the records of a workbook stream.
pub(crate) struct Biff8Reader {
    /// Code page from the CODEPAGE record; 1200 (UTF-16) means compressed
    /// strings are plain Latin-1
    pub(crate) encoding: &'static Encoding,
    buffer: Vec<u8>,
    /// Start of the next record header
    pointer: usize,
    /// Data ranges of the current record and its CONTINUE records
    chunks: Vec<(usize, usize)>,
    chunk: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(buffer: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: encoding_rs::UTF_16LE,
            buffer,
            pointer: 0,
            chunks: Vec::new(),
            chunk: 0,
            offset: 0,
        }
    }

    /// Advances to the next record and returns its type.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, TaskSheetError> {
        if self.pointer + 4 > self.buffer.len() {
            return Ok(None);
        }
        let kind = self.u16_at(self.pointer)?;
        self.chunks.clear();
        self.chunk = 0;
        self.offset = 0;
        self.push_chunk()?;
        while self.pointer + 4 <= self.buffer.len() && self.u16_at(self.pointer)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<(), TaskSheetError> {
        let size = self.u16_at(self.pointer + 2)? as usize;
        let lower = self.pointer + 4;
        let upper = (lower + size).min(self.buffer.len());
        self.chunks.push((lower, upper));
        self.pointer = upper;
        Ok(())
    }

    /// Moves to an absolute stream offset, as given by BOUNDSHEET8.
    pub(crate) fn goto(&mut self, pointer: usize) {
        self.pointer = pointer;
        self.chunks.clear();
    }

    /// Takes up to `length` bytes from the current chunk only.
    fn take_partial(&mut self, length: usize) -> &[u8] {
        let Some((lower, upper)) = self.chunks.get(self.chunk).copied() else {
            return &[];
        };
        let source = upper.min(lower + self.offset);
        let target = upper.min(source + length);
        if target == upper {
            self.chunk += 1;
            self.offset = 0;
        } else {
            self.offset += target - source;
        }
        &self.buffer[source..target]
    }

    fn take(&mut self, length: usize) -> Result<&[u8], TaskSheetError> {
        let (lower, upper) = self.chunks.get(self.chunk).copied().unwrap_or((0, 0));
        if lower + self.offset + length > upper {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
        Ok(self.take_partial(length))
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), TaskSheetError> {
        let mut remaining = length;
        while remaining > 0 {
            let taken = self.take_partial(remaining).len();
            if taken == 0 {
                Err(Biff8Error::NoEnoughDataError(length))?
            }
            remaining -= taken;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, TaskSheetError> {
        self.take(1).map(|data| data[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, TaskSheetError> {
        self.take(2).map(le_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, TaskSheetError> {
        self.take(4).map(le_u32)
    }

    pub(crate) fn read_usize(&mut self) -> Result<usize, TaskSheetError> {
        self.take(4).map(le_usize)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, TaskSheetError> {
        self.take(8).map(le_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, TaskSheetError> {
        self.take(8).map(le_f64)
    }

    /// Reads a u16 located `offset` bytes before the end of the record.
    pub(crate) fn u16_from_end(&self, offset: usize) -> Result<u16, TaskSheetError> {
        let mut offset = offset;
        for (lower, upper) in self.chunks.iter().rev() {
            if lower + offset <= *upper {
                return self.u16_at(upper - offset);
            }
            offset -= upper - lower;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    fn u16_at(&self, index: usize) -> Result<u16, TaskSheetError> {
        match self.buffer.get(index..index + 2) {
            Some(bytes) => Ok(le_u16(bytes)),
            None => Err(Biff8Error::NoEnoughDataError(2))?,
        }
    }

    /// Decodes an RK value: a 30-bit integer or the high bits of a double,
    /// optionally scaled down by 100.
    pub(crate) fn read_rk_number(&mut self) -> Result<f64, TaskSheetError> {
        Ok(decode_rk(self.read_u32()?))
    }

    /// ShortXLUnicodeString: 8-bit character count.
    pub(crate) fn read_short_unicode_string(&mut self) -> Result<String, TaskSheetError> {
        let chars = self.read_u8()? as usize;
        let mut string = String::new();
        self.read_characters(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeString: 16-bit character count.
    pub(crate) fn read_unicode_string(&mut self) -> Result<String, TaskSheetError> {
        let chars = self.read_u16()? as usize;
        let mut string = String::new();
        self.read_characters(chars, false, &mut string)?;
        Ok(string)
    }

    /// XLUnicodeRichExtendedString as stored in the SST. Characters may
    /// continue into the next CONTINUE record, which restarts with a fresh
    /// option byte; formatting runs and phonetic data follow the characters.
    pub(crate) fn read_rich_extended_string(&mut self) -> Result<String, TaskSheetError> {
        let mut remaining = self.read_u16()? as usize;
        let mut string = String::new();
        let (read, trailing) = self.read_characters(remaining, true, &mut string)?;
        remaining -= read.min(remaining);
        while remaining > 0 {
            let (read, _) = self.read_characters(remaining, false, &mut string)?;
            if read == 0 {
                break;
            }
            remaining -= read.min(remaining);
        }
        self.skip(trailing)?;
        Ok(string)
    }

    /// Reads at most `chars` characters from the current chunk. Returns how
    /// many were read and how many trailing bytes (runs, phonetic block)
    /// belong to the string.
    fn read_characters(&mut self, chars: usize, extended: bool, content: &mut String) -> Result<(usize, usize), TaskSheetError> {
        let flags = self.read_u8()?;
        let wide = flags & 0x01 != 0;
        let runs = if extended && flags & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let phonetic = if extended && flags & 0x04 != 0 { self.read_usize()? } else { 0 };
        let encoding = self.encoding;
        let wanted = if wide { chars * 2 } else { chars };
        let bytes = self.take_partial(wanted);
        let read = if wide { bytes.len() / 2 } else { bytes.len() };
        if wide {
            let (text, _) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
            content.push_str(&text);
        } else if encoding == encoding_rs::UTF_16LE {
            content.extend(bytes.iter().map(|byte| *byte as char));
        } else {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            content.push_str(&text);
        }
        Ok((read, 4 * runs + phonetic))
    }
}

pub(crate) fn decode_rk(raw: u32) -> f64 {
    let value = if raw & 0x02 != 0 {
        ((raw as i32) >> 2) as f64
    } else {
        f64::from_bits(((raw & 0xFFFF_FFFC) as u64) << 32)
    };
    if raw & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
