//! OLE Compound File Binary (CFB) container reader.
//! Legacy Excel workbooks (.xls) keep their BIFF8 record stream inside one of
//! these containers, and encrypted OOXML packages use it as an envelope too.

use crate::error::TaskSheetError;
use crate::helpers::bytes::le_u16;
use crate::helpers::bytes::le_u64;
use crate::helpers::bytes::le_usize;
use crate::helpers::bytes::le_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use thiserror::Error;

/// Sector ids at or above this value are markers (free, end of chain, FAT, DIFAT).
const MAX_REGULAR_SECTOR: usize = 0xFFFF_FFFA;
/// Streams smaller than this live in the mini stream.
const MINI_STREAM_CUTOFF: usize = 4096;
const MINI_SECTOR_SIZE: usize = 64;
const HEADER_SIZE: usize = 512;
const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;
const ROOT_ENTRY: &str = "Root Entry";

/// Errors specific to Compound File Binary parsing
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid CFB structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector '{0}' is outside of the file")]
    SectorRangeError(usize),

    #[error("Sector chain starting at '{0}' does not terminate")]
    SectorChainError(usize),

    #[error("Empty root directory")]
    RootDirectoryError,
}

/// Parsed compound file: directory plus the allocation tables needed to follow
/// stream chains.
pub(crate) struct Cfb {
    entries: HashMap<String, Entry>,
    fat: Vec<usize>,
    sectors: Sectors,
    mini_fat: Vec<usize>,
    mini_sectors: Sectors,
}

impl Cfb {
    /// Parses a compound file held entirely in memory.
    pub(crate) fn parse(data: Vec<u8>) -> Result<Cfb, TaskSheetError> {
        if data.len() < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        let header = Header::parse(&data[..HEADER_SIZE])?;
        let sectors = Sectors { size: header.sector_size()?, data, header_offset: true };
        let fat = load_fat(&sectors, &header)?;
        let entries = load_entries(&fat, &sectors, header.first_directory_sector)?;

        let mini_fat = if header.mini_fat_sector_count > 0 {
            let bytes = read_chain(&fat, &sectors, header.first_mini_fat_sector)?;
            le_usize_iter(&bytes).collect()
        } else {
            Vec::new()
        };
        let mini_sectors = match entries.get(ROOT_ENTRY) {
            Some(root) => {
                let mut data = read_chain(&fat, &sectors, root.start)?;
                data.truncate(root.size);
                Sectors { size: MINI_SECTOR_SIZE, data, header_offset: false }
            }
            None => Sectors { size: MINI_SECTOR_SIZE, data: Vec::new(), header_offset: false },
        };

        Ok(Cfb { entries, fat, sectors, mini_fat, mini_sectors })
    }

    /// Returns true when the container holds a stream with the given name.
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Reads a whole stream, or `None` when no entry carries that name.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, TaskSheetError> {
        let Some(entry) = self.entries.get(name) else {
            return Ok(None);
        };
        let mut bytes = if entry.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_fat, &self.mini_sectors, entry.start)?
        } else {
            read_chain(&self.fat, &self.sectors, entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }
}

/// Builds the FAT from the header DIFAT slots followed by the DIFAT sector chain.
fn load_fat(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, TaskSheetError> {
    let mut difat: Vec<usize> = le_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();
    let mut next = header.first_difat_sector;
    let mut visited = 0usize;
    while next < MAX_REGULAR_SECTOR {
        if visited > header.difat_sector_count {
            Err(CfbError::SectorChainError(header.first_difat_sector))?;
        }
        difat.extend(le_usize_iter(sectors.get(next)?));
        // The last slot of a DIFAT sector points at the next DIFAT sector
        next = difat.pop().ok_or(CfbError::FileFormatError)?;
        visited += 1;
    }

    let mut fat = Vec::new();
    for sector in difat.into_iter().filter(|sector| *sector < MAX_REGULAR_SECTOR) {
        fat.extend(le_usize_iter(sectors.get(sector)?));
    }
    if fat.is_empty() {
        Err(CfbError::FileFormatError)?;
    }
    Ok(fat)
}

fn load_entries(fat: &[usize], sectors: &Sectors, start: usize) -> Result<HashMap<String, Entry>, TaskSheetError> {
    let bytes = read_chain(fat, sectors, start)?;
    let entries: HashMap<String, Entry> = bytes
        .chunks_exact(128)
        .filter_map(Entry::parse)
        .collect();
    if entries.is_empty() {
        Err(CfbError::RootDirectoryError)?
    }
    Ok(entries)
}

/// Concatenates the sectors of a chain, refusing chains longer than the table.
fn read_chain(table: &[usize], sectors: &Sectors, start: usize) -> Result<Vec<u8>, TaskSheetError> {
    let mut content = Vec::new();
    let mut index = start;
    let mut steps = 0usize;
    while index < MAX_REGULAR_SECTOR {
        if steps > table.len() {
            Err(CfbError::SectorChainError(start))?;
        }
        content.extend_from_slice(sectors.get(index)?);
        index = *table.get(index).ok_or(CfbError::SectorRangeError(index))?;
        steps += 1;
    }
    Ok(content)
}

/// Fixed-size sectors over a byte buffer. Regular sectors are numbered after
/// the header, mini sectors from the start of the mini stream.
struct Sectors {
    size: usize,
    data: Vec<u8>,
    header_offset: bool,
}

impl Sectors {
    fn get(&self, index: usize) -> Result<&[u8], TaskSheetError> {
        let slot = if self.header_offset { index + 1 } else { index };
        let lower = slot * self.size;
        let upper = self.data.len().min(lower + self.size);
        if lower >= upper {
            Err(CfbError::SectorRangeError(index))?
        }
        Ok(&self.data[lower..upper])
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    first_directory_sector: usize,
    first_mini_fat_sector: usize,
    mini_fat_sector_count: usize,
    first_difat_sector: usize,
    difat_sector_count: usize,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self, TaskSheetError> {
        if le_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: le_u16(&data[26..28]),
            sector_shift: le_u16(&data[30..32]),
            first_directory_sector: le_usize(&data[48..52]),
            first_mini_fat_sector: le_usize(&data[60..64]),
            mini_fat_sector_count: le_usize(&data[64..68]),
            first_difat_sector: le_usize(&data[68..72]),
            difat_sector_count: le_usize(&data[72..76]),
        })
    }

    fn sector_size(&self) -> Result<usize, TaskSheetError> {
        match (self.major_version, self.sector_shift) {
            (3, 9) => Ok(512),
            // Version 4 pads the header up to a full 4096 byte sector
            (4, 12) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift))?,
        }
    }
}

/// Directory entry: where a stream starts and how long it is.
struct Entry {
    start: usize,
    size: usize,
}

impl Entry {
    fn parse(bytes: &[u8]) -> Option<(String, Entry)> {
        let length = (le_u16(&bytes[64..66]) as usize).min(64);
        if length == 0 {
            return None;
        }
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = name.split('\0').next().unwrap_or_default().to_owned();
        let start = le_usize(&bytes[116..120]);
        let size = le_u64(&bytes[120..128]) as usize;
        Some((name, Entry { start, size }))
    }
}
