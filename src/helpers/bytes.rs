//! Little-endian conversions over byte slices, used by the binary (.xls) readers.

/// Reads consecutive 32-bit little-endian words as `usize` values.
/// A trailing partial word is ignored.
pub(crate) fn le_usize_iter(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(le_usize)
}

#[inline]
pub(crate) fn le_f64(bytes: &[u8]) -> f64 {
    f64::from_bits(le_u64(bytes))
}

#[inline]
pub(crate) fn le_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

#[inline]
pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

#[inline]
pub(crate) fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

#[inline]
pub(crate) fn le_usize(bytes: &[u8]) -> usize {
    le_u32(bytes) as usize
}
