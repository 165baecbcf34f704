//! BCH codes protecting the format (15,5) and version (18,6) fields.
//!
//! Both codes are small enough to decode by exhaustive nearest-codeword search:
//! 32 format codewords at minimum distance 7 and 34 version codewords at minimum
//! distance 8, so up to 3 flipped bits are always corrected unambiguously.

/// Generator of the (15,5) format code
const FORMAT_GENERATOR: u32 = 0x537;
/// XOR mask applied to format codewords so none is all zero
const FORMAT_MASK: u32 = 0x5412;
/// Generator of the (18,6) version code
const VERSION_GENERATOR: u32 = 0x1F25;
/// Bit errors corrected in either field
pub const MAX_CORRECTABLE: u32 = 3;

/// Remainder of `data << degree` divided by `generator` over GF(2)
const fn bch_remainder(data: u32, generator: u32, degree: u32) -> u32 {
    let mut value = data << degree;
    let mut bit = 31;
    while bit >= degree {
        if value & (1 << bit) != 0 {
            value ^= generator << (bit - degree);
        }
        bit -= 1;
    }
    value
}

const fn build_format_codewords() -> [u32; 32] {
    let mut table = [0u32; 32];
    let mut data = 0;
    while data < 32 {
        table[data as usize] =
            ((data << 10) | bch_remainder(data, FORMAT_GENERATOR, 10)) ^ FORMAT_MASK;
        data += 1;
    }
    table
}

const fn build_version_codewords() -> [u32; 34] {
    let mut table = [0u32; 34];
    let mut i = 0;
    while i < 34 {
        let version = i as u32 + 7;
        table[i] = (version << 12) | bch_remainder(version, VERSION_GENERATOR, 12);
        i += 1;
    }
    table
}

/// Masked format codewords indexed by their 5 data bits
static FORMAT_CODEWORDS: [u32; 32] = build_format_codewords();
/// Version codewords for versions 7..=40
static VERSION_CODEWORDS: [u32; 34] = build_version_codewords();

/// Nearest-codeword decoder for the format and version fields
pub struct BchDecoder;

impl BchDecoder {
    /// Masked 15-bit codeword for 5 data bits (EC indicator << 3 | mask)
    pub fn format_codeword(data: u8) -> u16 {
        FORMAT_CODEWORDS[(data & 0x1F) as usize] as u16
    }

    /// 18-bit codeword for a version 7-40
    pub fn version_codeword(version: u8) -> Option<u32> {
        (7..=40)
            .contains(&version)
            .then(|| VERSION_CODEWORDS[(version - 7) as usize])
    }

    /// Decode a raw 15-bit format read: (data bits, bit errors corrected)
    pub fn decode_format(raw: u16) -> Option<(u8, u32)> {
        nearest(&FORMAT_CODEWORDS, raw as u32).map(|(i, d)| (i as u8, d))
    }

    /// Decode a raw 18-bit version read: (version, bit errors corrected)
    pub fn decode_version(raw: u32) -> Option<(u8, u32)> {
        nearest(&VERSION_CODEWORDS, raw).map(|(i, d)| (i as u8 + 7, d))
    }
}

fn nearest(codewords: &[u32], raw: u32) -> Option<(usize, u32)> {
    codewords
        .iter()
        .enumerate()
        .map(|(i, &c)| (i, (c ^ raw).count_ones()))
        .min_by_key(|&(_, distance)| distance)
        .filter(|&(_, distance)| distance <= MAX_CORRECTABLE)
}
