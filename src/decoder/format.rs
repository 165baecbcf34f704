//! Format information: error correction level and mask pattern.
//!
//! The 15-bit field is stored twice: wrapped around the top-left finder, and
//! split between the bottom-left and top-right finders. Both copies are read
//! MSB first and the one closer to a valid codeword wins.

use crate::decoder::bch::BchDecoder;
use crate::error::Rejection;
use crate::models::{BitMatrix, ECLevel, MaskPattern};

/// Decoded format field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Error correction level
    pub ec_level: ECLevel,
    /// Data mask
    pub mask_pattern: MaskPattern,
    /// Bits corrected in the better copy
    pub corrected_bits: u32,
}

impl FormatInfo {
    /// Read and decode the format field of a sampled grid
    pub fn extract(matrix: &BitMatrix) -> Result<Self, Rejection> {
        if matrix.width() < 21 {
            return Err(Rejection::Format);
        }
        let copies = [Self::read_primary(matrix), Self::read_secondary(matrix)];
        copies
            .iter()
            .filter_map(|&raw| BchDecoder::decode_format(raw))
            .min_by_key(|&(_, distance)| distance)
            .map(|(data, distance)| Self::from_data(data, distance))
            .ok_or(Rejection::Format)
    }

    fn from_data(data: u8, corrected_bits: u32) -> Self {
        Self {
            ec_level: ECLevel::from_bits(data >> 3),
            mask_pattern: MaskPattern::from_bits(data),
            corrected_bits,
        }
    }

    /// Copy around the top-left finder
    fn read_primary(matrix: &BitMatrix) -> u16 {
        let mut positions = Vec::with_capacity(15);
        positions.extend((0..6).map(|x| (x, 8)));
        positions.extend([(7, 8), (8, 8), (8, 7)]);
        positions.extend((0..6).rev().map(|y| (8, y)));
        read_bits(matrix, &positions)
    }

    /// Copy split between the bottom-left and top-right finders
    fn read_secondary(matrix: &BitMatrix) -> u16 {
        let size = matrix.width();
        let mut positions = Vec::with_capacity(15);
        positions.extend((size - 7..size).rev().map(|y| (8, y)));
        positions.extend((size - 8..size).map(|x| (x, 8)));
        read_bits(matrix, &positions)
    }
}

fn read_bits(matrix: &BitMatrix, positions: &[(usize, usize)]) -> u16 {
    positions
        .iter()
        .fold(0u16, |acc, &(x, y)| (acc << 1) | matrix.get(x, y) as u16)
}
