//! QR code data mode decoders
//!
//! This module contains decoders for the segment modes of a data stream:
//! - Numeric: digits (0-9), three per 10 bits
//! - Alphanumeric: the 45-character set, two per 11 bits
//! - Byte: 8-bit data, interpreted through the active ECI character set
//! - Kanji: 13-bit compacted Shift JIS
//! - ECI: character set designators

pub mod alphanumeric;
pub mod byte;
pub mod eci;
pub mod kanji;
pub mod numeric;

use crate::error::Rejection;
use crate::models::Version;

/// Segment mode named by a 4-bit indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Terminator,
    Numeric,
    Alphanumeric,
    StructuredAppend,
    Byte,
    Fnc1First,
    Eci,
    Kanji,
    Fnc1Second,
}

impl Mode {
    pub fn from_indicator(bits: u32) -> Option<Self> {
        match bits {
            0b0000 => Some(Mode::Terminator),
            0b0001 => Some(Mode::Numeric),
            0b0010 => Some(Mode::Alphanumeric),
            0b0011 => Some(Mode::StructuredAppend),
            0b0100 => Some(Mode::Byte),
            0b0101 => Some(Mode::Fnc1First),
            0b0111 => Some(Mode::Eci),
            0b1000 => Some(Mode::Kanji),
            0b1001 => Some(Mode::Fnc1Second),
            _ => None,
        }
    }

    /// Width of the character-count field; zero for modes without one
    pub fn count_bits(self, version: Version) -> usize {
        let band = version.band();
        match self {
            Mode::Numeric => [10, 12, 14][band],
            Mode::Alphanumeric => [9, 11, 13][band],
            Mode::Byte => [8, 16, 16][band],
            Mode::Kanji => [8, 10, 12][band],
            _ => 0,
        }
    }
}

/// MSB-first reader over corrected data codewords
pub struct BitReader<'a> {
    bytes: &'a [u8],
    idx: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, idx: 0 }
    }

    pub fn remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.idx)
    }

    pub fn position(&self) -> usize {
        self.idx
    }

    /// Up to 32 bits; a read past the end means the segment was truncated
    pub fn read_bits(&mut self, n: usize) -> Result<u32, Rejection> {
        debug_assert!(n <= 32);
        if n > self.remaining() {
            return Err(Rejection::Bitstream("segment truncated"));
        }
        let mut val = 0u32;
        for _ in 0..n {
            let bit = (self.bytes[self.idx / 8] >> (7 - self.idx % 8)) & 1;
            val = (val << 1) | bit as u32;
            self.idx += 1;
        }
        Ok(val)
    }
}
