/// Alphanumeric mode decoder (Mode 0010)
use super::BitReader;
use crate::error::Rejection;

/// Alphanumeric character set: 0-9, A-Z, space, $%*+-./:
const ALPHANUMERIC_TABLE: [char; 45] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ' ', '$',
    '%', '*', '+', '-', '.', '/', ':',
];

/// Pairs = 11 bits, single = 6 bits
pub struct AlphanumericDecoder;

impl AlphanumericDecoder {
    pub fn decode(reader: &mut BitReader<'_>, character_count: usize) -> Result<String, Rejection> {
        let mut result = String::with_capacity(character_count);
        let mut chars_remaining = character_count;

        while chars_remaining >= 2 {
            let value = reader.read_bits(11)? as usize;
            if value >= 45 * 45 {
                return Err(Rejection::Bitstream("alphanumeric pair out of range"));
            }
            result.push(ALPHANUMERIC_TABLE[value / 45]);
            result.push(ALPHANUMERIC_TABLE[value % 45]);
            chars_remaining -= 2;
        }

        if chars_remaining == 1 {
            let value = reader.read_bits(6)? as usize;
            let c = ALPHANUMERIC_TABLE
                .get(value)
                .ok_or(Rejection::Bitstream("alphanumeric value out of range"))?;
            result.push(*c);
        }

        Ok(result)
    }
}
