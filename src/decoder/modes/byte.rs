/// Byte mode decoder (Mode 0100) for 8-bit data
use super::BitReader;
use super::eci::CharacterSet;
use crate::error::Rejection;

pub struct ByteDecoder;

impl ByteDecoder {
    /// Raw bytes of the segment
    pub fn decode(
        reader: &mut BitReader<'_>,
        character_count: usize,
    ) -> Result<Vec<u8>, Rejection> {
        if character_count * 8 > reader.remaining() {
            return Err(Rejection::Bitstream("byte segment truncated"));
        }
        (0..character_count)
            .map(|_| reader.read_bits(8).map(|b| b as u8))
            .collect()
    }

    /// Text of the segment under the active character set
    pub fn text(bytes: &[u8], charset: CharacterSet) -> String {
        charset.decode(bytes)
    }
}
