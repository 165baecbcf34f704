/// Kanji mode decoder (Mode 1000)
///
/// Each character is a 13-bit value compacted from a double-byte Shift JIS code.
use super::BitReader;
use crate::error::Rejection;
use encoding_rs::SHIFT_JIS;

pub struct KanjiDecoder;

impl KanjiDecoder {
    /// Shift JIS bytes of the segment and their Unicode text
    pub fn decode(
        reader: &mut BitReader<'_>,
        character_count: usize,
    ) -> Result<(Vec<u8>, String), Rejection> {
        let mut sjis = Vec::with_capacity(character_count * 2);
        for _ in 0..character_count {
            let value = reader.read_bits(13)?;
            let mut code = ((value / 0xC0) << 8) | (value % 0xC0);
            code += if code < 0x1F00 { 0x8140 } else { 0xC140 };
            let trail = code as u8;
            if trail == 0x7F || trail > 0xFC {
                return Err(Rejection::Bitstream("kanji value outside shift jis"));
            }
            sjis.push((code >> 8) as u8);
            sjis.push(trail);
        }

        // Well-formed codes without a JIS X 0208 assignment become U+FFFD
        let (text, _) = SHIFT_JIS.decode_without_bom_handling(&sjis);
        let text = text.into_owned();
        Ok((sjis, text))
    }
}
