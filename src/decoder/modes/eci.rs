/// Extended Channel Interpretation (Mode 0111)
///
/// A designator of one, two or three bytes selects the character set used for
/// the byte segments that follow it.
use super::BitReader;
use crate::error::Rejection;
use encoding_rs::Encoding;

pub struct EciDecoder;

impl EciDecoder {
    /// Assignment number; the leading bits of the first byte give the length
    pub fn decode(reader: &mut BitReader<'_>) -> Result<u32, Rejection> {
        let first = reader.read_bits(8)?;
        if first & 0x80 == 0 {
            Ok(first)
        } else if first & 0xC0 == 0x80 {
            Ok(((first & 0x3F) << 8) | reader.read_bits(8)?)
        } else if first & 0xE0 == 0xC0 {
            Ok(((first & 0x1F) << 16) | reader.read_bits(16)?)
        } else {
            Err(Rejection::Bitstream("invalid eci designator"))
        }
    }
}

/// Interpretation of byte-segment data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterSet {
    /// No ECI seen: UTF-8 when valid, ISO-8859-1 otherwise
    #[default]
    Implicit,
    /// ISO-8859-1, decoded code point for code point
    Latin1,
    Utf8,
    Encoded(&'static Encoding),
}

impl CharacterSet {
    /// Character set for an ECI assignment number; unknown numbers and the
    /// code page 437 designators keep the implicit handling
    pub fn from_eci(assignment: u32) -> Self {
        let encoding = match assignment {
            1 | 3 => return CharacterSet::Latin1,
            4 => encoding_rs::ISO_8859_2,
            5 => encoding_rs::ISO_8859_3,
            6 => encoding_rs::ISO_8859_4,
            7 => encoding_rs::ISO_8859_5,
            8 => encoding_rs::ISO_8859_6,
            9 => encoding_rs::ISO_8859_7,
            10 => encoding_rs::ISO_8859_8,
            11 => encoding_rs::WINDOWS_1254,
            12 => encoding_rs::ISO_8859_10,
            13 => encoding_rs::WINDOWS_874,
            15 => encoding_rs::ISO_8859_13,
            16 => encoding_rs::ISO_8859_14,
            17 => encoding_rs::ISO_8859_15,
            18 => encoding_rs::ISO_8859_16,
            20 => encoding_rs::SHIFT_JIS,
            21 => encoding_rs::WINDOWS_1250,
            22 => encoding_rs::WINDOWS_1251,
            23 | 27 | 170 => encoding_rs::WINDOWS_1252,
            24 => encoding_rs::WINDOWS_1256,
            25 => encoding_rs::UTF_16BE,
            26 => return CharacterSet::Utf8,
            28 => encoding_rs::BIG5,
            29 => encoding_rs::GB18030,
            30 => encoding_rs::EUC_KR,
            _ => return CharacterSet::Implicit,
        };
        CharacterSet::Encoded(encoding)
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            CharacterSet::Implicit => match std::str::from_utf8(bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => latin1(bytes),
            },
            CharacterSet::Latin1 => latin1(bytes),
            CharacterSet::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            CharacterSet::Encoded(encoding) => encoding
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
