//! Data stream parsing: corrected data codewords to segments and text.

use crate::decoder::modes::alphanumeric::AlphanumericDecoder;
use crate::decoder::modes::byte::ByteDecoder;
use crate::decoder::modes::eci::{CharacterSet, EciDecoder};
use crate::decoder::modes::kanji::KanjiDecoder;
use crate::decoder::modes::numeric::NumericDecoder;
use crate::decoder::modes::{BitReader, Mode};
use crate::error::Rejection;
use crate::models::Version;
use log::trace;

/// One decoded segment; adjacent byte segments under one character set are joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub mode: Mode,
    pub text: String,
    /// Bytes as carried in the symbol (ASCII digits for numeric and
    /// alphanumeric, raw bytes for byte mode, Shift JIS for kanji)
    pub bytes: Vec<u8>,
}

/// Structured append header: this symbol's place in a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuredAppend {
    /// Zero-based position
    pub index: u8,
    /// Number of symbols in the sequence
    pub total: u8,
    /// XOR of every byte of the complete message
    pub parity: u8,
}

/// FNC1 marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fnc1 {
    /// First position: GS1 formatted data
    Gs1,
    /// Second position with its application indicator
    Industry(u8),
}

/// Everything a data stream carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub segments: Vec<Segment>,
    /// Concatenated segment bytes
    pub bytes: Vec<u8>,
    /// Last ECI designator seen
    pub eci: Option<u32>,
    pub structured_append: Option<StructuredAppend>,
    pub fnc1: Option<Fnc1>,
}

impl Payload {
    /// Segment texts joined in order
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    fn push(&mut self, mode: Mode, text: String, bytes: Vec<u8>) {
        self.bytes.extend_from_slice(&bytes);
        self.segments.push(Segment { mode, text, bytes });
    }
}

/// Parses mode segments until the terminator or the end of the stream
pub struct DataStreamDecoder;

impl DataStreamDecoder {
    pub fn decode(data: &[u8], version: Version) -> Result<Payload, Rejection> {
        let mut reader = BitReader::new(data);
        let mut payload = Payload::default();
        let mut charset = CharacterSet::default();
        let mut byte_run = false;

        while reader.remaining() >= 4 {
            let mode = Mode::from_indicator(reader.read_bits(4)?)
                .ok_or(Rejection::Bitstream("unknown mode indicator"))?;
            let count = match mode.count_bits(version) {
                0 => 0,
                bits => reader.read_bits(bits)? as usize,
            };
            trace!("segment {mode:?} count={count} at bit {}", reader.position());

            match mode {
                Mode::Terminator => break,
                Mode::Numeric => {
                    let text = NumericDecoder::decode(&mut reader, count)?;
                    let bytes = text.clone().into_bytes();
                    payload.push(mode, text, bytes);
                }
                Mode::Alphanumeric => {
                    let text = AlphanumericDecoder::decode(&mut reader, count)?;
                    let bytes = text.clone().into_bytes();
                    payload.push(mode, text, bytes);
                }
                Mode::Byte => {
                    let bytes = ByteDecoder::decode(&mut reader, count)?;
                    match payload.segments.last_mut().filter(|_| byte_run) {
                        // A multi-byte character may straddle the segment boundary
                        Some(last) => {
                            last.bytes.extend_from_slice(&bytes);
                            last.text = ByteDecoder::text(&last.bytes, charset);
                            payload.bytes.extend_from_slice(&bytes);
                        }
                        None => {
                            let text = ByteDecoder::text(&bytes, charset);
                            payload.push(mode, text, bytes);
                        }
                    }
                }
                Mode::Kanji => {
                    let (bytes, text) = KanjiDecoder::decode(&mut reader, count)?;
                    payload.push(mode, text, bytes);
                }
                Mode::Eci => {
                    let assignment = EciDecoder::decode(&mut reader)?;
                    charset = CharacterSet::from_eci(assignment);
                    payload.eci = Some(assignment);
                }
                Mode::StructuredAppend => {
                    let header = reader.read_bits(16)?;
                    payload.structured_append = Some(StructuredAppend {
                        index: (header >> 12) as u8,
                        total: ((header >> 8) & 0x0F) as u8 + 1,
                        parity: header as u8,
                    });
                }
                Mode::Fnc1First => payload.fnc1 = Some(Fnc1::Gs1),
                Mode::Fnc1Second => {
                    payload.fnc1 = Some(Fnc1::Industry(reader.read_bits(8)? as u8));
                }
            }
            byte_run = mode == Mode::Byte;
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MSB-first bit packer; the tail is padded with zero bits
    #[derive(Default)]
    struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        fn push(&mut self, value: u32, count: usize) -> &mut Self {
            for i in (0..count).rev() {
                self.bits.push((value >> i) & 1 != 0);
            }
            self
        }

        fn bytes(&self) -> Vec<u8> {
            self.bits
                .chunks(8)
                .map(|c| {
                    c.iter()
                        .enumerate()
                        .fold(0u8, |acc, (i, &b)| acc | ((b as u8) << (7 - i)))
                })
                .collect()
        }
    }

    #[test]
    fn test_byte_mode() {
        let mut w = BitWriter::default();
        w.push(0b0100, 4).push(2, 8).push(b'H' as u32, 8).push(b'I' as u32, 8).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.text(), "HI");
        assert_eq!(payload.bytes, b"HI");
        assert_eq!(payload.segments.len(), 1);
        assert_eq!(payload.segments[0].mode, Mode::Byte);
    }

    #[test]
    fn test_mixed_modes() {
        let mut w = BitWriter::default();
        // "AB" alphanumeric, "123" numeric
        w.push(0b0010, 4).push(2, 9).push(10 * 45 + 11, 11);
        w.push(0b0001, 4).push(3, 10).push(123, 10);
        w.push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.text(), "AB123");
        assert_eq!(payload.segments.len(), 2);
    }

    #[test]
    fn test_count_width_follows_version() {
        let mut w = BitWriter::default();
        w.push(0b0100, 4).push(1, 16).push(b'x' as u32, 8).push(0, 4);
        let v10 = Version::new(10).unwrap();
        assert_eq!(DataStreamDecoder::decode(&w.bytes(), v10).unwrap().text(), "x");
    }

    #[test]
    fn test_stops_without_terminator_when_bits_run_out() {
        let mut w = BitWriter::default();
        // 4 + 10 + 7 = 21 bits, leaving 3 padding bits
        w.push(0b0001, 4).push(2, 10).push(42, 7);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.text(), "42");
    }

    #[test]
    fn test_empty_stream() {
        let payload = DataStreamDecoder::decode(&[0x00, 0xEC, 0x11], Version::MIN).unwrap();
        assert!(payload.segments.is_empty());
        assert_eq!(payload.text(), "");
    }

    #[test]
    fn test_eci_selects_character_set() {
        let mut w = BitWriter::default();
        w.push(0b0111, 4).push(3, 8);
        w.push(0b0100, 4).push(1, 8).push(0xE9, 8).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.eci, Some(3));
        assert_eq!(payload.text(), "é");
        assert_eq!(payload.bytes, vec![0xE9]);
    }

    #[test]
    fn test_structured_append_and_fnc1() {
        let mut w = BitWriter::default();
        w.push(0b0011, 4).push(1, 4).push(3, 4).push(0x5A, 8);
        w.push(0b1001, 4).push(37, 8);
        w.push(0b0001, 4).push(1, 10).push(7, 4).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(
            payload.structured_append,
            Some(StructuredAppend {
                index: 1,
                total: 4,
                parity: 0x5A
            })
        );
        assert_eq!(payload.fnc1, Some(Fnc1::Industry(37)));
        assert_eq!(payload.text(), "7");
    }

    #[test]
    fn test_kanji_segment() {
        let mut w = BitWriter::default();
        w.push(0b1000, 4).push(1, 8).push(0x0D9F, 13).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.text(), "点");
        assert_eq!(payload.bytes, vec![0x93, 0x5F]);
    }

    #[test]
    fn test_character_split_across_byte_segments() {
        // U+00E9 as UTF-8 (C3 A9), one byte per segment
        let mut w = BitWriter::default();
        w.push(0b0100, 4).push(2, 8).push(b'c' as u32, 8).push(0xC3, 8);
        w.push(0b0100, 4).push(1, 8).push(0xA9, 8).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.text(), "cé");
        assert_eq!(payload.bytes, vec![b'c', 0xC3, 0xA9]);
        assert_eq!(payload.segments.len(), 1);
    }

    #[test]
    fn test_eci_splits_byte_runs() {
        let mut w = BitWriter::default();
        w.push(0b0100, 4).push(1, 8).push(0xC3, 8);
        w.push(0b0111, 4).push(3, 8);
        w.push(0b0100, 4).push(1, 8).push(0xA9, 8).push(0, 4);
        let payload = DataStreamDecoder::decode(&w.bytes(), Version::MIN).unwrap();
        assert_eq!(payload.segments.len(), 2);
        assert_eq!(payload.text(), "Ã©");
    }

    #[test]
    fn test_malformed_streams_reject() {
        // Reserved indicator 0110
        let mut w = BitWriter::default();
        w.push(0b0110, 4).push(0, 12);
        assert!(DataStreamDecoder::decode(&w.bytes(), Version::MIN).is_err());

        // Byte count longer than the stream
        let mut w = BitWriter::default();
        w.push(0b0100, 4).push(200, 8).push(0x41, 8);
        assert!(DataStreamDecoder::decode(&w.bytes(), Version::MIN).is_err());

        // Numeric group 999 is fine, 1000 is not
        let mut w = BitWriter::default();
        w.push(0b0001, 4).push(3, 10).push(1000, 10).push(0, 4);
        assert!(DataStreamDecoder::decode(&w.bytes(), Version::MIN).is_err());
    }
}
