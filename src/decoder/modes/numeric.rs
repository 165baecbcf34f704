/// Numeric mode decoder (Mode 0001)
/// Groups of 3 digits = 10 bits, 2 digits = 7 bits, 1 digit = 4 bits
use super::BitReader;
use crate::error::Rejection;

pub struct NumericDecoder;

impl NumericDecoder {
    /// Decode `character_count` digits; a group value out of range rejects the segment
    pub fn decode(reader: &mut BitReader<'_>, character_count: usize) -> Result<String, Rejection> {
        let mut result = String::with_capacity(character_count);
        let mut chars_remaining = character_count;

        while chars_remaining > 0 {
            let group_size = chars_remaining.min(3);
            let (bits_needed, limit) = match group_size {
                3 => (10, 1000),
                2 => (7, 100),
                _ => (4, 10),
            };

            let value = reader.read_bits(bits_needed)?;
            if value >= limit {
                return Err(Rejection::Bitstream("numeric group out of range"));
            }

            result.push_str(&format!("{value:0width$}", width = group_size));
            chars_remaining -= group_size;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_decode() {
        // 012 -> 0000001100, 345 -> 0101011001
        let bytes = [0b0000_0011, 0b0001_0101, 0b1001_0000];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(NumericDecoder::decode(&mut reader, 6).unwrap(), "012345");
        assert_eq!(reader.position(), 20);
    }

    #[test]
    fn test_numeric_decode_partial_groups() {
        // 012 -> 0000001100, 34 -> 0100010, 5 -> 0101
        let bytes = [0b0000_0011, 0b0001_0001, 0b0010_1000];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(NumericDecoder::decode(&mut reader, 5).unwrap(), "01234");
        assert_eq!(reader.position(), 17);
    }

    #[test]
    fn test_numeric_rejects_out_of_range_group() {
        // 1017 in 10 bits
        let bytes = [0b1111_1110, 0b0100_0000];
        let mut reader = BitReader::new(&bytes);
        assert!(NumericDecoder::decode(&mut reader, 3).is_err());
    }

    #[test]
    fn test_numeric_truncated() {
        let mut reader = BitReader::new(&[0]);
        assert!(NumericDecoder::decode(&mut reader, 3).is_err());
    }
}
