/// Version information extraction for QR codes v7+
use crate::decoder::bch::BchDecoder;
use crate::error::Rejection;
use crate::models::{BitMatrix, Version};

/// Version info is 18 bits (6 data + 12 ECC), stored in two 6x3 blocks
pub struct VersionInfo;

impl VersionInfo {
    /// Decode the version blocks of a grid at least 45 modules wide
    pub fn extract(matrix: &BitMatrix) -> Result<Version, Rejection> {
        let size = matrix.width();
        if size < 45 {
            return Err(Rejection::Version);
        }
        let copies = [
            Self::read_bits(matrix, |i, j| (size - 11 + j, i)),
            Self::read_bits(matrix, |i, j| (i, size - 11 + j)),
        ];
        copies
            .iter()
            .filter_map(|&raw| BchDecoder::decode_version(raw))
            .min_by_key(|&(_, distance)| distance)
            .and_then(|(number, _)| Version::new(number))
            .ok_or(Rejection::Version)
    }

    /// Bit k (LSB first) lives at block row k / 3, column k % 3, via `position`
    fn read_bits(matrix: &BitMatrix, position: impl Fn(usize, usize) -> (usize, usize)) -> u32 {
        (0..18).fold(0u32, |acc, k| {
            let (x, y) = position(k / 3, k % 3);
            acc | ((matrix.get(x, y) as u32) << k)
        })
    }
}
