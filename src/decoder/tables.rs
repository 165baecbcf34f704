//! Error-correction block tables.

use crate::decoder::function_mask::raw_data_modules;
use crate::models::{ECLevel, Version};

/// How the codewords of one symbol split into Reed-Solomon blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlockInfo {
    pub num_blocks: usize,
    pub ecc_per_block: usize,
    /// All codewords in the symbol, data and parity
    pub total_codewords: usize,
}

impl EcBlockInfo {
    /// Data codewords across all blocks
    pub fn data_codewords(&self) -> usize {
        self.total_codewords - self.num_blocks * self.ecc_per_block
    }

    /// Blocks carrying one data codeword less than the rest; they come first
    pub fn short_blocks(&self) -> usize {
        self.num_blocks - self.total_codewords % self.num_blocks
    }

    /// Data length of a short block
    pub fn short_data_len(&self) -> usize {
        self.total_codewords / self.num_blocks - self.ecc_per_block
    }

    /// Data length of block `index`
    pub fn data_len(&self, index: usize) -> usize {
        if index < self.short_blocks() {
            self.short_data_len()
        } else {
            self.short_data_len() + 1
        }
    }
}

// Tables from the QR Code specification (Model 2) via Nayuki QR Code generator.
// Index: [ec_level][version]
const ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

pub fn ec_block_info(version: Version, ec_level: ECLevel) -> EcBlockInfo {
    let idx = ec_level as usize;
    let v = version.number() as usize;
    EcBlockInfo {
        num_blocks: NUM_ERROR_CORRECTION_BLOCKS[idx][v] as usize,
        ecc_per_block: ECC_CODEWORDS_PER_BLOCK[idx][v] as usize,
        total_codewords: raw_data_modules(version) / 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_layouts() {
        let v1m = ec_block_info(Version::MIN, ECLevel::M);
        assert_eq!(v1m.total_codewords, 26);
        assert_eq!(v1m.data_codewords(), 16);
        assert_eq!(v1m.num_blocks, 1);

        // 5-Q: 2 blocks of 15 data + 2 of 16, 18 parity each
        let v5q = ec_block_info(Version::new(5).unwrap(), ECLevel::Q);
        assert_eq!(v5q.total_codewords, 134);
        assert_eq!(v5q.short_blocks(), 2);
        assert_eq!(v5q.data_len(0), 15);
        assert_eq!(v5q.data_len(3), 16);
        assert_eq!(v5q.data_codewords(), 62);

        let v40l = ec_block_info(Version::MAX, ECLevel::L);
        assert_eq!(v40l.total_codewords, 3706);
        assert_eq!(v40l.data_codewords(), 2956);
    }

    #[test]
    fn test_every_layout_is_consistent() {
        for v in 1..=40 {
            let version = Version::new(v).unwrap();
            for level in ECLevel::ALL {
                let info = ec_block_info(version, level);
                let sum: usize = (0..info.num_blocks)
                    .map(|b| info.data_len(b) + info.ecc_per_block)
                    .sum();
                assert_eq!(sum, info.total_codewords, "v{v} {level}");
                assert!(info.short_blocks() >= 1);
            }
        }
    }
}
