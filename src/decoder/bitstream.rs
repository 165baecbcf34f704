/// Codeword extraction from an unmasked module grid
use crate::decoder::function_mask::FunctionMask;
use crate::models::BitMatrix;

/// Reads data modules in placement order and packs them into codewords
pub struct BitstreamExtractor;

impl BitstreamExtractor {
    /// Data bits in placement order.
    ///
    /// Columns are visited in pairs from the right edge, right column first,
    /// alternating upward and downward; column 6 (vertical timing) is skipped.
    pub fn extract(matrix: &BitMatrix, func: &FunctionMask) -> Vec<bool> {
        let size = func.size();
        let mut bits = Vec::with_capacity(func.data_modules_count());
        let mut upward = true;
        let mut right = size as isize - 1;

        while right > 0 {
            if right == 6 {
                right -= 1;
            }
            for step in 0..size {
                let y = if upward { size - 1 - step } else { step };
                for x in [right as usize, right as usize - 1] {
                    if !func.is_function(x, y) {
                        bits.push(matrix.get(x, y));
                    }
                }
            }
            upward = !upward;
            right -= 2;
        }

        bits
    }

    /// Whole codewords, most significant bit first; leftover remainder bits are dropped
    pub fn codewords(matrix: &BitMatrix, func: &FunctionMask) -> Vec<u8> {
        Self::extract(matrix, func)
            .chunks_exact(8)
            .map(|byte| byte.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
            .collect()
    }
}
