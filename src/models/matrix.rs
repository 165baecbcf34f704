/// Compact bit matrix (true = black) used for binarized images and module grids.
///
/// Rows are padded to whole 32-bit words so each row can be filled independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    stride: usize,
    words: Vec<u32>,
}

impl BitMatrix {
    /// Create a new all-white bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let stride = width.div_ceil(32);
        Self {
            width,
            height,
            stride,
            words: vec![0; stride * height],
        }
    }

    /// Square matrix built from a predicate over (x, y)
    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut matrix = Self::new(size, size);
        for y in 0..size {
            for x in 0..size {
                if f(x, y) {
                    matrix.set(x, y, true);
                }
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y); out-of-range coordinates read as white
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let word = self.words[y * self.stride + x / 32];
        (word >> (x % 32)) & 1 == 1
    }

    /// Get bit at signed coordinates; anything outside reads as white
    #[inline]
    pub fn get_signed(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.get(x as usize, y as usize)
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let word = &mut self.words[y * self.stride + x / 32];
        if value {
            *word |= 1 << (x % 32);
        } else {
            *word &= !(1 << (x % 32));
        }
    }

    /// Toggle bit at (x, y)
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.words[y * self.stride + x / 32] ^= 1 << (x % 32);
    }

    /// Number of black bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Copy with rows and columns swapped (reads a mirror-imaged symbol)
    pub fn transposed(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(y, x, true);
                }
            }
        }
        out
    }

    /// Words per row
    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    /// Row-major packed words, `stride()` words per row
    pub(crate) fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(40, 8);
        assert_eq!(matrix.width(), 40);
        assert_eq!(matrix.height(), 8);
        assert_eq!(matrix.stride(), 2);

        matrix.set(3, 4, true);
        matrix.set(35, 4, true);
        assert!(matrix.get(3, 4));
        assert!(matrix.get(35, 4));
        assert!(!matrix.get(3, 3));
        assert_eq!(matrix.count_ones(), 2);

        matrix.toggle(3, 4);
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get_signed(-1, 2));
    }

    #[test]
    fn test_transposed() {
        let matrix = BitMatrix::from_fn(5, |x, y| x == 4 && y == 1);
        let t = matrix.transposed();
        assert!(t.get(1, 4));
        assert!(!t.get(4, 1));
        assert_eq!(t.transposed(), matrix);
    }
}
