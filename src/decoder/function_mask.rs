use crate::models::{BitMatrix, Version};

/// Function module mask for a specific QR version.
/// true = function module (finder, separator, timing, alignment, format,
/// version or dark module), false = data module.
#[derive(Debug, Clone)]
pub struct FunctionMask {
    mask: BitMatrix,
    version: Version,
}

impl FunctionMask {
    /// Build the mask for `version`
    pub fn new(version: Version) -> Self {
        let size = version.size();
        let mut mask = BitMatrix::new(size, size);

        // Finder patterns with their separators and the format areas beside them
        Self::mark_rect(&mut mask, 0, 0, 9, 9);
        Self::mark_rect(&mut mask, size - 8, 0, 8, 9);
        Self::mark_rect(&mut mask, 0, size - 8, 9, 8);

        // Timing patterns (row 6 and column 6)
        Self::mark_rect(&mut mask, 8, 6, size - 16, 1);
        Self::mark_rect(&mut mask, 6, 8, 1, size - 16);

        // Alignment patterns, except where they would overlap a finder
        let align = alignment_pattern_positions(version.number());
        if let (Some(&first), Some(&last)) = (align.first(), align.last()) {
            for &cy in &align {
                for &cx in &align {
                    let on_finder = (cx == first && cy == first)
                        || (cx == last && cy == first)
                        || (cx == first && cy == last);
                    if !on_finder {
                        Self::mark_rect(&mut mask, cx - 2, cy - 2, 5, 5);
                    }
                }
            }
        }

        // Version info blocks (v7+)
        if version.has_version_info() {
            Self::mark_rect(&mut mask, size - 11, 0, 3, 6);
            Self::mark_rect(&mut mask, 0, size - 11, 6, 3);
        }

        Self { mask, version }
    }

    /// Grid side in modules
    pub fn size(&self) -> usize {
        self.mask.width()
    }

    /// Version the mask was built for
    pub fn version(&self) -> Version {
        self.version
    }

    /// True if (x, y) holds a function module
    pub fn is_function(&self, x: usize, y: usize) -> bool {
        self.mask.get(x, y)
    }

    /// Number of data modules (counted)
    pub fn data_modules_count(&self) -> usize {
        let size = self.size();
        size * size - self.mask.count_ones()
    }

    fn mark_rect(mask: &mut BitMatrix, x: usize, y: usize, w: usize, h: usize) {
        for yy in y..y + h {
            for xx in x..x + w {
                mask.set(xx, yy, true);
            }
        }
    }
}

/// Alignment pattern centre coordinates (shared by rows and columns) for a version
pub fn alignment_pattern_positions(version: u8) -> Vec<usize> {
    if !(2..=40).contains(&version) {
        return Vec::new();
    }
    let count = version as usize / 7 + 2;
    let size = 17 + 4 * version as usize;
    let step = if version == 32 {
        26
    } else {
        (version as usize * 4 + count * 2 + 1) / (count * 2 - 2) * 2
    };

    let mut positions = vec![6usize; count];
    for i in 1..count {
        positions[count - i] = size - 7 - (i - 1) * step;
    }
    positions
}

/// Data modules of a version, from the closed-form layout count
pub fn raw_data_modules(version: Version) -> usize {
    let v = version.number() as usize;
    let mut modules = (16 * v + 128) * v + 64;
    if v >= 2 {
        let count = v / 7 + 2;
        modules -= (25 * count - 10) * count - 55;
        if v >= 7 {
            modules -= 36;
        }
    }
    modules
}
