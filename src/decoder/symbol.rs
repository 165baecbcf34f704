//! Decoding of one sampled module grid into a payload.

use crate::decoder::bitstream::BitstreamExtractor;
use crate::decoder::format::FormatInfo;
use crate::decoder::function_mask::FunctionMask;
use crate::decoder::payload::{DataStreamDecoder, Payload};
use crate::decoder::reed_solomon::deinterleave_and_correct;
use crate::decoder::tables::ec_block_info;
use crate::decoder::unmask::unmask;
use crate::decoder::version::VersionInfo;
use crate::error::Rejection;
use crate::models::{BitMatrix, ECLevel, MaskPattern, Version};
use log::trace;

/// A grid that made it through format, error correction and data parsing
#[derive(Debug, Clone)]
pub struct DecodedSymbol {
    pub version: Version,
    pub ec_level: ECLevel,
    pub mask_pattern: MaskPattern,
    /// Grid with the data mask removed
    pub modules: BitMatrix,
    pub payload: Payload,
    /// Codewords repaired by Reed-Solomon decoding
    pub corrected_errors: usize,
}

/// Decode a square grid sampled at `version`.
///
/// Versions 7 and up must carry matching version information; a disagreement
/// comes back as [`Rejection::VersionMismatch`] so the caller can resample.
pub fn decode_grid(grid: &BitMatrix, version: Version) -> Result<DecodedSymbol, Rejection> {
    if grid.width() != version.size() || grid.height() != version.size() {
        return Err(Rejection::Sampling("grid size does not match version"));
    }

    let format = FormatInfo::extract(grid)?;
    if version.has_version_info() {
        let decoded = VersionInfo::extract(grid)?;
        if decoded != version {
            return Err(Rejection::VersionMismatch {
                estimated: version.number(),
                decoded: decoded.number(),
            });
        }
    }

    let func = FunctionMask::new(version);
    let mut modules = grid.clone();
    unmask(&mut modules, format.mask_pattern, &func);

    let codewords = BitstreamExtractor::codewords(&modules, &func);
    let info = ec_block_info(version, format.ec_level);
    let (data, corrected_codewords) = deinterleave_and_correct(&codewords, &info)?;
    let payload = DataStreamDecoder::decode(&data, version)?;
    trace!(
        "v{version}-{} mask {}: {} segments, {corrected_codewords} codewords corrected",
        format.ec_level,
        format.mask_pattern.number(),
        payload.segments.len()
    );

    Ok(DecodedSymbol {
        version,
        ec_level: format.ec_level,
        mask_pattern: format.mask_pattern,
        modules,
        payload,
        corrected_errors: corrected_codewords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Version 1-M symbol for "4376471154038", mask 7
    const GOLDEN: [&str; 21] = [
        "#######.....#.#######",
        "#.....#..#....#.....#",
        "#.###.#...##..#.###.#",
        "#.###.#...#...#.###.#",
        "#.###.#..####.#.###.#",
        "#.....#.#.#...#.....#",
        "#######.#.#.#.#######",
        ".........#...........",
        "#..#.##.######.#.....",
        "###.#..##..#.#.#.##..",
        "#..#.####.##..###...#",
        "..#.#..#....#####....",
        "..#...##.#.#.###.##..",
        "........#.#..####.##.",
        "#######...###.#.####.",
        "#.....#.#.....##....#",
        "#.###.#..##.###..#.##",
        "#.###.#.#.#..####..##",
        "#.###.#..###.###.#..#",
        "#.....#..####..##..#.",
        "#######.###..#.###...",
    ];

    fn golden_matrix() -> BitMatrix {
        BitMatrix::from_fn(21, |x, y| GOLDEN[y].as_bytes()[x] == b'#')
    }

    #[test]
    fn test_golden_matrix_decode() {
        let symbol = decode_grid(&golden_matrix(), Version::MIN).unwrap();
        assert_eq!(symbol.payload.text(), "4376471154038");
        assert_eq!(symbol.ec_level, ECLevel::M);
        assert_eq!(symbol.mask_pattern.number(), 7);
        assert_eq!(symbol.corrected_errors, 0);
        assert_eq!(symbol.modules.width(), 21);
    }

    #[test]
    fn test_golden_matrix_with_damaged_data_modules() {
        let mut grid = golden_matrix();
        // Bottom-right column pair holds the first codewords
        for y in 17..21 {
            grid.toggle(20, y);
        }
        let symbol = decode_grid(&grid, Version::MIN).unwrap();
        assert_eq!(symbol.payload.text(), "4376471154038");
        assert!(symbol.corrected_errors >= 1);
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        assert!(matches!(
            decode_grid(&golden_matrix(), Version::new(2).unwrap()),
            Err(Rejection::Sampling(_))
        ));
    }

    #[test]
    fn test_blank_grid_is_rejected() {
        let blank = BitMatrix::new(21, 21);
        assert!(decode_grid(&blank, Version::MIN).is_err());
    }
}
