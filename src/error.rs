//! Error types.
//!
//! [`DecodeError`] is the only failure a caller sees. [`Rejection`] explains why a
//! single candidate frame was dropped; it never escapes the pipeline, which logs it
//! and moves on to the next frame.

use thiserror::Error;

/// Failure of a whole decode call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Pixel buffer length does not match the stated dimensions
    #[error("pixel buffer holds {actual} bytes but a {width}x{height} image needs {expected}")]
    InvalidInput {
        /// Stated width
        width: usize,
        /// Stated height
        height: usize,
        /// `width * height`
        expected: usize,
        /// Bytes actually supplied
        actual: usize,
    },
}

/// Why one candidate frame was discarded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Capstone triple does not form a plausible symbol
    #[error("geometry rejected: {0}")]
    Geometry(&'static str),
    /// Grid could not be sampled from the image
    #[error("sampling rejected: {0}")]
    Sampling(&'static str),
    /// Neither format information copy is within BCH distance
    #[error("format information uncorrectable")]
    Format,
    /// Neither version information copy is within BCH distance
    #[error("version information uncorrectable")]
    Version,
    /// Version bits disagree with the grid size they were read from
    #[error("version information says {decoded} but the grid was sampled as {estimated}")]
    VersionMismatch {
        /// Version the grid was sampled at
        estimated: u8,
        /// Version carried by the symbol
        decoded: u8,
    },
    /// A Reed-Solomon block holds more errors than its parity can fix
    #[error("reed-solomon block {block} uncorrectable")]
    Ecc {
        /// Block index in interleave order
        block: usize,
    },
    /// Corrected data does not parse as a segment sequence
    #[error("malformed bitstream: {0}")]
    Bitstream(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = DecodeError::InvalidInput {
            width: 2,
            height: 2,
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "pixel buffer holds 3 bytes but a 2x2 image needs 4"
        );
        assert_eq!(
            Rejection::Ecc { block: 2 }.to_string(),
            "reed-solomon block 2 uncorrectable"
        );
    }
}
