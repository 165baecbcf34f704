//! QR code decoding modules
//!
//! This module contains all the logic for decoding a sampled module grid:
//! - Format and version information extraction (BCH)
//! - Unmasking and bitstream extraction
//! - Reed-Solomon error correction
//! - Data mode decoding (numeric, alphanumeric, byte, kanji, ECI)

/// BCH error correction for format and version info
pub mod bch;
/// Bitstream extraction from QR matrix
pub mod bitstream;
/// Format information extraction (mask pattern, EC level)
pub mod format;
/// Function module mask builder (finder/timing/format/alignment/version)
pub mod function_mask;
/// Data mode decoders
pub mod modes;
/// Segment parsing into a payload
pub mod payload;
/// Reed-Solomon error correction
pub mod reed_solomon;
/// Per-grid decode: format, error correction, data
pub mod symbol;
/// QR specification tables (ECC codewords/blocks)
pub mod tables;
/// QR code unmasking (removes mask patterns)
pub mod unmask;
/// Version information extraction (versions 7-40)
pub mod version;

pub use payload::{Fnc1, Payload, Segment, StructuredAppend};
pub use symbol::{DecodedSymbol, decode_grid};
