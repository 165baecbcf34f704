//! qr_reader - QR code decoding for grayscale rasters
//!
//! A pure Rust pipeline that finds every QR symbol in an 8-bit grayscale image
//! and returns its payload: adaptive binarization, connected-region labeling,
//! finder pattern grouping, perspective-correct sampling, BCH format recovery,
//! Reed-Solomon correction and segment decoding.
//!
//! ```
//! let pixels = vec![255u8; 64 * 64];
//! let codes = qr_reader::decode(64, 64, &pixels).unwrap();
//! assert!(codes.is_empty());
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Decoder tuning and `QR_*` environment overrides
pub mod config;
/// QR code decoding modules (format, error correction, data modes)
#[allow(missing_docs)]
pub mod decoder;
/// QR code detection modules (regions, finder patterns, sampling)
#[allow(missing_docs)]
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (QRCode, BitMatrix, Point, RasterImage, etc.)
pub mod models;
/// Utility functions (binarization, geometry)
#[allow(missing_docs)]
pub mod utils;

mod pipeline;

pub use config::DecoderConfig;
pub use decoder::{Fnc1, Payload, Segment, StructuredAppend};
pub use error::DecodeError;
pub use models::{BitMatrix, ECLevel, MaskPattern, Point, QRCode, RasterImage, Version};

/// Decode every QR symbol in a grayscale image
///
/// # Arguments
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `pixels` - Row-major grayscale bytes (1 byte per pixel)
///
/// # Returns
/// One payload string per decoded symbol, in detection order. An image without
/// readable symbols gives an empty vector; only a buffer whose length is not
/// `width * height` is an error.
///
/// Configuration comes from the `QR_*` environment variables, read once per process.
pub fn decode(width: usize, height: usize, pixels: &[u8]) -> Result<Vec<String>, DecodeError> {
    let image = RasterImage::new(width, height, pixels)?;
    Ok(pipeline::detect(&image, config::env_config())
        .into_iter()
        .map(|code| code.content)
        .collect())
}

/// Decoder with an explicit configuration
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the given settings
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Create a decoder configured from `QR_*` environment variables
    pub fn from_env() -> Self {
        Self::new(config::env_config().clone())
    }

    /// Active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Full results for every decoded symbol
    pub fn detect(&self, image: &RasterImage) -> Vec<QRCode> {
        pipeline::detect(image, &self.config)
    }

    /// Payload text of every decoded symbol
    pub fn decode(&self, image: &RasterImage) -> Vec<String> {
        self.detect(image).into_iter().map(|code| code.content).collect()
    }

    /// Decode a single QR code (the first one found)
    pub fn detect_single(&self, image: &RasterImage) -> Option<QRCode> {
        self.detect(image).into_iter().next()
    }
}
