use crate::error::DecodeError;
use image::GrayImage;

/// Borrowed 8-bit grayscale raster, row-major, one byte per pixel.
#[derive(Debug, Clone, Copy)]
pub struct RasterImage<'a> {
    width: usize,
    height: usize,
    pixels: &'a [u8],
}

impl<'a> RasterImage<'a> {
    /// Wrap a pixel buffer, checking that it holds exactly `width * height` samples
    pub fn new(width: usize, height: usize, pixels: &'a [u8]) -> Result<Self, DecodeError> {
        let expected = width.checked_mul(height).ok_or(DecodeError::InvalidInput {
            width,
            height,
            expected: usize::MAX,
            actual: pixels.len(),
        })?;
        if pixels.len() != expected {
            return Err(DecodeError::InvalidInput {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Borrow a single-channel `image` buffer. Multi-channel images must be
    /// converted (e.g. `DynamicImage::to_luma8`) before they get here.
    pub fn from_luma(image: &'a GrayImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            pixels: image.as_raw(),
        }
    }

    /// Image width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw samples
    pub fn pixels(&self) -> &'a [u8] {
        self.pixels
    }

    /// Sample at (x, y); caller keeps coordinates in range
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    /// One row of samples
    #[inline]
    pub fn row(&self, y: usize) -> &'a [u8] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}
