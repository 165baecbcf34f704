/// Packed bit grid
pub mod matrix;
/// 2D points
pub mod point;
/// Symbol parameters and decode results
pub mod qr_code;
/// Borrowed grayscale input
pub mod raster;

pub use matrix::BitMatrix;
pub use point::Point;
pub use qr_code::{ECLevel, MaskPattern, QRCode, Version};
pub use raster::RasterImage;
