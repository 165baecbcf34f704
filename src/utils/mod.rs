//! Image-processing helpers shared by the detector stages
//!
//! - Binarization (cell-based adaptive thresholds over an integral image)
//! - Geometry (projective transforms fitted from point correspondences)

pub mod binarization;
pub mod geometry;
