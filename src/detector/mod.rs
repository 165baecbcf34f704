//! QR code detection modules
//!
//! This module contains all the logic for locating symbols in a binarized image:
//! - Connected-region labeling
//! - Finder pattern (capstone) classification and grouping into frames
//! - Timing pattern reading and alignment pattern search
//! - Perspective-correct module sampling

/// Alignment pattern search around predicted grid positions
pub mod alignment;
/// Finder pattern detection using the 1:1:3:1:1 ratio on labeled regions
pub mod finder;
/// Capstone triples to candidate frames
pub mod grouping;
/// Connected-component labeling
pub mod regions;
/// Homography fitting and module sampling
pub mod sampler;
/// Timing pattern reading between finder patterns
pub mod timing;

pub use finder::{Capstone, find_capstones};
pub use grouping::{Frame, group_capstones};
pub use regions::{Region, RegionMap};
pub use sampler::{GridSampler, SampledGrid};
