//! Decoder tuning knobs.
//!
//! Every field has a compiled-in default and an optional `QR_*` environment
//! override, read once per process by [`DecoderConfig::from_env`].

use std::sync::OnceLock;
use std::time::Duration;

/// Tunable parameters for one [`crate::Decoder`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Binarizer cell side in pixels (`QR_CELL_SIZE`)
    pub cell_size: usize,
    /// Gray levels a pixel must fall below its local threshold to count as black
    /// (`QR_THRESHOLD_BIAS`)
    pub threshold_bias: u8,
    /// Cells with a smaller gray range borrow their threshold from neighbours (`QR_MIN_CONTRAST`)
    pub min_contrast: u8,
    /// Regions with fewer pixels are treated as noise (`QR_MIN_REGION_PIXELS`)
    pub min_region_pixels: usize,
    /// Relative tolerance of the 1:1:3:1:1 finder run test (`QR_FINDER_TOLERANCE`)
    pub finder_tolerance: f32,
    /// Frames attempted per image, best ranked first (`QR_MAX_FRAMES`)
    pub max_frames: usize,
    /// Stop starting new frames after this long (`QR_TIME_BUDGET_MS`, 0 = unlimited)
    pub time_budget: Option<Duration>,
    /// Retry failed grids as mirror images (`QR_TRY_MIRRORED`)
    pub try_mirrored: bool,
    /// Decode frames on the rayon pool (`QR_PARALLEL`)
    pub parallel: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            cell_size: 8,
            threshold_bias: 2,
            min_contrast: 24,
            min_region_pixels: 4,
            finder_tolerance: 0.5,
            max_frames: 128,
            time_budget: None,
            try_mirrored: true,
            parallel: true,
        }
    }
}

impl DecoderConfig {
    /// Defaults overridden by any `QR_*` variables present in the environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let budget_ms = parse_env_u64("QR_TIME_BUDGET_MS", 0);
        Self {
            cell_size: parse_env_usize("QR_CELL_SIZE", defaults.cell_size).clamp(2, 64),
            threshold_bias: parse_env_u8("QR_THRESHOLD_BIAS", defaults.threshold_bias),
            min_contrast: parse_env_u8("QR_MIN_CONTRAST", defaults.min_contrast),
            min_region_pixels: parse_env_usize("QR_MIN_REGION_PIXELS", defaults.min_region_pixels)
                .max(1),
            finder_tolerance: parse_env_f32("QR_FINDER_TOLERANCE", defaults.finder_tolerance)
                .clamp(0.05, 0.95),
            max_frames: parse_env_usize("QR_MAX_FRAMES", defaults.max_frames).max(1),
            time_budget: (budget_ms > 0).then(|| Duration::from_millis(budget_ms)),
            try_mirrored: parse_env_bool_u8("QR_TRY_MIRRORED", defaults.try_mirrored),
            parallel: parse_env_bool_u8("QR_PARALLEL", defaults.parallel),
        }
    }
}

static ENV_CONFIG: OnceLock<DecoderConfig> = OnceLock::new();

/// Process-wide configuration used by [`crate::decode`]
pub(crate) fn env_config() -> &'static DecoderConfig {
    ENV_CONFIG.get_or_init(DecoderConfig::from_env)
}

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_u8(name: &str, default: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default)
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variables_fall_back() {
        assert_eq!(parse_env_usize("QR_TEST_SURELY_UNSET_USIZE", 7), 7);
        assert_eq!(parse_env_f32("QR_TEST_SURELY_UNSET_F32", 0.25), 0.25);
        assert!(parse_env_bool_u8("QR_TEST_SURELY_UNSET_BOOL", true));
    }

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::default();
        assert_eq!(config.cell_size, 8);
        assert!(config.time_budget.is_none());
        assert!(config.try_mirrored);
    }
}
