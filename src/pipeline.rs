//! Whole-image decode: binarize, label, find capstones, rank the candidate
//! frames, then decode them in rank order. A frame whose capstones an earlier
//! symbol already claimed is skipped.

use crate::config::DecoderConfig;
use crate::decoder::symbol::{DecodedSymbol, decode_grid};
use crate::detector::finder::find_capstones;
use crate::detector::grouping::group_capstones;
use crate::detector::regions::RegionMap;
use crate::detector::sampler::{FrameProbe, GridSampler, SampledGrid};
use crate::error::Rejection;
use crate::models::{QRCode, RasterImage, Version};
use crate::utils::binarization::adaptive_binarize;
use log::debug;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Candidate frames kept per corner capstone
const FRAMES_PER_CORNER: usize = 2;

/// Every symbol decoded from `image`, ordered by where its finders were found
pub(crate) fn detect(image: &RasterImage, config: &DecoderConfig) -> Vec<QRCode> {
    let binary = adaptive_binarize(image, config);
    let regions = RegionMap::label(&binary, config.min_region_pixels);
    let capstones = find_capstones(&regions, config.finder_tolerance);
    let frames = group_capstones(&capstones);
    let sampler = GridSampler::new(&binary, &regions);
    let probes = rank(frames.iter().map(|frame| sampler.probe(frame)).collect());
    debug!(
        "{}x{}: {} regions, {} capstones, {} frames, {} ranked",
        image.width(),
        image.height(),
        regions.len(),
        capstones.len(),
        frames.len(),
        probes.len()
    );

    let deadline = config.time_budget.map(|budget| Instant::now() + budget);
    let attempt = |probe: &FrameProbe<'_>| -> Option<QRCode> {
        let capstones = probe.frame().capstones;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("frame {capstones:?}: time budget exhausted, skipped");
            return None;
        }
        match decode_frame(&sampler, probe, config) {
            Ok(code) => Some(code),
            Err(rejection) => {
                debug!("frame {capstones:?}: {rejection}");
                None
            }
        }
    };

    let wave_size = if config.parallel {
        rayon::current_num_threads().max(1) * 2
    } else {
        1
    };
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut accepted: Vec<([usize; 3], QRCode)> = Vec::new();
    let mut attempts = 0;
    let mut next = 0;

    while next < probes.len() && attempts < config.max_frames {
        // A wave never holds two frames sharing a capstone, so each frame sees
        // the same claims it would see when decoding one frame at a time
        let mut wave: Vec<&FrameProbe<'_>> = Vec::new();
        let mut in_wave: HashSet<usize> = HashSet::new();
        while let Some(probe) = probes.get(next) {
            if wave.len() == wave_size || attempts + wave.len() == config.max_frames {
                break;
            }
            let capstones = probe.frame().capstones;
            if capstones.iter().any(|c| claimed.contains(c)) {
                debug!("frame {capstones:?} reuses a decoded capstone, skipped");
                next += 1;
                continue;
            }
            if capstones.iter().any(|c| in_wave.contains(c)) {
                break;
            }
            in_wave.extend(capstones);
            wave.push(probe);
            next += 1;
        }
        if wave.is_empty() {
            continue;
        }
        attempts += wave.len();

        let decoded: Vec<Option<QRCode>> = if config.parallel {
            wave.par_iter().map(|probe| attempt(*probe)).collect()
        } else {
            wave.iter().map(|probe| attempt(*probe)).collect()
        };
        for (probe, code) in wave.iter().zip(decoded) {
            if let Some(code) = code {
                let capstones = probe.frame().capstones;
                claimed.extend(capstones);
                accepted.push((capstones, code));
            }
        }
    }
    if next < probes.len() {
        let left = probes.len() - next;
        debug!("frame limit {} reached, {left} frames left", config.max_frames);
    }

    accepted.sort_by_key(|(capstones, _)| capstones.iter().copied().min());
    accepted.into_iter().map(|(_, code)| code).collect()
}

/// Orders frames by timing agreement, then residual, keeping the best few per
/// corner capstone
fn rank(probes: Vec<FrameProbe<'_>>) -> Vec<FrameProbe<'_>> {
    let mut scored: Vec<(usize, FrameProbe<'_>)> = probes
        .into_iter()
        .map(|probe| (probe.timing_agreement(), probe))
        .collect();
    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .cmp(a_score)
            .then(a.frame().residual.total_cmp(&b.frame().residual))
    });

    let mut per_corner: HashMap<usize, usize> = HashMap::new();
    scored
        .into_iter()
        .filter(|(_, probe)| {
            let kept = per_corner.entry(probe.frame().corner()).or_default();
            *kept += 1;
            *kept <= FRAMES_PER_CORNER
        })
        .map(|(_, probe)| probe)
        .collect()
}

/// Try each candidate size of a frame until one decodes
fn decode_frame(
    sampler: &GridSampler<'_>,
    probe: &FrameProbe<'_>,
    config: &DecoderConfig,
) -> Result<QRCode, Rejection> {
    let frame = probe.frame();
    let mut candidates = probe.candidate_versions();
    let mut last = Rejection::Geometry("no candidate version");
    let mut next = 0;

    while next < candidates.len() {
        let version = candidates[next];
        next += 1;
        match decode_version(sampler, probe, version, config) {
            Ok(code) => return Ok(code),
            Err(rejection) => {
                if let Rejection::VersionMismatch { decoded, .. } = rejection {
                    if let Some(v) = Version::new(decoded).filter(|v| !candidates.contains(v)) {
                        candidates.push(v);
                    }
                }
                debug!("frame {:?} as v{version}: {rejection}", frame.capstones);
                last = rejection;
            }
        }
    }

    Err(last)
}

fn decode_version(
    sampler: &GridSampler<'_>,
    probe: &FrameProbe<'_>,
    version: Version,
    config: &DecoderConfig,
) -> Result<QRCode, Rejection> {
    let grid = sampler.sample(probe, version)?;
    match decode_grid(&grid.modules, version) {
        Ok(symbol) => Ok(into_code(symbol, &grid, false)),
        Err(rejection) if config.try_mirrored => decode_grid(&grid.modules.transposed(), version)
            .map(|symbol| into_code(symbol, &grid, true))
            .map_err(|_| rejection),
        Err(rejection) => Err(rejection),
    }
}

fn into_code(symbol: DecodedSymbol, grid: &SampledGrid, mirrored: bool) -> QRCode {
    let [tl, tr, br, bl] = grid.corners();
    // A mirrored symbol's top-right finder is the grid's bottom-left one
    let position = if mirrored {
        [tl, bl, br, tr]
    } else {
        [tl, tr, br, bl]
    };
    QRCode {
        content: symbol.payload.text(),
        payload: symbol.payload,
        version: symbol.version,
        error_correction: symbol.ec_level,
        mask_pattern: symbol.mask_pattern,
        position,
        modules: symbol.modules,
        mirrored,
        corrected_errors: symbol.corrected_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_yields_nothing() {
        let pixels = vec![255u8; 64 * 48];
        let image = RasterImage::new(64, 48, &pixels).unwrap();
        assert!(detect(&image, &DecoderConfig::default()).is_empty());
    }

    #[test]
    fn test_noise_image_yields_nothing() {
        // xorshift noise
        let mut state = 0x2545_F491u32;
        let pixels: Vec<u8> = (0..120 * 90)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect();
        let image = RasterImage::new(120, 90, &pixels).unwrap();
        let config = DecoderConfig {
            parallel: false,
            ..DecoderConfig::default()
        };
        assert!(detect(&image, &config).is_empty());
    }

    #[test]
    fn test_spent_budget_skips_frames() {
        let pixels = vec![0u8; 32 * 32];
        let image = RasterImage::new(32, 32, &pixels).unwrap();
        let config = DecoderConfig {
            time_budget: Some(std::time::Duration::ZERO),
            ..DecoderConfig::default()
        };
        assert!(detect(&image, &config).is_empty());
    }
}
