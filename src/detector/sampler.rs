//! Grid sampling: from a candidate frame to a module bit grid.
//!
//! The grid-to-image homography is fitted by least squares on the twelve finder
//! corners, plus timing-run centres once their count agrees with the candidate
//! size, plus any alignment patterns found. Each module is read as a majority
//! vote over a 3x3 set of sample points around its centre.

use crate::decoder::function_mask::alignment_pattern_positions;
use crate::detector::alignment::locate_alignment;
use crate::detector::grouping::{FINDER_LOCAL, Frame};
use crate::detector::regions::RegionMap;
use crate::detector::timing::TimingLine;
use crate::error::Rejection;
use crate::models::{BitMatrix, Point, Version};
use crate::utils::geometry::PerspectiveTransform;
use log::trace;

/// Sub-module offsets of the 3x3 voting window
const VOTE_OFFSETS: [f32; 3] = [-0.25, 0.0, 0.25];
/// Finder modules (of 147) allowed to come out wrong before the grid is abandoned
const MAX_FINDER_MISMATCHES: usize = 147 / 4;
/// Size candidates tried per frame
const MAX_CANDIDATES: usize = 3;

/// A sampled, still masked module grid
#[derive(Debug, Clone)]
pub struct SampledGrid {
    /// Version the grid was sampled at
    pub version: Version,
    /// Module bits, `version.size()` square (true = black)
    pub modules: BitMatrix,
    /// Fitted grid-to-image homography
    pub transform: PerspectiveTransform,
}

impl SampledGrid {
    /// Symbol outline in the image: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Point; 4] {
        let n = self.version.size() as f32;
        [(0.0, 0.0), (n, 0.0), (n, n), (0.0, n)]
            .map(|(x, y)| self.transform.transform(&Point::new(x, y)))
    }
}

/// Timing lines read for one frame
#[derive(Debug, Clone)]
pub struct FrameProbe<'f> {
    frame: &'f Frame,
    horizontal: Option<TimingLine>,
    vertical: Option<TimingLine>,
}

impl<'f> FrameProbe<'f> {
    /// Frame being probed
    pub fn frame(&self) -> &'f Frame {
        self.frame
    }

    /// Timing lines (0 to 2) whose run count is within one version of the finder spacing
    pub fn timing_agreement(&self) -> usize {
        let spaced = self.frame.version.number();
        [&self.horizontal, &self.vertical]
            .into_iter()
            .filter_map(|line| line.as_ref().and_then(TimingLine::version))
            .filter(|v| v.number().abs_diff(spaced) <= 1)
            .count()
    }

    /// Sizes to try, most trusted first: horizontal timing, vertical timing, finder spacing
    pub fn candidate_versions(&self) -> Vec<Version> {
        let mut out = Vec::with_capacity(MAX_CANDIDATES);
        let timing = [&self.horizontal, &self.vertical]
            .into_iter()
            .filter_map(|line| line.as_ref().and_then(TimingLine::version));
        for version in timing.chain(std::iter::once(self.frame.version)) {
            if !out.contains(&version) && out.len() < MAX_CANDIDATES {
                out.push(version);
            }
        }
        out
    }
}

/// Samples frames against one binarized image
pub struct GridSampler<'a> {
    binary: &'a BitMatrix,
    regions: &'a RegionMap,
}

impl<'a> GridSampler<'a> {
    /// Create a sampler over a bitmap and its region labels
    pub fn new(binary: &'a BitMatrix, regions: &'a RegionMap) -> Self {
        Self { binary, regions }
    }

    /// Read both timing lines of a frame
    pub fn probe<'f>(&self, frame: &'f Frame) -> FrameProbe<'f> {
        let [tl, tr, bl] = &frame.locals;
        let origin = tl.transform(&Point::new(6.5, 6.5));
        let horizontal = TimingLine::scan(
            self.binary,
            origin,
            tr.transform(&Point::new(0.5, 6.5)),
            frame.module_size,
        );
        let vertical = TimingLine::scan(
            self.binary,
            origin,
            bl.transform(&Point::new(6.5, 0.5)),
            frame.module_size,
        );
        FrameProbe {
            frame,
            horizontal,
            vertical,
        }
    }

    /// Fit the homography for `version` and read every module
    pub fn sample(&self, probe: &FrameProbe, version: Version) -> Result<SampledGrid, Rejection> {
        let frame = probe.frame;
        let size = version.size();
        let origins = Frame::finder_origins(size);

        let mut pairs: Vec<(Point, Point)> = Vec::with_capacity(12 + 2 * size);
        for (slot, origin) in origins.iter().enumerate() {
            for (local, image) in FINDER_LOCAL.iter().zip(frame.corners[slot]) {
                pairs.push((*local + *origin, image));
            }
        }
        if let Some(line) = probe.horizontal.as_ref().filter(|l| l.interior().len() + 14 == size) {
            pairs.extend(
                line.centres()
                    .enumerate()
                    .map(|(i, c)| (Point::new(7.5 + i as f32, 6.5), c)),
            );
        }
        if let Some(line) = probe.vertical.as_ref().filter(|l| l.interior().len() + 14 == size) {
            pairs.extend(
                line.centres()
                    .enumerate()
                    .map(|(i, c)| (Point::new(6.5, 7.5 + i as f32), c)),
            );
        }
        let mut transform =
            PerspectiveTransform::fit(&pairs).ok_or(Rejection::Sampling("degenerate homography"))?;

        let positions = alignment_pattern_positions(version.number());
        if let Some(&last) = positions.last() {
            let corner = Point::new(last as f32 + 0.5, last as f32 + 0.5);
            if let Some(found) = locate_alignment(self.binary, self.regions, &transform, corner) {
                pairs.push((corner, found));
                transform = PerspectiveTransform::fit(&pairs).unwrap_or(transform);
            } else {
                trace!("version {version}: bottom-right alignment pattern not found");
            }
        }
        if version.has_version_info() {
            let (first, last) = (positions[0], positions[positions.len() - 1]);
            let mut found_any = false;
            for &ay in &positions {
                for &ax in &positions {
                    let taken = (ax == first && ay == first)
                        || (ax == last && ay == first)
                        || (ax == first && ay == last)
                        || (ax == last && ay == last);
                    if taken {
                        continue;
                    }
                    let center = Point::new(ax as f32 + 0.5, ay as f32 + 0.5);
                    if let Some(found) =
                        locate_alignment(self.binary, self.regions, &transform, center)
                    {
                        pairs.push((center, found));
                        found_any = true;
                    }
                }
            }
            if found_any {
                transform = PerspectiveTransform::fit(&pairs).unwrap_or(transform);
            }
        }

        let modules = self.read_modules(&transform, size)?;
        let mismatches = finder_mismatches(&modules);
        if mismatches > MAX_FINDER_MISMATCHES {
            return Err(Rejection::Sampling("finder patterns do not match the grid"));
        }

        Ok(SampledGrid {
            version,
            modules,
            transform,
        })
    }

    fn read_modules(
        &self,
        transform: &PerspectiveTransform,
        size: usize,
    ) -> Result<BitMatrix, Rejection> {
        let (width, height) = (self.binary.width() as f32, self.binary.height() as f32);
        let mut modules = BitMatrix::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let (cx, cy) = (x as f32 + 0.5, y as f32 + 0.5);
                let centre = transform.transform(&Point::new(cx, cy));
                let inside = centre.is_finite()
                    && (0.0..width).contains(&centre.x)
                    && (0.0..height).contains(&centre.y);
                if !inside {
                    return Err(Rejection::Sampling("module centre outside the image"));
                }
                let mut votes = 0;
                for dy in VOTE_OFFSETS {
                    for dx in VOTE_OFFSETS {
                        let p = transform.transform(&Point::new(cx + dx, cy + dy));
                        let black = p.is_finite()
                            && self.binary.get_signed(p.x.floor() as isize, p.y.floor() as isize);
                        votes += black as usize;
                    }
                }
                modules.set(x, y, votes >= 5);
            }
        }
        Ok(modules)
    }
}

/// Modules of the three finder patterns that differ from the ideal pattern
fn finder_mismatches(modules: &BitMatrix) -> usize {
    let size = modules.width();
    let origins = [(0, 0), (size - 7, 0), (0, size - 7)];
    let mut mismatches = 0;
    for (ox, oy) in origins {
        for y in 0..7 {
            for x in 0..7 {
                let ring = x == 0 || x == 6 || y == 0 || y == 6;
                let stone = (2..=4).contains(&x) && (2..=4).contains(&y);
                if modules.get(ox + x, oy + y) != (ring || stone) {
                    mismatches += 1;
                }
            }
        }
    }
    mismatches
}
