//! Finder pattern (capstone) classification.
//!
//! Every labeled region is a potential capstone stone: the solid 3x3 centre of a
//! finder pattern. Lines are cast through its centroid horizontally, vertically
//! and along both diagonals; each must cross ring, gap, stone, gap, ring in
//! 1:1:3:1:1 proportion, with both ring runs landing on the same enclosing region.

use crate::detector::regions::{Region, RegionMap};
use crate::models::Point;
use crate::utils::geometry::PerspectiveTransform;
use log::{debug, trace};
use std::collections::HashSet;

/// Line directions probed through each candidate stone
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
/// Lines that must show the finder proportions
const MIN_PASSING_LINES: usize = 3;
/// Accepted stone/ring pixel ratio (ideal 9/24)
const STONE_RING_RATIO: (f32, f32) = (0.1, 0.7);

/// A finder pattern located in the image
#[derive(Debug, Clone)]
pub struct Capstone {
    /// Label of the 3x3 centre region
    pub stone: u32,
    /// Label of the 7x7 outer ring region
    pub ring: u32,
    /// Outer ring corners, clockwise in image space, arbitrary starting corner
    pub corners: [Point; 4],
    /// Centre of the pattern
    pub center: Point,
    /// Mean module pitch in pixels
    pub module_size: f32,
    /// Maps pattern-local coordinates (0..7 per axis) into the image
    pub transform: PerspectiveTransform,
}

/// Find every region that is the stone of a finder pattern
pub fn find_capstones(regions: &RegionMap, tolerance: f32) -> Vec<Capstone> {
    let mut seen_rings = HashSet::new();
    let mut capstones = Vec::new();

    for stone in regions.regions() {
        let Some(ring) = test_stone(regions, stone, tolerance) else {
            continue;
        };
        if !seen_rings.insert(ring.label) {
            continue;
        }
        if let Some(capstone) = build_capstone(regions, stone, ring) {
            trace!(
                "capstone stone={} ring={} center=({:.1}, {:.1}) module={:.2}",
                capstone.stone,
                capstone.ring,
                capstone.center.x,
                capstone.center.y,
                capstone.module_size
            );
            capstones.push(capstone);
        }
    }

    debug!("{} capstones from {} regions", capstones.len(), regions.len());
    capstones
}

/// Ring region enclosing `stone` when the region passes the finder tests
fn test_stone<'a>(regions: &'a RegionMap, stone: &Region, tolerance: f32) -> Option<&'a Region> {
    let (w, h) = (stone.width() as f32, stone.height() as f32);
    if !(0.5..=2.0).contains(&(w / h)) {
        return None;
    }
    if (stone.pixel_count as f32) < 0.3 * w * h {
        return None;
    }

    let c = stone.centroid();
    let (cx, cy) = (c.x.floor() as isize, c.y.floor() as isize);
    if regions.label_at(cx, cy) != stone.label {
        return None;
    }

    let limit = 4 * stone.width().max(stone.height()) + 4;
    let mut ring_label = None;
    let mut passing = 0;
    let mut pitch_sum = 0.0f32;
    for (dx, dy) in DIRECTIONS {
        let forward = ray_runs(regions, stone.label, cx, cy, dx, dy, limit);
        let backward = ray_runs(regions, stone.label, cx, cy, -dx, -dy, limit);
        let (Some(f), Some(b)) = (forward, backward) else {
            continue;
        };
        if f.ring != b.ring {
            continue;
        }
        let runs = [b.ring_len, b.gap_len, b.stone_len + f.stone_len + 1, f.gap_len, f.ring_len];
        if !matches_finder_ratio(&runs, tolerance) {
            continue;
        }
        match ring_label {
            None => ring_label = Some(f.ring),
            Some(label) if label != f.ring => return None,
            Some(_) => {}
        }
        let step = if dx != 0 && dy != 0 { std::f32::consts::SQRT_2 } else { 1.0 };
        pitch_sum += runs.iter().sum::<usize>() as f32 * step / 7.0;
        passing += 1;
    }
    if passing < MIN_PASSING_LINES {
        return None;
    }

    let ring = regions.region(ring_label?)?;
    let ratio = stone.pixel_count as f32 / ring.pixel_count as f32;
    if !(STONE_RING_RATIO.0..=STONE_RING_RATIO.1).contains(&ratio) {
        return None;
    }
    let pitch = pitch_sum / passing as f32;
    if ring.centroid().distance(&c) > 1.5 * pitch {
        return None;
    }
    Some(ring)
}

/// Run lengths met walking out of the stone along one direction
#[derive(Debug, Clone, Copy)]
struct RayRuns {
    stone_len: usize,
    gap_len: usize,
    ring_len: usize,
    ring: u32,
}

fn ray_runs(
    regions: &RegionMap,
    stone: u32,
    cx: isize,
    cy: isize,
    dx: isize,
    dy: isize,
    limit: usize,
) -> Option<RayRuns> {
    let mut runs = RayRuns {
        stone_len: 0,
        gap_len: 0,
        ring_len: 0,
        ring: 0,
    };
    for step in 1..=limit as isize {
        let label = regions.label_at(cx + dx * step, cy + dy * step);
        if runs.gap_len == 0 && label == stone {
            runs.stone_len += 1;
        } else if runs.ring == 0 {
            if label == 0 {
                runs.gap_len += 1;
            } else if label == stone || runs.gap_len == 0 {
                return None;
            } else {
                runs.ring = label;
                runs.ring_len = 1;
            }
        } else if label == runs.ring {
            runs.ring_len += 1;
        } else {
            return Some(runs);
        }
    }
    None
}

/// Checks runs against 1:1:3:1:1 with relative `tolerance` (and at least one pixel of slack)
pub(crate) fn matches_finder_ratio(runs: &[usize; 5], tolerance: f32) -> bool {
    const EXPECTED: [f32; 5] = [1.0, 1.0, 3.0, 1.0, 1.0];
    let total: usize = runs.iter().sum();
    if total < 7 {
        return false;
    }
    let unit = total as f32 / 7.0;
    runs.iter().zip(EXPECTED).all(|(&run, expected)| {
        let ideal = expected * unit;
        (run as f32 - ideal).abs() <= (tolerance * ideal).max(1.0)
    })
}

fn build_capstone(regions: &RegionMap, stone: &Region, ring: &Region) -> Option<Capstone> {
    let center = stone.centroid();
    let corners = ring_corners(regions, ring.label, center)?;
    let local = [
        Point::new(0.0, 0.0),
        Point::new(7.0, 0.0),
        Point::new(7.0, 7.0),
        Point::new(0.0, 7.0),
    ];
    let transform = PerspectiveTransform::from_points(&local, &corners)?;
    let side: f32 = (0..4).map(|i| corners[i].distance(&corners[(i + 1) % 4])).sum::<f32>() / 4.0;
    let center = transform.transform(&Point::new(3.5, 3.5));
    if !center.is_finite() || side < 3.0 {
        return None;
    }
    Some(Capstone {
        stone: stone.label,
        ring: ring.label,
        corners,
        center,
        module_size: side / 7.0,
        transform,
    })
}

/// Four outer corners of a ring region, clockwise in y-down image space.
///
/// The first corner is the ring pixel farthest from the centre; the others are
/// the extremes along that corner's direction and its perpendicular.
fn ring_corners(regions: &RegionMap, ring: u32, center: Point) -> Option<[Point; 4]> {
    let pixel = |(x, y): (usize, usize)| Point::new(x as f32 + 0.5, y as f32 + 0.5);
    let first = regions
        .pixels(ring)
        .map(pixel)
        .max_by(|a, b| a.distance_squared(&center).total_cmp(&b.distance_squared(&center)))?;
    let reference = first - center;
    if reference.norm() < 1.0 {
        return None;
    }
    let perpendicular = Point::new(-reference.y, reference.x);

    let mut best = [(f32::MIN, center); 4];
    for p in regions.pixels(ring).map(pixel) {
        let rel = p - center;
        let up = rel.dot(&reference);
        let right = rel.dot(&perpendicular);
        for (slot, score) in best.iter_mut().zip([up, right, -up, -right]) {
            if score > slot.0 {
                *slot = (score, p);
            }
        }
    }

    // Pixel centres sit inside the outline; push each corner out to the pixel edge
    let mut corners = [Point::default(); 4];
    for (corner, (_, p)) in corners.iter_mut().zip(best) {
        let out = p - center;
        let len = out.norm();
        *corner = if len > 0.0 { p + out * (0.7 / len) } else { p };
    }
    Some(corners)
}
