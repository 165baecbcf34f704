//! Alignment pattern search for QR versions 2+.
//!
//! Starting from the position the current homography predicts, a 5x5 module
//! template (black border, white ring, black centre) is matched on a half-module
//! lattice of offsets using the local module axes. The best match is then snapped
//! to the centroid of the black centre module's region.

use crate::detector::regions::RegionMap;
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::PerspectiveTransform;

/// Search radius around the prediction, in modules
const SEARCH_RADIUS: f32 = 3.0;
/// Offset lattice step, in modules
const SEARCH_STEP: f32 = 0.5;
/// Template cells allowed to disagree
const MAX_MISMATCHES: usize = 3;

/// Locate the alignment pattern whose centre module sits at `grid_center`.
///
/// Returns the refined image position of the centre, or `None` if no template
/// match is good enough.
pub fn locate_alignment(
    binary: &BitMatrix,
    regions: &RegionMap,
    transform: &PerspectiveTransform,
    grid_center: Point,
) -> Option<Point> {
    let predicted = transform.transform(&grid_center);
    let (ex, ey) = transform.unit_axes(&grid_center);
    if !predicted.is_finite() || !ex.is_finite() || !ey.is_finite() {
        return None;
    }
    let module_area = ex.cross(&ey).abs();
    if module_area < 1.0 {
        return None;
    }

    let steps = (SEARCH_RADIUS / SEARCH_STEP) as i32;
    let mut best: Option<(usize, f32, Point)> = None;
    for j in -steps..=steps {
        for i in -steps..=steps {
            let (a, b) = (i as f32 * SEARCH_STEP, j as f32 * SEARCH_STEP);
            let candidate = predicted + ex * a + ey * b;
            let mismatches = template_mismatches(binary, candidate, ex, ey);
            let distance = a * a + b * b;
            let better = match best {
                None => true,
                Some((m, d, _)) => mismatches < m || (mismatches == m && distance < d),
            };
            if better {
                best = Some((mismatches, distance, candidate));
            }
        }
    }

    let (mismatches, _, found) = best?;
    if mismatches > MAX_MISMATCHES {
        return None;
    }

    let label = regions.label_at(found.x.floor() as isize, found.y.floor() as isize);
    let refined = regions
        .region(label)
        .filter(|r| (r.pixel_count as f32) <= 2.0 * module_area)
        .map(|r| r.centroid())
        .filter(|c| c.distance(&found) <= ex.norm().max(ey.norm()))
        .unwrap_or(found);
    Some(refined)
}

/// Cells of the 5x5 template that disagree with the bitmap around `center`
fn template_mismatches(binary: &BitMatrix, center: Point, ex: Point, ey: Point) -> usize {
    let mut mismatches = 0;
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let ring = dx.abs().max(dy.abs());
            let expected_black = ring != 1;
            let p = center + ex * dx as f32 + ey * dy as f32;
            let black = binary.get_signed(p.x.floor() as isize, p.y.floor() as isize);
            if black != expected_black {
                mismatches += 1;
            }
        }
    }
    mismatches
}
