//! Grouping capstones into candidate symbol frames.
//!
//! Each capstone is tried as the top-left finder of a symbol. Its partners come
//! from the capstones lying along one of its own edge axes, one from each axis.
//! A triple qualifies when it has a near right angle at the corner capstone, legs
//! of similar length aligned with that capstone's edges, and comparable module
//! sizes. Qualifying triples are ranked by their summed geometric residual.

use crate::detector::finder::Capstone;
use crate::error::Rejection;
use crate::models::{Point, Version};
use crate::utils::geometry::PerspectiveTransform;
use log::{debug, trace};

const MAX_ABS_COS: f32 = 0.35;
const MAX_SIZE_RATIO: f32 = 1.75;
const MAX_LEG_MISMATCH: f32 = 0.35;
const MAX_AXIS_ERROR: f32 = 0.35;
/// Shortest centre-to-centre distance, in modules, between finders (version 1 has 14)
const MIN_LEG_MODULES: f32 = 10.0;

/// Corners of a finder pattern in its own module coordinates
pub(crate) const FINDER_LOCAL: [Point; 4] = [
    Point { x: 0.0, y: 0.0 },
    Point { x: 7.0, y: 0.0 },
    Point { x: 7.0, y: 7.0 },
    Point { x: 0.0, y: 7.0 },
];

/// A candidate symbol: three capstones in grid orientation
#[derive(Debug, Clone)]
pub struct Frame {
    /// Capstone indices: top-left, top-right, bottom-left
    pub capstones: [usize; 3],
    /// Version suggested by the capstone spacing
    pub version: Version,
    /// Sum of the geometric deviations from an ideal symbol (lower is better)
    pub residual: f32,
    /// Mean module pitch of the three capstones
    pub module_size: f32,
    /// Per capstone, image corners matching [`FINDER_LOCAL`] in symbol orientation
    pub corners: [[Point; 4]; 3],
    /// Per capstone, pattern-local module coordinates to image in symbol orientation
    pub locals: [PerspectiveTransform; 3],
    /// Initial grid-to-image homography fitted on the twelve finder corners
    pub transform: PerspectiveTransform,
}

impl Frame {
    /// Module-grid origin of each finder for a symbol `size` modules wide
    pub fn finder_origins(size: usize) -> [Point; 3] {
        let far = (size - 7) as f32;
        [
            Point::new(0.0, 0.0),
            Point::new(far, 0.0),
            Point::new(0.0, far),
        ]
    }

    /// Top-left capstone, the corner the frame was built around
    pub fn corner(&self) -> usize {
        self.capstones[0]
    }
}

/// Qualifying capstone triples, best residual first
pub fn group_capstones(capstones: &[Capstone]) -> Vec<Frame> {
    let mut frames = Vec::new();
    for corner in 0..capstones.len() {
        let (along, across) = axis_neighbours(capstones, corner);
        for &h in &along {
            for &v in &across {
                match build_frame(capstones, [corner, h, v]) {
                    // Right angle elsewhere: that capstone builds the frame itself
                    Ok(frame) if frame.corner() == corner => frames.push(frame),
                    Ok(_) => {}
                    Err(reason) => trace!("triple ({corner}, {h}, {v}) dropped: {reason}"),
                }
            }
        }
    }
    frames.sort_by(|a, b| a.residual.total_cmp(&b.residual));
    debug!("{} frames from {} capstones", frames.len(), capstones.len());
    frames
}

/// Capstones whose centres lie along the first and the second edge axis of `corner`
fn axis_neighbours(capstones: &[Capstone], corner: usize) -> (Vec<usize>, Vec<usize>) {
    let c = &capstones[corner];
    let edges = [c.corners[1] - c.corners[0], c.corners[3] - c.corners[0]];
    let mut lists = (Vec::new(), Vec::new());
    for (index, other) in capstones.iter().enumerate() {
        if index == corner {
            continue;
        }
        let offset = other.center - c.center;
        let len = offset.norm();
        if len == 0.0 {
            continue;
        }
        let sine = |edge: Point| {
            let edge_len = edge.norm();
            if edge_len == 0.0 {
                1.0
            } else {
                (offset.cross(&edge) / (len * edge_len)).abs()
            }
        };
        if sine(edges[0]) <= MAX_AXIS_ERROR {
            lists.0.push(index);
        } else if sine(edges[1]) <= MAX_AXIS_ERROR {
            lists.1.push(index);
        }
    }
    lists
}

fn build_frame(capstones: &[Capstone], triple: [usize; 3]) -> Result<Frame, Rejection> {
    let (tl, tr, bl, abs_cos) = order_capstones(capstones, triple)?;
    let (c_tl, c_tr, c_bl) = (&capstones[tl], &capstones[tr], &capstones[bl]);

    let sizes = [c_tl.module_size, c_tr.module_size, c_bl.module_size];
    let min_size = sizes.iter().copied().fold(f32::INFINITY, f32::min);
    let max_size = sizes.iter().copied().fold(0.0f32, f32::max);
    let size_ratio = max_size / min_size;
    if size_ratio > MAX_SIZE_RATIO {
        return Err(Rejection::Geometry("capstone sizes differ"));
    }
    let module = sizes.iter().sum::<f32>() / 3.0;

    let leg_tr = c_tr.center - c_tl.center;
    let leg_bl = c_bl.center - c_tl.center;
    let (len_tr, len_bl) = (leg_tr.norm(), leg_bl.norm());
    let mismatch = (len_tr - len_bl).abs() / len_tr.max(len_bl);
    if mismatch > MAX_LEG_MISMATCH {
        return Err(Rejection::Geometry("legs differ in length"));
    }
    if len_tr.min(len_bl) < MIN_LEG_MODULES * module {
        return Err(Rejection::Geometry("capstones too close"));
    }

    let axis_error = axis_error(c_tl, leg_tr).max(axis_error(c_tl, leg_bl));
    if axis_error > MAX_AXIS_ERROR {
        return Err(Rejection::Geometry("legs not aligned with finder edges"));
    }

    let version = estimate_version((len_tr + len_bl) / 2.0, module)?;
    let residual = abs_cos + mismatch + (size_ratio - 1.0) + axis_error;

    let size = version.size();
    let origins = Frame::finder_origins(size);
    let coarse = CoarseGrid::new(c_tl.center, c_tr.center, c_bl.center, size);
    let mut corners = [[Point::default(); 4]; 3];
    for (slot, &index) in [tl, tr, bl].iter().enumerate() {
        corners[slot] = orient_corners(&capstones[index].corners, origins[slot], &coarse);
    }

    let mut locals = [PerspectiveTransform::identity(); 3];
    let mut pairs = Vec::with_capacity(12);
    for slot in 0..3 {
        locals[slot] = PerspectiveTransform::from_points(&FINDER_LOCAL, &corners[slot])
            .ok_or(Rejection::Geometry("degenerate capstone"))?;
        for (local, image) in FINDER_LOCAL.iter().zip(corners[slot]) {
            pairs.push((*local + origins[slot], image));
        }
    }
    let transform =
        PerspectiveTransform::fit(&pairs).ok_or(Rejection::Geometry("degenerate frame"))?;

    Ok(Frame {
        capstones: [tl, tr, bl],
        version,
        residual,
        module_size: module,
        corners,
        locals,
        transform,
    })
}

/// Picks the right-angle capstone as top-left, then splits the other two by handedness
fn order_capstones(
    capstones: &[Capstone],
    triple: [usize; 3],
) -> Result<(usize, usize, usize, f32), Rejection> {
    let mut best = None;
    for t in 0..3 {
        let a = capstones[triple[t]].center;
        let v1 = capstones[triple[(t + 1) % 3]].center - a;
        let v2 = capstones[triple[(t + 2) % 3]].center - a;
        let denom = v1.norm() * v2.norm();
        if denom == 0.0 {
            return Err(Rejection::Geometry("coincident capstones"));
        }
        let cos = (v1.dot(&v2) / denom).abs();
        if best.is_none_or(|(_, c)| cos < c) {
            best = Some((t, cos));
        }
    }
    let (t, abs_cos) = best.ok_or(Rejection::Geometry("empty triple"))?;
    if abs_cos >= MAX_ABS_COS {
        return Err(Rejection::Geometry("no right angle"));
    }

    let tl = triple[t];
    let p1 = triple[(t + 1) % 3];
    let p2 = triple[(t + 2) % 3];
    let cross = (capstones[p1].center - capstones[tl].center)
        .cross(&(capstones[p2].center - capstones[tl].center));
    let (tr, bl) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };
    Ok((tl, tr, bl, abs_cos))
}

/// Sine of the angle between `leg` and the closer of the capstone's two edge directions
fn axis_error(capstone: &Capstone, leg: Point) -> f32 {
    let c = &capstone.corners;
    let edges = [c[1] - c[0], c[3] - c[0]];
    let leg_len = leg.norm();
    edges
        .iter()
        .filter(|e| e.norm() > 0.0)
        .map(|e| (leg.cross(e) / (leg_len * e.norm())).abs())
        .fold(1.0f32, f32::min)
}

/// Version whose finder spacing best matches `distance` at the given module pitch
fn estimate_version(distance: f32, module: f32) -> Result<Version, Rejection> {
    if module <= 0.0 {
        return Err(Rejection::Geometry("zero module size"));
    }
    let size = distance / module + 7.0;
    let number = ((size - 17.0) / 4.0).round();
    if !(1.0..=40.0).contains(&number) {
        return Err(Rejection::Geometry("implied version out of range"));
    }
    Version::new(number as u8).ok_or(Rejection::Geometry("implied version out of range"))
}

/// Affine grid-to-image map spanned by the three finder centres
struct CoarseGrid {
    origin: Point,
    x_axis: Point,
    y_axis: Point,
}

impl CoarseGrid {
    fn new(tl: Point, tr: Point, bl: Point, size: usize) -> Self {
        let span = (size - 7) as f32;
        Self {
            origin: tl,
            x_axis: (tr - tl) * (1.0 / span),
            y_axis: (bl - tl) * (1.0 / span),
        }
    }

    fn map(&self, grid: Point) -> Point {
        self.origin + self.x_axis * (grid.x - 3.5) + self.y_axis * (grid.y - 3.5)
    }
}

/// Rotates clockwise capstone corners so they line up with [`FINDER_LOCAL`] at `origin`
fn orient_corners(corners: &[Point; 4], origin: Point, coarse: &CoarseGrid) -> [Point; 4] {
    let predicted = FINDER_LOCAL.map(|local| coarse.map(local + origin));
    let rotation = (0..4)
        .min_by(|&a, &b| {
            let cost = |r: usize| -> f32 {
                (0..4)
                    .map(|q| corners[(q + r) % 4].distance_squared(&predicted[q]))
                    .sum()
            };
            cost(a).total_cmp(&cost(b))
        })
        .unwrap_or(0);
    std::array::from_fn(|q| corners[(q + rotation) % 4])
}
