/// Geometry utilities for perspective transformations
use crate::models::Point;

/// Projective transform (3x3 homography, row-major, `m[2][2]` normalised to 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    m: [[f64; 3]; 3],
}

impl PerspectiveTransform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Create transform mapping 4 source points exactly onto 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let pairs: Vec<(Point, Point)> = src.iter().copied().zip(dst.iter().copied()).collect();
        Self::fit(&pairs)
    }

    /// Least-squares fit over any number (>= 4) of correspondences.
    ///
    /// Both point sets are normalised (centroid at the origin, mean distance
    /// sqrt(2)) before solving so the normal equations stay well conditioned.
    /// Returns `None` for degenerate configurations.
    pub fn fit(pairs: &[(Point, Point)]) -> Option<Self> {
        if pairs.len() < 4 {
            return None;
        }
        let src_norm = Normalisation::of(pairs.iter().map(|p| p.0))?;
        let dst_norm = Normalisation::of(pairs.iter().map(|p| p.1))?;

        let mut ata = [[0.0f64; 8]; 8];
        let mut atb = [0.0f64; 8];
        for (s, d) in pairs {
            let (sx, sy) = src_norm.apply(s);
            let (dx, dy) = dst_norm.apply(d);
            let rows = [
                ([sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy], dx),
                ([0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy], dy),
            ];
            for (row, rhs) in rows {
                for i in 0..8 {
                    atb[i] += row[i] * rhs;
                    for j in 0..8 {
                        ata[i][j] += row[i] * row[j];
                    }
                }
            }
        }

        let h = solve_linear_system(ata, atb)?;
        let normalised = [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]];
        let m = mul3(&mul3(&dst_norm.inverse(), &normalised), &src_norm.matrix());
        Self::from_matrix(m)
    }

    fn from_matrix(m: [[f64; 3]; 3]) -> Option<Self> {
        let scale = m[2][2];
        if !scale.is_finite() || scale.abs() < 1e-12 {
            return None;
        }
        let mut out = [[0.0; 3]; 3];
        for (r, row) in m.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                out[r][c] = v / scale;
                if !out[r][c].is_finite() {
                    return None;
                }
            }
        }
        let det = det3(&out);
        if det.abs() < 1e-12 {
            return None;
        }
        Some(Self { m: out })
    }

    /// Transform a point using this perspective matrix.
    ///
    /// Points on the line at infinity come back non-finite.
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let m = &self.m;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w.abs() < 1e-12 {
            return Point::new(f32::NAN, f32::NAN);
        }
        Point::new(
            ((m[0][0] * x + m[0][1] * y + m[0][2]) / w) as f32,
            ((m[1][0] * x + m[1][1] * y + m[1][2]) / w) as f32,
        )
    }

    /// Image-space displacement of one unit step along x and along y at `p`
    pub fn unit_axes(&self, p: &Point) -> (Point, Point) {
        let origin = self.transform(p);
        let ex = self.transform(&Point::new(p.x + 1.0, p.y)) - origin;
        let ey = self.transform(&Point::new(p.x, p.y + 1.0)) - origin;
        (ex, ey)
    }
}

/// Similarity taking a point cloud to zero mean and mean radius sqrt(2)
struct Normalisation {
    cx: f64,
    cy: f64,
    scale: f64,
}

impl Normalisation {
    fn of(points: impl Iterator<Item = Point> + Clone) -> Option<Self> {
        let n = points.clone().count() as f64;
        let (sx, sy) = points
            .clone()
            .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x as f64, ay + p.y as f64));
        let (cx, cy) = (sx / n, sy / n);
        let mean_dist = points
            .map(|p| ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt())
            .sum::<f64>()
            / n;
        if mean_dist.is_nan() || mean_dist <= 1e-9 {
            return None;
        }
        Some(Self {
            cx,
            cy,
            scale: std::f64::consts::SQRT_2 / mean_dist,
        })
    }

    fn apply(&self, p: &Point) -> (f64, f64) {
        (
            (p.x as f64 - self.cx) * self.scale,
            (p.y as f64 - self.cy) * self.scale,
        )
    }

    fn matrix(&self) -> [[f64; 3]; 3] {
        let s = self.scale;
        [
            [s, 0.0, -s * self.cx],
            [0.0, s, -s * self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    fn inverse(&self) -> [[f64; 3]; 3] {
        let s = 1.0 / self.scale;
        [[s, 0.0, self.cx], [0.0, s, self.cy], [0.0, 0.0, 1.0]]
    }
}

fn mul3(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            out[r][c] = (0..3).map(|k| a[r][k] * b[k][c]).sum();
        }
    }
    out
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Solve 8x8 linear system using Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    let n = 8;

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > a[max_row][i].abs() {
                max_row = k;
            }
        }
        if a[max_row][i].abs() < 1e-12 {
            return None;
        }
        a.swap(i, max_row);
        b.swap(i, max_row);

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point, tol: f32) {
        assert!(a.distance(&b) < tol, "{a:?} != {b:?}");
    }

    #[test]
    fn test_exact_four_point() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(21.0, 0.0),
            Point::new(21.0, 21.0),
            Point::new(0.0, 21.0),
        ];
        let dst = [
            Point::new(100.0, 120.0),
            Point::new(310.0, 95.0),
            Point::new(330.0, 300.0),
            Point::new(90.0, 320.0),
        ];
        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(t.transform(s), *d, 1e-3);
        }
    }

    #[test]
    fn test_least_squares_recovers_homography() {
        let truth = PerspectiveTransform {
            m: [[9.5, 1.2, 40.0], [-0.8, 10.3, 55.0], [0.0009, -0.0012, 1.0]],
        };
        let pairs: Vec<(Point, Point)> = (0..6)
            .flat_map(|i| (0..5).map(move |j| Point::new(i as f32 * 9.0, j as f32 * 11.0)))
            .map(|p| (p, truth.transform(&p)))
            .collect();
        let fitted = PerspectiveTransform::fit(&pairs).unwrap();
        for (s, d) in &pairs {
            assert_close(fitted.transform(s), *d, 1e-2);
        }
    }

    #[test]
    fn test_degenerate_input() {
        let collinear: Vec<(Point, Point)> = (0..5)
            .map(|i| {
                let p = Point::new(i as f32, i as f32);
                (p, p)
            })
            .collect();
        assert!(PerspectiveTransform::fit(&collinear).is_none());
        assert!(PerspectiveTransform::fit(&collinear[..3]).is_none());
    }

    #[test]
    fn test_unit_axes() {
        let t = PerspectiveTransform::identity();
        let (ex, ey) = t.unit_axes(&Point::new(3.0, 4.0));
        assert_close(ex, Point::new(1.0, 0.0), 1e-6);
        assert_close(ey, Point::new(0.0, 1.0), 1e-6);
    }
}
