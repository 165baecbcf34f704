//! Cell-based adaptive thresholding.
//!
//! The image is cut into square cells. Each cell gets a threshold from its mean
//! (read off an integral image), low-contrast cells inherit from the cells above
//! and to the left, thresholds are box-averaged over a 5x5 cell neighbourhood and
//! finally interpolated bilinearly between cell centres for every pixel.

use crate::config::DecoderConfig;
use crate::models::{BitMatrix, RasterImage};
use rayon::prelude::*;

/// Half-width of the cell neighbourhood used to smooth thresholds
const SMOOTH_RADIUS: usize = 2;

/// Convert a grayscale raster to a bitmap (true = black) with local thresholds
pub fn adaptive_binarize(image: &RasterImage, config: &DecoderConfig) -> BitMatrix {
    let width = image.width();
    let height = image.height();
    let mut binary = BitMatrix::new(width, height);
    if width == 0 || height == 0 {
        return binary;
    }

    let grid = CellGrid::new(image, config.cell_size.max(2), config.min_contrast);
    let columns = grid.column_weights(width);
    let bias = config.threshold_bias as f32;
    let stride = binary.stride();

    let fill_row = |(y, words): (usize, &mut [u32])| {
        let row_thresholds = grid.row_thresholds(y, height);
        for (x, &sample) in image.row(y).iter().enumerate() {
            let (x0, x1, wx) = columns[x];
            let threshold = row_thresholds[x0] + (row_thresholds[x1] - row_thresholds[x0]) * wx;
            if (sample as f32) < threshold - bias {
                words[x / 32] |= 1 << (x % 32);
            }
        }
    };

    if config.parallel {
        binary
            .words_mut()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(fill_row);
    } else {
        binary
            .words_mut()
            .chunks_mut(stride)
            .enumerate()
            .for_each(fill_row);
    }

    binary
}

/// Summed-area table with one extra leading row and column of zeros
pub(crate) struct IntegralImage {
    width: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    pub(crate) fn new(image: &RasterImage) -> Self {
        let width = image.width() + 1;
        let mut sums = vec![0u64; width * (image.height() + 1)];
        for y in 0..image.height() {
            let mut row_sum = 0u64;
            for (x, &sample) in image.row(y).iter().enumerate() {
                row_sum += sample as u64;
                sums[(y + 1) * width + x + 1] = sums[y * width + x + 1] + row_sum;
            }
        }
        Self { width, sums }
    }

    /// Sum over the half-open rectangle [x0, x1) x [y0, y1)
    pub(crate) fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let w = self.width;
        self.sums[y1 * w + x1] + self.sums[y0 * w + x0]
            - self.sums[y0 * w + x1]
            - self.sums[y1 * w + x0]
    }
}

struct CellGrid {
    cell: usize,
    cols: usize,
    rows: usize,
    thresholds: Vec<f32>,
}

impl CellGrid {
    fn new(image: &RasterImage, cell: usize, min_contrast: u8) -> Self {
        let cols = image.width().div_ceil(cell);
        let rows = image.height().div_ceil(cell);
        let integral = IntegralImage::new(image);
        let mut raw = vec![0f32; cols * rows];

        for cy in 0..rows {
            let y0 = cy * cell;
            let y1 = (y0 + cell).min(image.height());
            for cx in 0..cols {
                let x0 = cx * cell;
                let x1 = (x0 + cell).min(image.width());
                let (lo, hi) = cell_range(image, x0, y0, x1, y1);
                let area = ((x1 - x0) * (y1 - y0)) as f32;
                let mean = integral.sum(x0, y0, x1, y1) as f32 / area;

                raw[cy * cols + cx] = if hi - lo >= min_contrast {
                    mean
                } else {
                    // Flat cell: white unless darker than what surrounds it
                    let own = lo as f32 / 2.0;
                    match inherited_threshold(&raw, cols, cx, cy) {
                        Some(neighbour) if (lo as f32) < neighbour => neighbour,
                        _ => own,
                    }
                };
            }
        }

        let thresholds = box_average(&raw, cols, rows, SMOOTH_RADIUS);
        Self {
            cell,
            cols,
            rows,
            thresholds,
        }
    }

    /// Per-pixel column of (left cell, right cell, weight of right cell)
    fn column_weights(&self, width: usize) -> Vec<(usize, usize, f32)> {
        (0..width)
            .map(|x| interpolation_span(x, self.cell, self.cols))
            .collect()
    }

    /// Thresholds of every cell column, interpolated vertically at pixel row `y`
    fn row_thresholds(&self, y: usize, height: usize) -> Vec<f32> {
        debug_assert!(y < height);
        let (r0, r1, wy) = interpolation_span(y, self.cell, self.rows);
        let top = &self.thresholds[r0 * self.cols..(r0 + 1) * self.cols];
        let bottom = &self.thresholds[r1 * self.cols..(r1 + 1) * self.cols];
        top.iter()
            .zip(bottom)
            .map(|(&t, &b)| t + (b - t) * wy)
            .collect()
    }
}

fn cell_range(image: &RasterImage, x0: usize, y0: usize, x1: usize, y1: usize) -> (u8, u8) {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for y in y0..y1 {
        for &sample in &image.row(y)[x0..x1] {
            lo = lo.min(sample);
            hi = hi.max(sample);
        }
    }
    (lo, hi)
}

/// Weighted average of the already computed cells above, left and above-left
fn inherited_threshold(raw: &[f32], cols: usize, cx: usize, cy: usize) -> Option<f32> {
    let up = (cy > 0).then(|| raw[(cy - 1) * cols + cx]);
    let left = (cx > 0).then(|| raw[cy * cols + cx - 1]);
    let up_left = (cx > 0 && cy > 0).then(|| raw[(cy - 1) * cols + cx - 1]);
    match (up, left, up_left) {
        (Some(u), Some(l), Some(ul)) => Some((u + 2.0 * l + ul) / 4.0),
        (Some(u), None, _) => Some(u),
        (None, Some(l), _) => Some(l),
        _ => None,
    }
}

/// Mean over a (2r+1)^2 window clipped to the grid, via a summed-area table
fn box_average(values: &[f32], cols: usize, rows: usize, radius: usize) -> Vec<f32> {
    let w = cols + 1;
    let mut sums = vec![0f64; w * (rows + 1)];
    for y in 0..rows {
        let mut row_sum = 0f64;
        for x in 0..cols {
            row_sum += values[y * cols + x] as f64;
            sums[(y + 1) * w + x + 1] = sums[y * w + x + 1] + row_sum;
        }
    }

    let mut out = vec![0f32; cols * rows];
    for y in 0..rows {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius + 1).min(rows);
        for x in 0..cols {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius + 1).min(cols);
            let total =
                sums[y1 * w + x1] + sums[y0 * w + x0] - sums[y0 * w + x1] - sums[y1 * w + x0];
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            out[y * cols + x] = (total / count) as f32;
        }
    }
    out
}

/// Cells bracketing pixel `p` and the weight of the second, measured between cell centres
fn interpolation_span(p: usize, cell: usize, count: usize) -> (usize, usize, f32) {
    let pos = (p as f32 + 0.5) / cell as f32 - 0.5;
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let c0 = (pos.floor() as usize).min(count - 1);
    let c1 = (c0 + 1).min(count - 1);
    (c0, c1, pos - c0 as f32)
}
