//! Connected-component labeling of black pixels.
//!
//! Components are 4-connected and filled span by span from an explicit stack, so
//! each pixel is labeled exactly once and the per-region statistics (bounding box,
//! pixel count, coordinate sums) are accumulated during the fill. Labels follow the
//! raster order of each component's first pixel.

use crate::models::{BitMatrix, Point};

/// A connected black component
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Label id, 1-based (0 marks white pixels in the label map)
    pub label: u32,
    /// Leftmost column
    pub min_x: usize,
    /// Topmost row
    pub min_y: usize,
    /// Rightmost column
    pub max_x: usize,
    /// Bottom row
    pub max_y: usize,
    /// Number of pixels
    pub pixel_count: usize,
    sum_x: u64,
    sum_y: u64,
}

impl Region {
    fn new(label: u32, x: usize, y: usize) -> Self {
        Self {
            label,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            pixel_count: 0,
            sum_x: 0,
            sum_y: 0,
        }
    }

    /// Account for the horizontal run `left..=right` on row `y`
    fn add_span(&mut self, left: usize, right: usize, y: usize) {
        let len = right - left + 1;
        self.min_x = self.min_x.min(left);
        self.max_x = self.max_x.max(right);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self.pixel_count += len;
        self.sum_x += ((left + right) * len / 2) as u64;
        self.sum_y += (y * len) as u64;
    }

    /// Bounding box width in pixels
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    /// Bounding box height in pixels
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Mean pixel position (pixel centres at +0.5)
    pub fn centroid(&self) -> Point {
        let n = self.pixel_count.max(1) as f64;
        Point::new(
            (self.sum_x as f64 / n + 0.5) as f32,
            (self.sum_y as f64 / n + 0.5) as f32,
        )
    }
}

/// Label map plus statistics for every component
#[derive(Debug, Clone)]
pub struct RegionMap {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    regions: Vec<Region>,
    min_pixels: usize,
}

impl RegionMap {
    /// Label all black components of `binary`
    pub fn label(binary: &BitMatrix, min_pixels: usize) -> Self {
        let width = binary.width();
        let height = binary.height();
        let mut labels = vec![0u32; width * height];
        let mut regions = Vec::new();
        let mut stack = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if labels[y * width + x] != 0 || !binary.get(x, y) {
                    continue;
                }
                let label = regions.len() as u32 + 1;
                let mut region = Region::new(label, x, y);
                stack.push((x, y));
                while let Some((sx, sy)) = stack.pop() {
                    fill_span(binary, &mut labels, &mut region, &mut stack, sx, sy);
                }
                regions.push(region);
            }
        }

        Self {
            width,
            height,
            labels,
            regions,
            min_pixels,
        }
    }

    /// Label at (x, y), 0 for white or out of range
    #[inline]
    pub fn label_at(&self, x: isize, y: isize) -> u32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0;
        }
        self.labels[y as usize * self.width + x as usize]
    }

    /// Statistics of any labeled region, including ones below the noise floor
    pub fn region(&self, label: u32) -> Option<&Region> {
        label
            .checked_sub(1)
            .and_then(|i| self.regions.get(i as usize))
    }

    /// Regions at or above the noise floor, in label order
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        let min = self.min_pixels;
        self.regions.iter().filter(move |r| r.pixel_count >= min)
    }

    /// Number of components, noise included
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// True when the bitmap had no black pixels
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Pixels carrying `label` inside the region's bounding box
    pub fn pixels(&self, label: u32) -> impl Iterator<Item = (usize, usize)> + '_ {
        let bounds = self
            .region(label)
            .map(|r| (r.min_x, r.min_y, r.max_x, r.max_y));
        bounds.into_iter().flat_map(move |(x0, y0, x1, y1)| {
            (y0..=y1).flat_map(move |y| {
                (x0..=x1)
                    .filter(move |&x| self.labels[y * self.width + x] == label)
                    .map(move |x| (x, y))
            })
        })
    }
}

/// Label the run through (x, y) and queue seeds for the rows above and below
fn fill_span(
    binary: &BitMatrix,
    labels: &mut [u32],
    region: &mut Region,
    stack: &mut Vec<(usize, usize)>,
    x: usize,
    y: usize,
) {
    let width = binary.width();
    let open = |labels: &[u32], x: usize, y: usize| labels[y * width + x] == 0 && binary.get(x, y);
    if !open(labels, x, y) {
        return;
    }

    let mut left = x;
    while left > 0 && open(labels, left - 1, y) {
        left -= 1;
    }
    let mut right = x;
    while right + 1 < width && open(labels, right + 1, y) {
        right += 1;
    }

    labels[y * width + left..=y * width + right].fill(region.label);
    region.add_span(left, right, y);

    let neighbours = [y.checked_sub(1), Some(y + 1).filter(|&ny| ny < binary.height())];
    for ny in neighbours.into_iter().flatten() {
        let mut in_run = false;
        for nx in left..=right {
            if open(labels, nx, ny) {
                if !in_run {
                    stack.push((nx, ny));
                    in_run = true;
                }
            } else {
                in_run = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(rows: &[&str]) -> BitMatrix {
        let mut m = BitMatrix::new(rows[0].len(), rows.len());
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                m.set(x, y, c == '#');
            }
        }
        m
    }

    #[test]
    fn test_labels_in_raster_order() {
        let m = bitmap(&[
            "....##", //
            "##..##", //
            "##....", //
            "......", //
            "..#...",
        ]);
        let map = RegionMap::label(&m, 1);
        assert_eq!(map.len(), 3);
        assert_eq!(map.label_at(4, 0), 1);
        assert_eq!(map.label_at(0, 1), 2);
        assert_eq!(map.label_at(2, 4), 3);
        assert_eq!(map.label_at(2, 2), 0);
        let r = map.region(2).unwrap();
        assert_eq!((r.min_x, r.min_y, r.max_x, r.max_y), (0, 1, 1, 2));
        assert_eq!(r.pixel_count, 4);
        assert_eq!(r.centroid(), Point::new(1.0, 2.0));
    }

    #[test]
    fn test_four_connectivity_and_concave_shapes() {
        let m = bitmap(&[
            "#.#..", //
            ".#...", //
            ".....", //
            "#...#", //
            "#.#.#", //
            "#####",
        ]);
        let map = RegionMap::label(&m, 1);
        // Diagonal neighbours stay separate; the U shape is one component
        assert_ne!(map.label_at(0, 0), map.label_at(1, 1));
        assert_ne!(map.label_at(1, 1), map.label_at(2, 0));
        let u = map.label_at(0, 3);
        assert_eq!(map.label_at(4, 3), u);
        assert_eq!(map.label_at(2, 4), u);
        assert_eq!(map.region(u).unwrap().pixel_count, 10);
        assert_eq!(map.pixels(u).count(), 10);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_noise_floor() {
        let m = bitmap(&[
            "#....", //
            "..###", //
            "..###",
        ]);
        let map = RegionMap::label(&m, 2);
        let kept: Vec<u32> = map.regions().map(|r| r.label).collect();
        assert_eq!(kept, vec![2]);
        // Small regions remain addressable
        assert_eq!(map.region(1).unwrap().pixel_count, 1);
        assert!(map.region(0).is_none());
        assert!(map.region(9).is_none());
    }
}
