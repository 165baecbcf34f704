//! Timing pattern reading between finder patterns.
//!
//! The line from the inner corner module of one finder to the facing module of
//! the next crosses a half-module of finder, a white separator, the alternating
//! timing modules, another separator and a half-module of the other finder. The
//! number of interior runs fixes the symbol size: `size = interior + 14`.

use crate::models::{BitMatrix, Point, Version};

/// Sampling step along the line, in pixels
const STEP: f32 = 0.5;
/// Runs shorter than this fraction of a module are treated as noise
const MIN_RUN_MODULES: f32 = 0.35;

/// A colour run along a timing line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Run {
    /// True for black
    pub black: bool,
    /// Distance of the run start from the line origin, in pixels
    pub start: f32,
    /// Run length in pixels
    pub len: f32,
}

/// Runs read along one timing line
#[derive(Debug, Clone)]
pub struct TimingLine {
    origin: Point,
    direction: Point,
    runs: Vec<Run>,
}

impl TimingLine {
    /// Scan the bitmap from `start` to `end`, merging runs shorter than a fraction of `module`
    pub fn scan(binary: &BitMatrix, start: Point, end: Point, module: f32) -> Option<Self> {
        let delta = end - start;
        let length = delta.norm();
        if !length.is_finite() || length < 2.0 {
            return None;
        }
        let direction = delta * (1.0 / length);
        let steps = (length / STEP).ceil() as usize;

        let mut runs: Vec<Run> = Vec::new();
        for i in 0..=steps {
            let t = (i as f32 * STEP).min(length);
            let p = start + direction * t;
            let black = binary.get_signed(p.x.floor() as isize, p.y.floor() as isize);
            match runs.last_mut() {
                Some(run) if run.black == black => run.len = t - run.start + STEP,
                _ => runs.push(Run {
                    black,
                    start: t,
                    len: STEP,
                }),
            }
        }

        let min_len = MIN_RUN_MODULES * module;
        merge_short_runs(&mut runs, min_len);
        trim_ends(&mut runs, min_len);

        let framed = runs.len() >= 3
            && runs.first().is_some_and(|r| r.black)
            && runs.last().is_some_and(|r| r.black);
        framed.then_some(Self {
            origin: start,
            direction,
            runs,
        })
    }

    /// Runs between the two finder halves
    pub fn interior(&self) -> &[Run] {
        &self.runs[1..self.runs.len() - 1]
    }

    /// Symbol size implied by the run count, snapped to a valid version
    pub fn version(&self) -> Option<Version> {
        let size = self.interior().len() as f32 + 14.0;
        let number = ((size - 17.0) / 4.0).round();
        if !(1.0..=40.0).contains(&number) {
            return None;
        }
        Version::new(number as u8)
    }

    /// Image position of each interior run centre
    pub fn centres(&self) -> impl Iterator<Item = Point> + '_ {
        self.interior()
            .iter()
            .map(|run| self.origin + self.direction * (run.start + run.len / 2.0))
    }
}

/// Folds every too-short interior run together with both neighbours
fn merge_short_runs(runs: &mut Vec<Run>, min_len: f32) {
    while runs.len() >= 3 {
        let Some(i) = (1..runs.len() - 1).find(|&i| runs[i].len < min_len) else {
            break;
        };
        let merged = runs[i - 1].len + runs[i].len + runs[i + 1].len;
        runs[i - 1].len = merged;
        runs.drain(i..=i + 1);
    }
}

/// Drops short white runs at either end (the scan started on a module edge)
fn trim_ends(runs: &mut Vec<Run>, min_len: f32) {
    if runs.len() > 1 && !runs[0].black && runs[0].len < min_len {
        runs.remove(0);
    }
    if runs.len() > 1 {
        let last = runs.len() - 1;
        if !runs[last].black && runs[last].len < min_len {
            runs.pop();
        }
    }
}
