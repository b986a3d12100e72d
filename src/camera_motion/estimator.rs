//! Platform drift estimation by sparse block matching.

use std::collections::HashMap;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::roi::RegionOfInterest;
use crate::{Error, Result};

/// Single-channel 8-bit frame (row-major luminance samples).
#[derive(Debug, Clone, PartialEq)]
pub struct LumaFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl LumaFrame {
    /// Wrap a luminance buffer.
    ///
    /// # Errors
    /// `Error::InvalidFrame` when `data.len() != width * height` or the
    /// dimensions overflow.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let Some(len) = width.checked_mul(height) else {
            return Err(Error::InvalidFrame(format!("{}x{} frame is too large", width, height)));
        };
        if data.len() != len {
            return Err(Error::InvalidFrame(format!(
                "buffer length {} doesn't match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Build a frame by sampling `f(x, y)` at every pixel.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width.checked_mul(height).unwrap_or(0));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Apparent background motion in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriftVector {
    pub vx: f64,
    pub vy: f64,
}

impl DriftVector {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn magnitude(&self) -> f64 {
        self.vx.hypot(self.vy)
    }

    /// Non-finite components are treated as no drift.
    pub fn as_vector(&self) -> Vector2<f64> {
        if self.vx.is_finite() && self.vy.is_finite() {
            Vector2::new(self.vx, self.vy)
        } else {
            Vector2::zeros()
        }
    }
}

/// Result of one drift estimation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DriftEstimate {
    pub drift: DriftVector,
    /// Fraction of matched blocks agreeing with the consensus translation.
    pub support: f64,
    /// Number of blocks that took part in the vote.
    pub blocks_used: usize,
}

/// Estimates dominant background translation between two frames.
///
/// Blocks are sampled on a regular grid outside the exclusion region. Each
/// textured block is matched by minimum sum of absolute differences within
/// `search_radius`, the per-block translations are binned by `bin_size`, and
/// the most common bin wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftEstimator {
    /// Side of each sampled block (pixels).
    pub block_size: usize,
    /// Distance between sampled block origins (pixels).
    pub grid_step: usize,
    /// Largest translation searched in each axis (pixels).
    pub search_radius: usize,
    /// Granularity for translation bucketing before taking the mode.
    pub bin_size: f64,
    /// Minimum mean absolute deviation for a block to be matched.
    pub min_texture: f64,
}

impl Default for DriftEstimator {
    fn default() -> Self {
        Self {
            block_size: 16,
            grid_step: 48,
            search_radius: 8,
            bin_size: 1.0,
            min_texture: 4.0,
        }
    }
}

impl DriftEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate drift from `prev` to `curr`, which are `dt` seconds apart.
    ///
    /// Never fails: mismatched frames, non-positive `dt` or a lack of usable
    /// blocks all produce a zero estimate.
    pub fn estimate(
        &self,
        prev: &LumaFrame,
        curr: &LumaFrame,
        dt: f64,
        exclusion: Option<&RegionOfInterest>,
    ) -> DriftEstimate {
        if prev.width != curr.width || prev.height != curr.height || !(dt > 0.0) || self.block_size == 0 {
            return DriftEstimate::default();
        }

        let shifts = self.block_shifts(prev, curr, exclusion);
        if shifts.is_empty() {
            return DriftEstimate::default();
        }

        let bin = if self.bin_size > 0.0 { self.bin_size } else { 1.0 };
        let mut counts: HashMap<(i64, i64), usize> = HashMap::new();
        for &(dx, dy) in &shifts {
            let key = ((dx as f64 / bin).round() as i64, (dy as f64 / bin).round() as i64);
            *counts.entry(key).or_insert(0) += 1;
        }

        // Highest count wins; ties go to the smaller translation, then key order.
        let Some((&(kx, ky), &count)) = counts.iter().max_by(|a, b| {
            a.1.cmp(b.1)
                .then_with(|| (b.0 .0.abs() + b.0 .1.abs()).cmp(&(a.0 .0.abs() + a.0 .1.abs())))
                .then_with(|| b.0.cmp(a.0))
        }) else {
            return DriftEstimate::default();
        };

        let drift = DriftVector::new(kx as f64 * bin / dt, ky as f64 * bin / dt);
        let support = count as f64 / shifts.len() as f64;
        tracing::debug!(vx = drift.vx, vy = drift.vy, support, blocks = shifts.len(), "drift estimated");

        DriftEstimate {
            drift,
            support,
            blocks_used: shifts.len(),
        }
    }

    // Best integer translation of every usable block.
    fn block_shifts(
        &self,
        prev: &LumaFrame,
        curr: &LumaFrame,
        exclusion: Option<&RegionOfInterest>,
    ) -> Vec<(i64, i64)> {
        let b = self.block_size;
        let r = self.search_radius;
        let step = self.grid_step.max(1);
        let (w, h) = (prev.width, prev.height);

        let Some(span) = r.checked_mul(2).and_then(|d| d.checked_add(b)) else {
            return Vec::new();
        };
        if w < span || h < span {
            return Vec::new();
        }
        // Last block origins that leave room for the search window
        let (max_x, max_y) = (w - b - r, h - b - r);

        let mut shifts = Vec::new();
        let mut by = r;
        while by <= max_y {
            let mut bx = r;
            while bx <= max_x {
                let center = Vector2::new(
                    (bx as f64 + b as f64 / 2.0) / w as f64,
                    (by as f64 + b as f64 / 2.0) / h as f64,
                );
                let excluded = exclusion
                    .map(|roi| roi.is_active() && roi.contains_normalized(center))
                    .unwrap_or(false);

                if !excluded && self.texture(prev, bx, by) >= self.min_texture {
                    shifts.push(self.best_shift(prev, curr, bx, by));
                }
                bx = match bx.checked_add(step) {
                    Some(next) => next,
                    None => break,
                };
            }
            by = match by.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }
        shifts
    }

    fn texture(&self, frame: &LumaFrame, bx: usize, by: usize) -> f64 {
        let b = self.block_size;
        let n = (b * b) as f64;
        let mut sum = 0.0;
        for y in by..by + b {
            for x in bx..bx + b {
                sum += frame.at(x, y) as f64;
            }
        }
        let mean = sum / n;
        let mut dev = 0.0;
        for y in by..by + b {
            for x in bx..bx + b {
                dev += (frame.at(x, y) as f64 - mean).abs();
            }
        }
        dev / n
    }

    fn best_shift(&self, prev: &LumaFrame, curr: &LumaFrame, bx: usize, by: usize) -> (i64, i64) {
        let b = self.block_size;
        let r = self.search_radius as i64;
        let mut best = (u64::MAX, 0i64, 0i64);

        for dy in -r..=r {
            for dx in -r..=r {
                let ox = (bx as i64 + dx) as usize;
                let oy = (by as i64 + dy) as usize;
                let mut sad: u64 = 0;
                for y in 0..b {
                    for x in 0..b {
                        let p = prev.at(bx + x, by + y) as i64;
                        let c = curr.at(ox + x, oy + y) as i64;
                        sad += (p - c).unsigned_abs();
                    }
                    if sad > best.0 {
                        break;
                    }
                }
                let closer = dx.abs() + dy.abs() < best.1.abs() + best.2.abs();
                if sad < best.0 || (sad == best.0 && closer) {
                    best = (sad, dx, dy);
                }
            }
        }
        (best.1, best.2)
    }
}
