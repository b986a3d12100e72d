//! Region-of-interest polygon in normalized frame coordinates.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::utils::{clamp_unit, point_in_polygon};

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when pixel positions can be normalized against this frame.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Pixel position to [0, 1] frame coordinates, if the frame is usable.
    pub fn normalize(&self, point: Vector2<f64>) -> Option<Vector2<f64>> {
        if !self.is_valid() {
            return None;
        }
        Some(Vector2::new(point.x / self.width, point.y / self.height))
    }
}

/// Polygon outside which tracks cannot escalate.
///
/// Vertices are normalized to [0, 1]; the region is active with at least
/// three usable vertices, otherwise the whole frame is eligible.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<[f64; 2]>", into = "Vec<[f64; 2]>")]
pub struct RegionOfInterest {
    points: Vec<[f64; 2]>,
}

impl RegionOfInterest {
    /// Build a region, dropping non-finite vertices and clamping the rest to [0, 1].
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        let points = points
            .into_iter()
            .filter(|p| p[0].is_finite() && p[1].is_finite())
            .map(|p| [clamp_unit(p[0]), clamp_unit(p[1])])
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn is_active(&self) -> bool {
        self.points.len() >= 3
    }

    /// Membership of a normalized point. Inactive regions contain everything.
    pub fn contains_normalized(&self, point: Vector2<f64>) -> bool {
        point_in_polygon(point, &self.points)
    }

    /// Membership of a pixel position, or None if `frame` cannot normalize it.
    pub fn contains_pixel(&self, point: Vector2<f64>, frame: FrameSize) -> Option<bool> {
        if !self.is_active() {
            return Some(true);
        }
        frame.normalize(point).map(|p| self.contains_normalized(p))
    }
}

impl From<Vec<[f64; 2]>> for RegionOfInterest {
    fn from(points: Vec<[f64; 2]>) -> Self {
        Self::new(points)
    }
}

impl From<RegionOfInterest> for Vec<[f64; 2]> {
    fn from(roi: RegionOfInterest) -> Self {
        roi.points
    }
}
