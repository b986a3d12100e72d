//! Per-frame inputs to the tracker: detector boxes and posture estimates.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::utils::{clamp_unit, get_bounding_box};

/// Minimum keypoint score for a keypoint to count towards a posture box.
pub const KEYPOINT_SCORE_THRESHOLD: f64 = 0.2;

/// Posture boxes overlapping a detector box by more than this are duplicates.
pub const POSTURE_BOX_OVERLAP: f64 = 0.3;

/// Confidence assigned to detections synthesized from posture boxes.
pub const POSTURE_BOX_CONFIDENCE: f64 = 0.5;

/// Axis-aligned bounding box in frame pixel coordinates (top-left + size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Box from min/max corners.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn centroid(&self) -> Vector2<f64> {
        Vector2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Finite coordinates and strictly positive area.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite()) && self.w > 0.0 && self.h > 0.0
    }

    /// Same size, moved by `offset`.
    pub fn translated(&self, offset: Vector2<f64>) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.w, self.h)
    }

    /// Intersection over union. Degenerate boxes overlap nothing.
    pub fn iou(&self, other: &BBox) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;

        if union > 0.0 && inter.is_finite() {
            inter / union
        } else {
            0.0
        }
    }
}

/// A person detection for a single frame.
///
/// Detections are borrowed by the tracker for one tick and never retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    /// Detector confidence; clamped to [0, 1] on construction.
    pub confidence: f64,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f64) -> Self {
        Self {
            bbox,
            confidence: clamp_unit(confidence),
        }
    }

    /// Create a detection from `[x, y, w, h]`, the layout most detectors emit.
    pub fn from_xywh(xywh: [f64; 4], confidence: f64) -> Self {
        Self::new(BBox::new(xywh[0], xywh[1], xywh[2], xywh[3]), confidence)
    }

    pub fn centroid(&self) -> Vector2<f64> {
        self.bbox.centroid()
    }
}

/// A single pose keypoint in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, score: f64) -> Self {
        Self { x, y, score }
    }
}

/// Posture-derived risk for one person, positioned for centroid matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureEstimate {
    /// Position used for nearest-centroid association (pixels).
    pub centroid: [f64; 2],
    /// Risk scalar computed by the posture collaborator; clamped to [0, 1].
    pub risk: f64,
    /// Box spanned by the confident keypoints, when built from keypoints.
    pub bbox: Option<BBox>,
}

impl PostureEstimate {
    pub fn new(centroid: [f64; 2], risk: f64) -> Self {
        Self {
            centroid,
            risk: clamp_unit(risk),
            bbox: None,
        }
    }

    /// Build an estimate from raw keypoints.
    ///
    /// Only keypoints scoring above [`KEYPOINT_SCORE_THRESHOLD`] are used;
    /// at least two are required, otherwise there is no usable position.
    pub fn from_keypoints(keypoints: &[Keypoint], risk: f64) -> Option<Self> {
        let confident: Vec<Vector2<f64>> = keypoints
            .iter()
            .filter(|k| k.score > KEYPOINT_SCORE_THRESHOLD && k.x.is_finite() && k.y.is_finite())
            .map(|k| Vector2::new(k.x, k.y))
            .collect();

        if confident.len() < 2 {
            return None;
        }

        let (x1, y1, x2, y2) = get_bounding_box(confident)?;
        let bbox = BBox::from_corners(x1, y1, x2, y2);
        let c = bbox.centroid();
        Some(Self {
            centroid: [c.x, c.y],
            risk: clamp_unit(risk),
            bbox: Some(bbox),
        })
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.centroid[0], self.centroid[1])
    }

    pub fn is_valid(&self) -> bool {
        self.centroid.iter().all(|v| v.is_finite())
    }
}

/// Add posture boxes the detector missed to the detection list.
///
/// A posture box is kept unless it overlaps some detector box by more than
/// [`POSTURE_BOX_OVERLAP`]; kept boxes become detections with
/// [`POSTURE_BOX_CONFIDENCE`]. Detector boxes come first in the output.
pub fn merge_posture_boxes(detections: &[Detection], postures: &[PostureEstimate]) -> Vec<Detection> {
    let mut merged = detections.to_vec();

    for bbox in postures.iter().filter_map(|p| p.bbox) {
        if !bbox.is_valid() {
            continue;
        }
        let duplicate = detections
            .iter()
            .any(|d| bbox.iou(&d.bbox) > POSTURE_BOX_OVERLAP);
        if !duplicate {
            merged.push(Detection::new(bbox, POSTURE_BOX_CONFIDENCE));
        }
    }

    merged
}
