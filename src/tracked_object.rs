//! Track struct for people maintained by the tracker.

use std::collections::VecDeque;
use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::detection::BBox;
use crate::filter::{Filter, FilterEnum};

/// Escalation level of a track, kept through short detection losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    #[default]
    Normal,
    #[serde(rename = "PREALERT")]
    PreAlert,
    Alert,
}

impl AlertLevel {
    pub fn is_escalated(&self) -> bool {
        *self != AlertLevel::Normal
    }
}

/// Externally visible state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackState {
    #[default]
    Normal,
    #[serde(rename = "PREALERT")]
    PreAlert,
    Alert,
    /// Missed, but still within the long-loss cap.
    LostShort,
    /// Missed beyond the long-loss cap; removed in the same tick.
    LostLong,
}

impl From<AlertLevel> for TrackState {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Normal => TrackState::Normal,
            AlertLevel::PreAlert => TrackState::PreAlert,
            AlertLevel::Alert => TrackState::Alert,
        }
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackState::Normal => "NORMAL",
            TrackState::PreAlert => "PREALERT",
            TrackState::Alert => "ALERT",
            TrackState::LostShort => "LOST_SHORT",
            TrackState::LostLong => "LOST_LONG",
        };
        f.write_str(name)
    }
}

/// Observed centroid at a tick timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CentroidSample {
    pub x: f64,
    pub y: f64,
    pub t: f64,
}

impl CentroidSample {
    pub fn new(centroid: Vector2<f64>, t: f64) -> Self {
        Self {
            x: centroid.x,
            y: centroid.y,
            t,
        }
    }
}

/// Allocates track identifiers.
///
/// Identifiers start at 1 and strictly increase until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct TrackIdAllocator {
    next: u64,
}

impl TrackIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of identifiers issued since creation or the last reset.
    pub fn issued_count(&self) -> u64 {
        self.next - 1
    }

    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl Default for TrackIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A person tracked across ticks.
pub struct Track {
    /// Unique identifier among live tracks.
    pub id: u64,

    /// Current box: the matched detection, or the prediction while missed.
    pub bbox: BBox,

    /// Exponentially smoothed detector confidence.
    pub score: f64,

    /// Posture-derived risk, decaying while no posture estimate is near.
    pub posture_risk: f64,

    /// Risk from being expected but not detected.
    pub absence_risk: f64,

    /// Effective risk: the larger of posture and absence risk.
    pub risk: f64,

    /// Externally visible state.
    pub state: TrackState,

    /// Escalation level, carried through LOST_SHORT.
    pub level: AlertLevel,

    /// Ticks since creation.
    pub age: u32,

    /// Consecutive ticks without a matching detection.
    pub missed: u32,

    /// Timestamp of the last detection match.
    pub last_seen: f64,

    /// Timestamp of entry into the current alert level.
    pub level_since: f64,

    /// Cached region-of-interest membership of the current centroid.
    pub in_roi: bool,

    /// Observed centroids, oldest first.
    pub history: VecDeque<CentroidSample>,

    pub(crate) history_capacity: usize,

    /// Timestamp of the last predict/update step.
    pub(crate) last_update: f64,

    /// Timestamp posture risk was last set or decayed.
    pub(crate) posture_at: f64,

    /// Start of the current risk-active dwell.
    pub(crate) risk_since: Option<f64>,

    /// Start of the current clear interval, for the recovery debounce.
    pub(crate) clear_since: Option<f64>,

    /// Since when every risk gate other than absence has held (ROI, strict posture floor).
    pub(crate) gate_since: Option<f64>,

    pub(crate) filter: FilterEnum,
}

impl fmt::Debug for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("bbox", &self.bbox)
            .field("score", &self.score)
            .field("posture_risk", &self.posture_risk)
            .field("absence_risk", &self.absence_risk)
            .field("risk", &self.risk)
            .field("state", &self.state)
            .field("level", &self.level)
            .field("age", &self.age)
            .field("missed", &self.missed)
            .field("last_seen", &self.last_seen)
            .field("level_since", &self.level_since)
            .field("in_roi", &self.in_roi)
            .field("history", &self.history.len())
            .field("risk_since", &self.risk_since)
            .field("clear_since", &self.clear_since)
            .field("gate_since", &self.gate_since)
            .field("filter", &"<Filter>")
            .finish()
    }
}

impl Track {
    /// Start a track from an unmatched detection at time `now`.
    pub(crate) fn new(
        id: u64,
        bbox: BBox,
        confidence: f64,
        now: f64,
        filter: FilterEnum,
        history_capacity: usize,
    ) -> Self {
        let history_capacity = history_capacity.max(1);
        let mut history = VecDeque::with_capacity(history_capacity);
        history.push_back(CentroidSample::new(bbox.centroid(), now));

        Self {
            id,
            bbox,
            score: confidence,
            posture_risk: 0.0,
            absence_risk: 0.0,
            risk: 0.0,
            state: TrackState::Normal,
            level: AlertLevel::Normal,
            age: 0,
            missed: 0,
            last_seen: now,
            level_since: now,
            in_roi: true,
            history,
            history_capacity,
            last_update: now,
            posture_at: now,
            risk_since: None,
            clear_since: None,
            gate_since: None,
            filter,
        }
    }

    pub fn centroid(&self) -> Vector2<f64> {
        self.bbox.centroid()
    }

    /// Smoothed velocity estimate (px/s).
    pub fn velocity(&self) -> Vector2<f64> {
        self.filter.velocity()
    }

    pub fn is_missed(&self) -> bool {
        self.missed > 0
    }

    /// Seconds since the last detection match.
    pub fn missed_secs(&self, now: f64) -> f64 {
        (now - self.last_seen).max(0.0)
    }

    /// Seconds the track has been continuously risk-active, if it is.
    pub fn dwell_secs(&self, now: f64) -> Option<f64> {
        self.risk_since.map(|since| (now - since).max(0.0))
    }

    /// Last observed centroid; the current centroid if history is empty.
    pub fn last_sample(&self) -> CentroidSample {
        self.history
            .back()
            .copied()
            .unwrap_or_else(|| CentroidSample::new(self.centroid(), self.last_update))
    }

    /// Append an observed centroid, evicting the oldest beyond capacity.
    pub(crate) fn push_history(&mut self, sample: CentroidSample) {
        self.history.push_back(sample);
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }

    /// Owned copy of the externally relevant fields.
    pub fn snapshot(&self) -> TrackSnapshot {
        let v = self.velocity();
        TrackSnapshot {
            id: self.id,
            bbox: self.bbox,
            state: self.state,
            level: self.level,
            age: self.age,
            risk: self.risk,
            posture_risk: self.posture_risk,
            score: self.score,
            velocity: [v.x, v.y],
            in_roi: self.in_roi,
            history: self.history.iter().copied().collect(),
        }
    }
}

/// Serializable view of a track for rendering and logging layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub id: u64,
    pub bbox: BBox,
    pub state: TrackState,
    pub level: AlertLevel,
    /// Ticks since creation.
    pub age: u32,
    pub risk: f64,
    pub posture_risk: f64,
    pub score: f64,
    pub velocity: [f64; 2],
    pub in_roi: bool,
    pub history: Vec<CentroidSample>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterFactoryEnum;

    fn track_at(x: f64, y: f64, capacity: usize) -> Track {
        let bbox = BBox::new(x, y, 10.0, 20.0);
        let filter = FilterFactoryEnum::default().create(bbox.centroid());
        Track::new(1, bbox, 0.9, 0.0, filter, capacity)
    }

    // ===== TrackIdAllocator tests =====

    #[test]
    fn test_allocator_sequential_ids() {
        let mut ids = TrackIdAllocator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
        assert_eq!(ids.issued_count(), 3);
    }

    #[test]
    fn test_allocator_reset_restarts() {
        let mut ids = TrackIdAllocator::new();
        ids.next_id();
        ids.next_id();
        ids.reset();
        assert_eq!(ids.issued_count(), 0);
        assert_eq!(ids.next_id(), 1);
    }

    // ===== Track tests =====

    #[test]
    fn test_track_new_defaults() {
        let t = track_at(0.0, 0.0, 5);
        assert_eq!(t.state, TrackState::Normal);
        assert_eq!(t.level, AlertLevel::Normal);
        assert_eq!(t.history.len(), 1);
        assert_eq!(t.last_sample(), CentroidSample { x: 5.0, y: 10.0, t: 0.0 });
        assert_eq!(t.risk, 0.0);
        assert!(t.dwell_secs(10.0).is_none());
        assert!(!t.is_missed());
    }

    #[test]
    fn test_track_history_bounded() {
        let mut t = track_at(0.0, 0.0, 3);
        for i in 1..=10 {
            t.push_history(CentroidSample { x: i as f64, y: 0.0, t: i as f64 });
            assert!(t.history.len() <= 3);
        }
        let xs: Vec<f64> = t.history.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_track_zero_capacity_keeps_one_sample() {
        let mut t = track_at(0.0, 0.0, 0);
        t.push_history(CentroidSample { x: 1.0, y: 1.0, t: 1.0 });
        assert_eq!(t.history.len(), 1);
        assert_eq!(t.last_sample().x, 1.0);
    }

    #[test]
    fn test_missed_secs_never_negative() {
        let t = track_at(0.0, 0.0, 3);
        assert_eq!(t.missed_secs(-5.0), 0.0);
        assert_eq!(t.missed_secs(2.5), 2.5);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(TrackState::LostShort.to_string(), "LOST_SHORT");
        assert_eq!(serde_json::to_value(TrackState::PreAlert).unwrap(), "PREALERT");
        assert_eq!(serde_json::to_value(TrackState::LostLong).unwrap(), "LOST_LONG");
        assert_eq!(TrackState::from(AlertLevel::Alert), TrackState::Alert);
    }

    #[test]
    fn test_snapshot_copies_fields() {
        let t = track_at(10.0, 10.0, 3);
        let s = t.snapshot();
        assert_eq!(s.id, 1);
        assert_eq!(s.bbox, t.bbox);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.velocity, [0.0, 0.0]);
        assert_eq!(s.age, 0);
    }
}
