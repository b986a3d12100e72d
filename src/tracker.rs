//! Main tracker implementation.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alert::{self, AlertParams, Thresholds};
use crate::camera_motion::DriftVector;
use crate::detection::{BBox, Detection, PostureEstimate};
use crate::events::{Event, EventBus};
use crate::filter::{Filter, FilterFactoryEnum};
use crate::matching::{get_unmatched, iou_matrix, match_by_overlap};
use crate::risk::RiskFusion;
use crate::roi::FrameSize;
use crate::tracked_object::{AlertLevel, CentroidSample, Track, TrackIdAllocator, TrackSnapshot, TrackState};
use crate::utils::{ema, warn_once};
use crate::{Error, Result};

/// Smoothing factor for the per-track detector score.
const SCORE_ALPHA: f64 = 0.5;

/// Configuration for the tracker.
///
/// Fixed for the tracker's lifetime; per-tick escalation settings live in
/// [`AlertParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// IoU a detection must exceed to match a predicted track box.
    pub iou_threshold: f64,

    /// Minimum confidence for an unmatched detection to start a track.
    pub min_confidence: f64,

    /// Missed duration at which absence risk saturates (seconds).
    pub short_loss_secs: f64,

    /// Missed duration beyond which a track is removed (seconds).
    pub long_loss_secs: f64,

    /// Centroid samples kept per track.
    pub history_capacity: usize,

    /// Motion model for new tracks.
    pub filter_factory: FilterFactoryEnum,

    /// Maximum centroid distance for posture association (pixels).
    pub posture_match_distance: f64,

    /// Half-life of unmatched posture risk (seconds).
    pub posture_half_life_secs: f64,

    /// Continuous clear time before an escalated track recovers (seconds).
    pub debounce_secs: f64,

    /// Effective risk at or above which a track is risk-active.
    pub risk_threshold: f64,

    /// Posture risk required in strict ensemble mode.
    pub posture_floor: f64,

    /// Smoothed score below which a detection is weak in strict ensemble mode.
    pub weak_detection_score: f64,

    /// Sea-state sensitivity of the dwell thresholds.
    pub sea_state_gain: f64,
}

impl TrackerConfig {
    /// Create a configuration with default tuning.
    pub fn new() -> Self {
        Self {
            iou_threshold: 0.3,
            min_confidence: 0.5,
            short_loss_secs: 2.0,
            long_loss_secs: 5.0,
            history_capacity: 30,
            filter_factory: FilterFactoryEnum::default(),
            posture_match_distance: 150.0,
            posture_half_life_secs: 2.0,
            debounce_secs: 1.5,
            risk_threshold: 0.5,
            posture_floor: 0.2,
            weak_detection_score: 0.5,
            sea_state_gain: 0.15,
        }
    }

    fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be in [0, 1], got {v}")))
            }
        };
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be a non-negative number, got {v}")))
            }
        };

        unit("iou_threshold", self.iou_threshold)?;
        unit("min_confidence", self.min_confidence)?;
        unit("risk_threshold", self.risk_threshold)?;
        unit("posture_floor", self.posture_floor)?;
        unit("weak_detection_score", self.weak_detection_score)?;
        non_negative("long_loss_secs", self.long_loss_secs)?;
        non_negative("posture_match_distance", self.posture_match_distance)?;
        non_negative("debounce_secs", self.debounce_secs)?;
        non_negative("sea_state_gain", self.sea_state_gain)?;

        if !(self.short_loss_secs.is_finite() && self.short_loss_secs > 0.0) {
            return Err(Error::InvalidConfig("short_loss_secs must be positive".to_string()));
        }
        if self.long_loss_secs < self.short_loss_secs {
            return Err(Error::InvalidConfig(
                "long_loss_secs must not be less than short_loss_secs".to_string(),
            ));
        }
        if !(self.posture_half_life_secs.is_finite() && self.posture_half_life_secs > 0.0) {
            return Err(Error::InvalidConfig("posture_half_life_secs must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(Error::InvalidConfig("history_capacity must be at least 1".to_string()));
        }
        if let FilterFactoryEnum::Ema { alpha } = self.filter_factory {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::InvalidConfig(format!("filter alpha must be in (0, 1], got {alpha}")));
            }
        }
        Ok(())
    }

    fn risk_fusion(&self) -> RiskFusion {
        RiskFusion {
            posture_match_distance: self.posture_match_distance,
            posture_half_life_secs: self.posture_half_life_secs,
            short_loss_secs: self.short_loss_secs,
            risk_threshold: self.risk_threshold,
            posture_floor: self.posture_floor,
            weak_detection_score: self.weak_detection_score,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Detector output and frame context for one tick.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    /// Tick time in seconds, from the caller's clock.
    pub timestamp: f64,
    /// Frame dimensions, used to normalize positions against the ROI.
    pub frame_size: FrameSize,
    /// Person detections for this frame.
    pub detections: &'a [Detection],
    /// Platform drift in px/s, from a [`DriftEstimator`](crate::camera_motion::DriftEstimator).
    pub drift: DriftVector,
}

impl<'a> Observation<'a> {
    /// Observation without platform drift.
    pub fn new(timestamp: f64, frame_size: FrameSize, detections: &'a [Detection]) -> Self {
        Self {
            timestamp,
            frame_size,
            detections,
            drift: DriftVector::zero(),
        }
    }

    pub fn with_drift(mut self, drift: DriftVector) -> Self {
        self.drift = drift;
        self
    }
}

/// Tick whose detections are applied but whose posture phase is outstanding.
#[derive(Debug, Clone)]
struct PendingTick {
    now: f64,
    params: AlertParams,
}

/// Person tracker with risk fusion and alert escalation.
///
/// Each tick predicts every track, associates detections, fuses posture
/// and absence risk, advances the alert state machine and prunes tracks
/// lost for longer than the long-loss cap.
pub struct Tracker {
    /// Tracker configuration.
    pub config: TrackerConfig,

    /// Live tracks in ascending id order.
    tracks: Vec<Track>,

    ids: TrackIdAllocator,

    events: EventBus,

    pending: Option<PendingTick>,

    /// Timestamp of the last accepted tick.
    clock: Option<f64>,
}

impl Tracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            tracks: Vec::new(),
            ids: TrackIdAllocator::new(),
            events: EventBus::new(),
            pending: None,
            clock: None,
        })
    }

    /// Run a full tick with detections and posture estimates.
    ///
    /// # Arguments
    /// * `observation` - Detections, frame size, timestamp and drift
    /// * `postures` - Posture estimates for this frame (may be empty)
    /// * `params` - Escalation parameters for this tick
    ///
    /// # Returns
    /// Live tracks in ascending id order
    pub fn update(
        &mut self,
        observation: &Observation<'_>,
        postures: &[PostureEstimate],
        params: &AlertParams,
    ) -> &[Track] {
        self.update_detections(observation, params);
        self.update_posture(postures)
    }

    /// First phase of a tick: predict, associate and spawn.
    ///
    /// Risk and alert state are left untouched until
    /// [`update_posture`](Self::update_posture). A tick still pending from
    /// an earlier call is completed first without posture input.
    pub fn update_detections(&mut self, observation: &Observation<'_>, params: &AlertParams) {
        if self.pending.is_some() {
            debug!("completing pending tick without posture input");
            self.update_posture(&[]);
        }

        let now = self.advance_clock(observation.timestamp);
        let params = params.sanitized();
        let drift = observation.drift.as_vector();

        // Predict
        for track in &mut self.tracks {
            let dt = (now - track.last_update).max(0.0);
            let before = track.filter.position();
            track.filter.predict(dt, drift);
            track.bbox = track.bbox.translated(track.filter.position() - before);
            track.last_update = now;
            track.age += 1;
        }

        // Associate
        let detections: Vec<&Detection> = observation
            .detections
            .iter()
            .filter(|d| {
                let ok = d.bbox.is_valid();
                if !ok {
                    warn_once("skipping detection with non-finite or empty box");
                }
                ok
            })
            .collect();

        let track_boxes: Vec<BBox> = self.tracks.iter().map(|t| t.bbox).collect();
        let detection_boxes: Vec<BBox> = detections.iter().map(|d| d.bbox).collect();
        let overlap = iou_matrix(&track_boxes, &detection_boxes);
        let (matched_tracks, matched_dets) = match_by_overlap(&overlap, self.config.iou_threshold);

        for (&t, &d) in matched_tracks.iter().zip(matched_dets.iter()) {
            self.hit_track(t, detections[d], now);
        }

        for t in get_unmatched(self.tracks.len(), &matched_tracks) {
            self.tracks[t].missed += 1;
        }

        for d in get_unmatched(detections.len(), &matched_dets) {
            let detection = detections[d];
            if detection.confidence >= self.config.min_confidence {
                self.create_track(detection, now);
            }
        }

        // ROI membership; a degenerate frame keeps the cached value
        let roi = params.active_roi();
        for track in &mut self.tracks {
            track.in_roi = match roi {
                Some(roi) => roi
                    .contains_pixel(track.centroid(), observation.frame_size)
                    .unwrap_or(track.in_roi),
                None => true,
            };
        }

        self.pending = Some(PendingTick { now, params });
    }

    /// Second phase of a tick: fuse risk, advance alert states and prune.
    ///
    /// Without a pending tick the tracks are returned unchanged.
    pub fn update_posture(&mut self, postures: &[PostureEstimate]) -> &[Track] {
        let Some(PendingTick { now, params }) = self.pending.take() else {
            warn_once("update_posture called without a pending tick");
            return &self.tracks;
        };

        let thresholds = Thresholds::new(&params, self.config.sea_state_gain, self.config.debounce_secs);
        let risk = self.config.risk_fusion();
        risk.apply_posture(&mut self.tracks, postures, now);

        let long_loss = self.config.long_loss_secs;
        let events = &mut self.events;
        for track in &mut self.tracks {
            risk.fuse(track, now);

            if track.missed_secs(now) > long_loss {
                track.state = TrackState::LostLong;
                debug!(track_id = track.id, level = ?track.level, "track lost");
                if track.level.is_escalated() {
                    info!(track_id = track.id, risk = track.risk, level = ?track.level, "escalated track lost");
                    events.push(Event::Lost {
                        track_id: track.id,
                        risk: track.risk,
                        last: track.last_sample(),
                        level: track.level,
                    });
                }
                continue;
            }

            risk.update_gate(track, params.ensemble_strict, now);
            let active = risk.is_active(track, params.ensemble_strict);
            let onset = risk.dwell_onset(track, now);
            alert::advance(track, active, onset, now, &thresholds, events);

            track.state = if track.is_missed() {
                TrackState::LostShort
            } else {
                TrackState::from(track.level)
            };
        }

        self.tracks.retain(|t| t.state != TrackState::LostLong);
        &self.tracks
    }

    /// Take all events queued since the previous drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    /// Live tracks in ascending id order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Owned copy of every live track.
    pub fn snapshot(&self) -> Vec<TrackSnapshot> {
        self.tracks.iter().map(Track::snapshot).collect()
    }

    /// Drop all tracks, the pending tick and queued events; ids restart at 1.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.events.clear();
        self.ids.reset();
        self.pending = None;
        self.clock = None;
        debug!("tracker reset");
    }

    /// Number of tracks created since construction or the last reset.
    pub fn total_track_count(&self) -> u64 {
        self.ids.issued_count()
    }

    /// Number of live tracks.
    pub fn current_track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Number of live tracks at ALERT level.
    pub fn alert_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|t| t.level == AlertLevel::Alert)
            .count()
    }

    // Internal: a timestamp that is NaN or behind the clock means no time elapsed
    fn advance_clock(&mut self, timestamp: f64) -> f64 {
        let now = match self.clock {
            Some(prev) if timestamp.is_finite() && timestamp >= prev => timestamp,
            Some(prev) => {
                warn_once("tick timestamp is not finite or went backwards; treating as no elapsed time");
                prev
            }
            None if timestamp.is_finite() => timestamp,
            None => {
                warn_once("tick timestamp is not finite; starting clock at 0");
                0.0
            }
        };
        self.clock = Some(now);
        now
    }

    // Internal: update track with matched detection
    fn hit_track(&mut self, idx: usize, detection: &Detection, now: f64) {
        let track = &mut self.tracks[idx];
        let centroid = detection.centroid();

        track.filter.update(centroid, now - track.last_seen);
        track.bbox = detection.bbox;
        track.score = ema(track.score, detection.confidence, SCORE_ALPHA);
        track.missed = 0;
        track.last_seen = now;
        track.push_history(CentroidSample::new(centroid, now));
    }

    // Internal: start a track from an unmatched detection
    fn create_track(&mut self, detection: &Detection, now: f64) {
        let id = self.ids.next_id();
        let filter = self.config.filter_factory.create(detection.centroid());
        let track = Track::new(
            id,
            detection.bbox,
            detection.confidence,
            now,
            filter,
            self.config.history_capacity,
        );
        debug!(track_id = id, confidence = detection.confidence, "track created");
        self.tracks.push(track);
    }
}
