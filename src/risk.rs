//! Risk fusion: posture risk, absence risk and the risk-active test.

use nalgebra::Vector2;
use tracing::debug;

use crate::detection::PostureEstimate;
use crate::matching::{distance_matrix, get_unmatched, match_by_distance};
use crate::tracked_object::Track;
use crate::utils::{clamp_unit, warn_once};

/// Settings for combining posture and presence signals into track risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskFusion {
    /// Maximum centroid distance for a posture estimate to attach to a track (pixels).
    pub posture_match_distance: f64,
    /// Half-life of posture risk while no estimate attaches (seconds).
    pub posture_half_life_secs: f64,
    /// Missed duration at which absence risk saturates (seconds).
    pub short_loss_secs: f64,
    /// Effective risk at or above which a track is risk-active.
    pub risk_threshold: f64,
    /// Posture risk a track needs in strict ensemble mode.
    pub posture_floor: f64,
    /// Smoothed detector score below which a detection counts as weak in strict mode.
    pub weak_detection_score: f64,
}

impl RiskFusion {
    /// Attach posture estimates to tracks and decay the rest.
    ///
    /// Estimates are matched greedily to the nearest track centroid within
    /// `posture_match_distance`, each track and estimate used at most once.
    pub fn apply_posture(&self, tracks: &mut [Track], postures: &[PostureEstimate], now: f64) {
        let valid: Vec<&PostureEstimate> = postures
            .iter()
            .filter(|p| {
                let ok = p.is_valid();
                if !ok {
                    warn_once("skipping posture estimate with non-finite position");
                }
                ok
            })
            .collect();

        let centroids: Vec<Vector2<f64>> = tracks.iter().map(|t| t.centroid()).collect();
        let positions: Vec<Vector2<f64>> = valid.iter().map(|p| p.position()).collect();
        let distances = distance_matrix(&centroids, &positions);
        let (matched_tracks, matched_postures) = match_by_distance(&distances, self.posture_match_distance);

        for (&t, &p) in matched_tracks.iter().zip(matched_postures.iter()) {
            let track = &mut tracks[t];
            track.posture_risk = clamp_unit(valid[p].risk);
            track.posture_at = now;
        }

        for t in get_unmatched(tracks.len(), &matched_tracks) {
            let track = &mut tracks[t];
            let elapsed = (now - track.posture_at).max(0.0);
            track.posture_risk = self.decay(track.posture_risk, elapsed);
            track.posture_at = now;
        }

        if !valid.is_empty() {
            debug!(
                postures = valid.len(),
                matched = matched_postures.len(),
                "posture estimates associated"
            );
        }
    }

    /// Posture risk after `elapsed` seconds of half-life decay.
    pub fn decay(&self, risk: f64, elapsed: f64) -> f64 {
        if elapsed <= 0.0 {
            return clamp_unit(risk);
        }
        if self.posture_half_life_secs <= 0.0 {
            return 0.0;
        }
        clamp_unit(risk * 0.5_f64.powf(elapsed / self.posture_half_life_secs))
    }

    /// Risk from a missed detection inside the region of interest.
    pub fn absence_risk(&self, track: &Track, now: f64) -> f64 {
        if !track.is_missed() || !track.in_roi {
            return 0.0;
        }
        if self.short_loss_secs <= 0.0 {
            return 1.0;
        }
        clamp_unit(track.missed_secs(now) / self.short_loss_secs)
    }

    /// Recompute absence and effective risk for this tick.
    pub fn fuse(&self, track: &mut Track, now: f64) {
        track.posture_risk = clamp_unit(track.posture_risk);
        track.absence_risk = self.absence_risk(track, now);
        track.risk = clamp_unit(track.posture_risk.max(track.absence_risk));
    }

    /// Whether the track's risk condition holds this tick.
    ///
    /// Tracks outside the region of interest are never risk-active.
    pub fn is_active(&self, track: &Track, ensemble_strict: bool) -> bool {
        if !track.in_roi {
            return false;
        }
        if ensemble_strict {
            track.posture_risk >= self.posture_floor
                && (track.is_missed() || track.score < self.weak_detection_score)
        } else {
            track.risk >= self.risk_threshold || track.is_missed()
        }
    }

    /// Record whether the gates besides absence hold this tick.
    ///
    /// The gates are ROI membership and, in strict mode, the posture floor.
    /// `gate_since` keeps the first tick of the current unbroken run.
    pub fn update_gate(&self, track: &mut Track, ensemble_strict: bool, now: f64) {
        let holds = track.in_roi && (!ensemble_strict || track.posture_risk >= self.posture_floor);
        if holds {
            track.gate_since.get_or_insert(now);
        } else {
            track.gate_since = None;
        }
    }

    /// Start time for a dwell beginning this tick.
    ///
    /// An absence-driven dwell counts from the last detection, but never
    /// from before the other gates started holding.
    pub fn dwell_onset(&self, track: &Track, now: f64) -> f64 {
        if !track.is_missed() {
            return now;
        }
        match track.gate_since {
            Some(gate) => track.last_seen.max(gate).min(now),
            None => now,
        }
    }
}
