//! Alert escalation: per-tick parameters and the hysteretic state machine.
//!
//! A track escalates NORMAL → PREALERT → ALERT on continuous risk-active
//! dwell and returns to NORMAL only after the risk condition has stayed
//! clear for a debounce interval. Dwell thresholds shrink as the sea state
//! worsens.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{Event, EventBus};
use crate::roi::RegionOfInterest;
use crate::tracked_object::{AlertLevel, Track};
use crate::utils::{clamp, warn_once};

/// Highest supported sea state (Douglas scale).
pub const MAX_SEA_STATE: i32 = 9;

/// Escalation parameters supplied with every tick.
///
/// Values are clamped by [`sanitized`](Self::sanitized) rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertParams {
    /// Risk-active dwell before PREALERT (seconds).
    pub pre_alert_secs: f64,
    /// Risk-active dwell before ALERT (seconds, measured from dwell onset).
    pub alert_secs: f64,
    /// Region outside which tracks stay NORMAL; None means the whole frame.
    pub roi: Option<RegionOfInterest>,
    /// Sea state severity, 0 (calm) to [`MAX_SEA_STATE`].
    pub sea_state: i32,
    /// Require posture and detector-absence signals to agree before escalating.
    pub ensemble_strict: bool,
}

impl Default for AlertParams {
    fn default() -> Self {
        Self {
            pre_alert_secs: 3.0,
            alert_secs: 6.0,
            roi: None,
            sea_state: 0,
            ensemble_strict: false,
        }
    }
}

impl AlertParams {
    /// Copy with every value inside its valid range.
    ///
    /// Negative or non-finite durations become 0, `alert_secs` is raised to
    /// at least `pre_alert_secs`, and the sea state is clamped to
    /// 0..=[`MAX_SEA_STATE`].
    pub fn sanitized(&self) -> AlertParams {
        let pre = non_negative(self.pre_alert_secs, "pre_alert_secs");
        let mut alert = non_negative(self.alert_secs, "alert_secs");
        if alert < pre {
            warn_once("alert_secs below pre_alert_secs, using pre_alert_secs");
            alert = pre;
        }

        let sea_state = clamp(self.sea_state, 0, MAX_SEA_STATE);
        if sea_state != self.sea_state {
            warn_once("sea_state outside 0..=9, clamped");
        }

        AlertParams {
            pre_alert_secs: pre,
            alert_secs: alert,
            roi: self.roi.clone().filter(|r| r.is_active()),
            sea_state,
            ensemble_strict: self.ensemble_strict,
        }
    }

    /// Active region of interest, if any.
    pub fn active_roi(&self) -> Option<&RegionOfInterest> {
        self.roi.as_ref().filter(|r| r.is_active())
    }
}

fn non_negative(value: f64, name: &str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn_once(&format!("{name} must be a non-negative number, clamped to 0"));
        0.0
    }
}

/// Threshold multiplier for a sea state: `1 / (1 + gain * sea_state)`.
///
/// Monotonically decreasing in `sea_state` for any non-negative `gain`;
/// equal to 1 in calm water.
pub fn sea_state_scale(sea_state: i32, gain: f64) -> f64 {
    let s = clamp(sea_state, 0, MAX_SEA_STATE) as f64;
    let gain = if gain.is_finite() { gain.max(0.0) } else { 0.0 };
    1.0 / (1.0 + gain * s)
}

/// Dwell thresholds in effect for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Dwell before NORMAL → PREALERT.
    pub pre_alert: f64,
    /// Time in PREALERT before PREALERT → ALERT.
    pub alert_delta: f64,
    /// Continuous clear time before returning to NORMAL.
    pub debounce: f64,
}

impl Thresholds {
    /// Scale sanitized params by the sea state.
    pub fn new(params: &AlertParams, sea_state_gain: f64, debounce_secs: f64) -> Self {
        let scale = sea_state_scale(params.sea_state, sea_state_gain);
        Self {
            pre_alert: params.pre_alert_secs * scale,
            alert_delta: (params.alert_secs - params.pre_alert_secs).max(0.0) * scale,
            debounce: debounce_secs.max(0.0),
        }
    }
}

/// Advance one track's alert level for this tick.
///
/// # Arguments
/// * `track` - Track whose risk fields are already fused for this tick
/// * `active` - Whether the track is risk-active (already ROI gated)
/// * `onset` - Dwell start to use if a new dwell begins now
/// * `now` - Tick timestamp (seconds)
/// * `thresholds` - Scaled thresholds for this tick
/// * `events` - Queue receiving transition events
pub fn advance(
    track: &mut Track,
    active: bool,
    onset: f64,
    now: f64,
    thresholds: &Thresholds,
    events: &mut EventBus,
) {
    if active {
        track.clear_since = None;
        let since = *track.risk_since.get_or_insert(onset.min(now));

        if track.level == AlertLevel::Normal && now - since >= thresholds.pre_alert {
            track.level = AlertLevel::PreAlert;
            // Anchored at the threshold crossing, not at this tick
            track.level_since = (since + thresholds.pre_alert).min(now);
            info!(track_id = track.id, risk = track.risk, dwell = now - since, "prealert");
            events.push(Event::PreAlert {
                track_id: track.id,
                risk: track.risk,
                last: track.last_sample(),
            });
        }

        if track.level == AlertLevel::PreAlert && now - track.level_since >= thresholds.alert_delta {
            track.level = AlertLevel::Alert;
            track.level_since = (track.level_since + thresholds.alert_delta).min(now);
            info!(track_id = track.id, risk = track.risk, dwell = now - since, "alert");
            events.push(Event::Alert {
                track_id: track.id,
                risk: track.risk,
                last: track.last_sample(),
            });
        }
        return;
    }

    if track.risk_since.is_none() {
        return;
    }

    let clear_since = *track.clear_since.get_or_insert(now);
    if now - clear_since < thresholds.debounce {
        return;
    }

    track.risk_since = None;
    track.clear_since = None;
    if track.level.is_escalated() {
        let from = track.level;
        track.level = AlertLevel::Normal;
        track.level_since = now;
        info!(track_id = track.id, risk = track.risk, from = ?from, "recovered");
        events.push(Event::Recovered {
            track_id: track.id,
            risk: track.risk,
            last: track.last_sample(),
            from,
        });
    }
}
