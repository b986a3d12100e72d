//! # SeaGuard - person-overboard tracking core
//!
//! Tracking and alerting core of a camera-based person-overboard and
//! drowning-risk monitor.
//!
//! Given per-frame person detections and optional posture-derived risk, the
//! tracker keeps stable identities for everyone in view, fuses posture and
//! absence risk per person, and escalates through a hysteretic
//! NORMAL → PREALERT → ALERT state machine. Platform motion is compensated
//! with a drift vector estimated from consecutive frames.
//!
//! ## Features
//!
//! - IoU-based greedy association with drift-compensated prediction
//! - Posture and absence risk fusion with optional strict ensemble mode
//! - Region-of-interest gating and sea-state scaled dwell thresholds
//! - Block-matching platform drift estimation
//! - Two-phase ticks for posture results that arrive after detections
//!
//! ## Example
//!
//! ```rust,ignore
//! use seaguard_rs::{AlertParams, Detection, FrameSize, Observation, Tracker, TrackerConfig};
//!
//! let mut tracker = Tracker::new(TrackerConfig::default()).unwrap();
//! let detections = vec![Detection::from_xywh([100.0, 100.0, 40.0, 80.0], 0.9)];
//! let observation = Observation::new(0.0, FrameSize::new(1280.0, 720.0), &detections);
//! let tracks = tracker.update(&observation, &[], &AlertParams::default());
//! for event in tracker.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod alert;
pub mod camera_motion;
pub mod detection;
pub mod events;
pub mod filter;
pub mod matching;
pub mod risk;
pub mod roi;
pub mod tracked_object;
pub mod tracker;
pub mod utils;

// Re-exports for convenience
pub use alert::AlertParams;
pub use camera_motion::{DriftEstimate, DriftEstimator, DriftVector, LumaFrame};
pub use detection::{merge_posture_boxes, BBox, Detection, Keypoint, PostureEstimate};
pub use events::{Event, EventBus, EventKind};
pub use filter::{Filter, FilterFactoryEnum};
pub use roi::{FrameSize, RegionOfInterest};
pub use tracked_object::{AlertLevel, CentroidSample, Track, TrackSnapshot, TrackState};
pub use tracker::{Observation, Tracker, TrackerConfig};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur when building tracker components
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid frame: {0}")]
        InvalidFrame(String),
    }

    /// Result type for seaguard operations
    pub type Result<T> = std::result::Result<T, Error>;
}
