//! Camera platform motion compensation.
//!
//! The observation platform (a boat) moves with the waves, so every tracked
//! person shares an apparent translation that is not their own motion. This
//! module estimates that translation from two luminance frames; the tracker
//! subtracts it when predicting unobserved tracks.

mod estimator;

pub use estimator::{DriftEstimate, DriftEstimator, DriftVector, LumaFrame};
