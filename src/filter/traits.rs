//! Filter traits for per-track motion models.

use nalgebra::Vector2;

/// Trait for motion model implementations.
///
/// A filter follows one track's centroid. All time arguments are
/// wall-clock seconds, never frame counts.
pub trait Filter: Send + Sync {
    /// Advance the position estimate by `dt` seconds.
    ///
    /// # Arguments
    /// * `dt` - Seconds since the track was last updated
    /// * `drift` - Platform drift (px/s) to remove from the apparent motion
    fn predict(&mut self, dt: f64, drift: Vector2<f64>);

    /// Correct the estimate with a matched centroid.
    ///
    /// # Arguments
    /// * `centroid` - Observed centroid (pixels)
    /// * `dt` - Seconds since the previous matched observation
    fn update(&mut self, centroid: Vector2<f64>, dt: f64);

    /// Current position estimate (pixels).
    fn position(&self) -> Vector2<f64>;

    /// Current velocity estimate (px/s).
    fn velocity(&self) -> Vector2<f64>;
}
