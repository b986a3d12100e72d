//! Exponentially smoothed constant-velocity motion model.

use nalgebra::Vector2;

use super::traits::Filter;

/// Default velocity smoothing factor.
pub const DEFAULT_VELOCITY_ALPHA: f64 = 0.3;

/// Constant-velocity filter with an exponentially smoothed velocity.
///
/// Velocity is learned from successive matched centroids only; predicted
/// positions never feed back into it.
#[derive(Clone, Debug)]
pub struct EmaVelocityFilter {
    alpha: f64,
    position: Vector2<f64>,
    last_observed: Vector2<f64>,
    velocity: Vector2<f64>,
}

impl EmaVelocityFilter {
    /// Create a filter at `initial` with zero velocity.
    ///
    /// `alpha` is clamped to [0, 1]; 1 means no smoothing.
    pub fn new(initial: Vector2<f64>, alpha: f64) -> Self {
        Self {
            alpha: crate::utils::clamp_unit(alpha),
            position: initial,
            last_observed: initial,
            velocity: Vector2::zeros(),
        }
    }
}

impl Filter for EmaVelocityFilter {
    fn predict(&mut self, dt: f64, drift: Vector2<f64>) {
        if dt > 0.0 {
            self.position += (self.velocity - drift) * dt;
        }
    }

    fn update(&mut self, centroid: Vector2<f64>, dt: f64) {
        if dt > 0.0 {
            let instantaneous = (centroid - self.last_observed) / dt;
            self.velocity = instantaneous * self.alpha + self.velocity * (1.0 - self.alpha);
        }
        self.position = centroid;
        self.last_observed = centroid;
    }

    fn position(&self) -> Vector2<f64> {
        self.position
    }

    fn velocity(&self) -> Vector2<f64> {
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ema_first_update_is_smoothed() {
        let mut f = EmaVelocityFilter::new(Vector2::new(0.0, 0.0), 0.3);
        f.update(Vector2::new(10.0, 0.0), 1.0);
        // 0.3 * 10 px/s + 0.7 * 0
        assert_relative_eq!(f.velocity().x, 3.0, epsilon = 1e-10);
        assert_relative_eq!(f.velocity().y, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ema_converges_to_constant_velocity() {
        let mut f = EmaVelocityFilter::new(Vector2::new(0.0, 0.0), 0.3);
        for i in 1..=60 {
            f.update(Vector2::new(5.0 * i as f64, 0.0), 0.5);
        }
        // 5 px per 0.5 s
        assert_relative_eq!(f.velocity().x, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ema_uses_wall_clock_dt() {
        let mut a = EmaVelocityFilter::new(Vector2::zeros(), 1.0);
        let mut b = EmaVelocityFilter::new(Vector2::zeros(), 1.0);
        a.update(Vector2::new(10.0, 0.0), 1.0);
        b.update(Vector2::new(10.0, 0.0), 2.0);
        assert_relative_eq!(a.velocity().x, 10.0, epsilon = 1e-10);
        assert_relative_eq!(b.velocity().x, 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ema_predict_subtracts_drift() {
        let mut f = EmaVelocityFilter::new(Vector2::zeros(), 1.0);
        f.update(Vector2::new(4.0, 2.0), 1.0); // velocity (4, 2)
        f.predict(0.5, Vector2::new(2.0, 2.0));
        // (4,2) + ((4,2) - (2,2)) * 0.5 = (5, 2)
        assert_relative_eq!(f.position().x, 5.0, epsilon = 1e-10);
        assert_relative_eq!(f.position().y, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ema_zero_dt_keeps_velocity() {
        let mut f = EmaVelocityFilter::new(Vector2::zeros(), 0.5);
        f.update(Vector2::new(2.0, 0.0), 1.0);
        let v = f.velocity();
        f.update(Vector2::new(100.0, 0.0), 0.0);
        assert_eq!(f.velocity(), v);
        assert_relative_eq!(f.position().x, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_ema_predictions_ignore_predicted_positions() {
        let mut f = EmaVelocityFilter::new(Vector2::zeros(), 1.0);
        f.update(Vector2::new(10.0, 0.0), 1.0); // v = 10
        f.predict(1.0, Vector2::zeros()); // at 20
        f.predict(1.0, Vector2::zeros()); // at 30
        // Re-acquired at 40 after 3 s since the last match
        f.update(Vector2::new(40.0, 0.0), 3.0);
        assert_relative_eq!(f.velocity().x, 10.0, epsilon = 1e-10);
    }
}
