//! Motion model without a velocity term.
//!
//! This provides a baseline for comparison: the last observed position is
//! held, moved only by platform drift compensation.

use nalgebra::Vector2;

use super::traits::Filter;

/// Filter that stores the last measurement and never estimates velocity.
#[derive(Clone, Debug)]
pub struct NoFilter {
    position: Vector2<f64>,
}

impl NoFilter {
    /// Create a new NoFilter at the initial centroid.
    pub fn new(initial: Vector2<f64>) -> Self {
        Self { position: initial }
    }
}

impl Filter for NoFilter {
    fn predict(&mut self, dt: f64, drift: Vector2<f64>) {
        if dt > 0.0 {
            self.position -= drift * dt;
        }
    }

    fn update(&mut self, centroid: Vector2<f64>, _dt: f64) {
        self.position = centroid;
    }

    fn position(&self) -> Vector2<f64> {
        self.position
    }

    fn velocity(&self) -> Vector2<f64> {
        Vector2::zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_filter_holds_position() {
        let mut f = NoFilter::new(Vector2::new(1.0, 2.0));
        f.predict(1.0, Vector2::zeros());
        assert_relative_eq!(f.position().x, 1.0, epsilon = 1e-10);
        assert_relative_eq!(f.position().y, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_no_filter_update_copies_measurement() {
        let mut f = NoFilter::new(Vector2::new(1.0, 2.0));
        f.update(Vector2::new(5.0, 7.0), 1.0);
        assert_relative_eq!(f.position().x, 5.0, epsilon = 1e-10);
        assert_relative_eq!(f.position().y, 7.0, epsilon = 1e-10);
        assert_eq!(f.velocity(), Vector2::zeros());
    }

    #[test]
    fn test_no_filter_removes_drift() {
        let mut f = NoFilter::new(Vector2::new(10.0, 10.0));
        f.predict(0.5, Vector2::new(4.0, -2.0));
        assert_relative_eq!(f.position().x, 8.0, epsilon = 1e-10);
        assert_relative_eq!(f.position().y, 11.0, epsilon = 1e-10);
    }
}
