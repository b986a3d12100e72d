//! Utility functions for seaguard.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::OnceLock;

use nalgebra::Vector2;

/// Global set of warned messages (for warn_once).
static WARNED_MESSAGES: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

/// Log a warning message only once per process.
///
/// Configuration is re-applied every tick, so a bad value would otherwise
/// be reported at frame rate.
pub fn warn_once(message: &str) {
    let warned = WARNED_MESSAGES.get_or_init(|| Mutex::new(HashSet::new()));
    let Ok(mut guard) = warned.lock() else {
        return;
    };
    if guard.insert(message.to_string()) {
        tracing::warn!("{}", message);
    }
}

/// Clamp a value to a range.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Clamp a probability-like value to [0, 1]. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        clamp(value, 0.0, 1.0)
    }
}

/// Even-odd ray casting point-in-polygon test.
///
/// Polygons with fewer than 3 vertices contain every point.
pub fn point_in_polygon(point: Vector2<f64>, polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return true;
    }

    let (px, py) = (point.x, point.y);
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let [xi, yi] = polygon[i];
        let [xj, yj] = polygon[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Axis-aligned bounds of a set of points.
///
/// Returns (min_x, min_y, max_x, max_y), or None for an empty set.
pub fn get_bounding_box<I>(points: I) -> Option<(f64, f64, f64, f64)>
where
    I: IntoIterator<Item = Vector2<f64>>,
{
    let mut iter = points.into_iter();
    let first = iter.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in iter {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some((min_x, min_y, max_x, max_y))
}

/// Exponential smoothing: `alpha * sample + (1 - alpha) * previous`.
#[inline]
pub fn ema(previous: f64, sample: f64, alpha: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<[f64; 2]> {
        vec![[0.25, 0.25], [0.75, 0.25], [0.75, 0.75], [0.25, 0.75]]
    }

    #[test]
    fn test_point_in_polygon_inside_and_outside() {
        let poly = square();
        assert!(point_in_polygon(Vector2::new(0.5, 0.5), &poly));
        assert!(!point_in_polygon(Vector2::new(0.1, 0.5), &poly));
        assert!(!point_in_polygon(Vector2::new(0.5, 0.9), &poly));
    }

    #[test]
    fn test_point_in_polygon_concave() {
        // U shape open at the top
        let poly = vec![
            [0.0, 0.0], [0.3, 0.0], [0.3, 0.6], [0.6, 0.6],
            [0.6, 0.0], [0.9, 0.0], [0.9, 1.0], [0.0, 1.0],
        ];
        assert!(point_in_polygon(Vector2::new(0.1, 0.2), &poly));
        assert!(!point_in_polygon(Vector2::new(0.45, 0.2), &poly));
        assert!(point_in_polygon(Vector2::new(0.45, 0.8), &poly));
    }

    #[test]
    fn test_degenerate_polygon_contains_everything() {
        assert!(point_in_polygon(Vector2::new(5.0, -3.0), &[]));
        assert!(point_in_polygon(Vector2::new(5.0, -3.0), &[[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn test_get_bounding_box() {
        let points = vec![
            Vector2::new(1.0, 2.0),
            Vector2::new(5.0, 8.0),
            Vector2::new(3.0, 4.0),
        ];

        let bbox = get_bounding_box(points).unwrap();
        assert_eq!(bbox, (1.0, 2.0, 5.0, 8.0));
        assert!(get_bounding_box(Vec::<Vector2<f64>>::new()).is_none());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 10), 5);
        assert_eq!(clamp(-5, 0, 10), 0);
        assert_eq!(clamp(15, 0, 10), 10);
    }

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(0.4), 0.4);
    }

    #[test]
    fn test_ema() {
        assert_eq!(ema(10.0, 20.0, 0.5), 15.0);
        assert_eq!(ema(10.0, 20.0, 0.0), 10.0);
        assert_eq!(ema(10.0, 20.0, 1.0), 20.0);
    }
}
