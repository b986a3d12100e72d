//! Detection-to-track and posture-to-track assignment.
//!
//! Both assignments are greedy over a score matrix whose rows are tracks
//! (in ascending id order) and whose columns are inputs (in input order).
//! Candidate pairs are visited in score order with a stable sort, so ties
//! resolve by track order first and input order second.

use nalgebra::{DMatrix, Vector2};

use crate::detection::BBox;

/// IoU between every track box (rows) and detection box (columns).
pub fn iou_matrix(track_boxes: &[BBox], detection_boxes: &[BBox]) -> DMatrix<f64> {
    DMatrix::from_fn(track_boxes.len(), detection_boxes.len(), |i, j| {
        track_boxes[i].iou(&detection_boxes[j])
    })
}

/// Euclidean distance between every track centroid (rows) and input position (columns).
pub fn distance_matrix(track_centroids: &[Vector2<f64>], positions: &[Vector2<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(track_centroids.len(), positions.len(), |i, j| {
        (track_centroids[i] - positions[j]).norm()
    })
}

/// Greedy one-to-one assignment by descending overlap.
///
/// Only pairs with overlap strictly above `threshold` are candidates.
///
/// # Returns
/// Tuple of (matched_track_indices, matched_input_indices) in assignment order.
pub fn match_by_overlap(overlap: &DMatrix<f64>, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    let mut pairs = collect_pairs(overlap, |v| v > threshold);
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));
    greedy_assign(pairs, overlap.nrows(), overlap.ncols())
}

/// Greedy one-to-one assignment by ascending distance.
///
/// Only pairs with distance at most `max_distance` are candidates.
pub fn match_by_distance(distances: &DMatrix<f64>, max_distance: f64) -> (Vec<usize>, Vec<usize>) {
    let mut pairs = collect_pairs(distances, |v| v <= max_distance);
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    greedy_assign(pairs, distances.nrows(), distances.ncols())
}

/// Get unmatched indices from a match result.
pub fn get_unmatched(total: usize, matched: &[usize]) -> Vec<usize> {
    let mut is_matched = vec![false; total];
    for &idx in matched {
        is_matched[idx] = true;
    }
    (0..total).filter(|&i| !is_matched[i]).collect()
}

// Row-major so that the stable sort keeps (track, input) order on ties.
fn collect_pairs(matrix: &DMatrix<f64>, accept: impl Fn(f64) -> bool) -> Vec<(f64, usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..matrix.nrows() {
        for j in 0..matrix.ncols() {
            let v = matrix[(i, j)];
            if v.is_finite() && accept(v) {
                pairs.push((v, i, j));
            }
        }
    }
    pairs
}

fn greedy_assign(pairs: Vec<(f64, usize, usize)>, n_rows: usize, n_cols: usize) -> (Vec<usize>, Vec<usize>) {
    let mut used_rows = vec![false; n_rows];
    let mut used_cols = vec![false; n_cols];

    let mut matched_rows = Vec::new();
    let mut matched_cols = Vec::new();

    for (_score, row, col) in pairs {
        if used_rows[row] || used_cols[col] {
            continue;
        }

        matched_rows.push(row);
        matched_cols.push(col);
        used_rows[row] = true;
        used_cols[col] = true;
    }

    (matched_rows, matched_cols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ===== Overlap matching =====

    #[test]
    fn test_overlap_perfect_matches() {
        let matrix = DMatrix::from_row_slice(3, 3, &[
            0.9, 0.1, 0.2,
            0.1, 0.7, 0.3,
            0.2, 0.3, 0.8,
        ]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);

        // Greedy order: [0,0]=0.9, [2,2]=0.8, [1,1]=0.7
        assert_eq!(tracks, vec![0, 2, 1]);
        assert_eq!(dets, vec![0, 2, 1]);
    }

    #[test]
    fn test_overlap_threshold_is_strict() {
        let matrix = DMatrix::from_row_slice(1, 2, &[0.3, 0.31]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);
        assert_eq!(tracks, vec![0]);
        assert_eq!(dets, vec![1]);
    }

    #[test]
    fn test_overlap_all_below_threshold() {
        let matrix = DMatrix::from_row_slice(2, 2, &[
            0.1, 0.2,
            0.0, 0.25,
        ]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);
        assert!(tracks.is_empty());
        assert!(dets.is_empty());
    }

    #[test]
    fn test_overlap_empty() {
        let (tracks, dets) = match_by_overlap(&DMatrix::zeros(0, 3), 0.3);
        assert!(tracks.is_empty());
        assert!(dets.is_empty());
        let (tracks, dets) = match_by_overlap(&DMatrix::zeros(2, 0), 0.3);
        assert!(tracks.is_empty());
        assert!(dets.is_empty());
    }

    #[test]
    fn test_overlap_ties_prefer_lower_track() {
        // Both tracks overlap the single detection equally
        let matrix = DMatrix::from_row_slice(2, 1, &[0.5, 0.5]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);
        assert_eq!(tracks, vec![0]);
        assert_eq!(dets, vec![0]);
    }

    #[test]
    fn test_overlap_one_to_one() {
        let matrix = DMatrix::from_row_slice(2, 3, &[
            0.8, 0.7, 0.0,
            0.75, 0.0, 0.0,
        ]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);
        // [0,0]=0.8 first; track 1 then has nothing left above threshold
        assert_eq!(tracks, vec![0]);
        assert_eq!(dets, vec![0]);
    }

    #[test]
    fn test_overlap_ignores_nan() {
        let matrix = DMatrix::from_row_slice(1, 2, &[f64::NAN, 0.6]);
        let (tracks, dets) = match_by_overlap(&matrix, 0.3);
        assert_eq!(tracks, vec![0]);
        assert_eq!(dets, vec![1]);
    }

    // ===== Distance matching =====

    #[test]
    fn test_distance_nearest_first() {
        let matrix = DMatrix::from_row_slice(3, 3, &[
            5.0, 3.0, 7.0,
            2.0, 9.0, 4.0,
            6.0, 1.0, 8.0,
        ]);
        let (tracks, inputs) = match_by_distance(&matrix, 10.0);

        // Greedy order: [2,1]=1.0, [1,0]=2.0, [0,2]=7.0
        assert_eq!(tracks, vec![2, 1, 0]);
        assert_eq!(inputs, vec![1, 0, 2]);
    }

    #[test]
    fn test_distance_cutoff() {
        let matrix = DMatrix::from_row_slice(3, 3, &[
            5.0, 3.0, 7.0,
            2.0, 9.0, 4.0,
            6.0, 1.0, 8.0,
        ]);
        let (tracks, inputs) = match_by_distance(&matrix, 2.5);
        assert_eq!(tracks, vec![2, 1]);
        assert_eq!(inputs, vec![1, 0]);
    }

    #[test]
    fn test_distance_ties_use_input_order() {
        let matrix = DMatrix::from_row_slice(1, 2, &[4.0, 4.0]);
        let (tracks, inputs) = match_by_distance(&matrix, 5.0);
        assert_eq!(tracks, vec![0]);
        assert_eq!(inputs, vec![0]);
    }

    // ===== Matrix builders =====

    #[test]
    fn test_iou_matrix_shape_and_values() {
        let tracks = vec![BBox::new(0.0, 0.0, 10.0, 10.0), BBox::new(100.0, 100.0, 10.0, 10.0)];
        let dets = vec![BBox::new(5.0, 5.0, 10.0, 10.0)];
        let m = iou_matrix(&tracks, &dets);
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 1);
        assert_relative_eq!(m[(0, 0)], 25.0 / 175.0, epsilon = 1e-10);
        assert_relative_eq!(m[(1, 0)], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_distance_matrix_values() {
        let tracks = vec![Vector2::new(0.0, 0.0)];
        let inputs = vec![Vector2::new(3.0, 4.0), Vector2::new(0.0, 1.0)];
        let m = distance_matrix(&tracks, &inputs);
        assert_relative_eq!(m[(0, 0)], 5.0, epsilon = 1e-10);
        assert_relative_eq!(m[(0, 1)], 1.0, epsilon = 1e-10);
    }

    // ===== get_unmatched =====

    #[test]
    fn test_get_unmatched() {
        assert_eq!(get_unmatched(5, &[1, 3]), vec![0, 2, 4]);
        assert!(get_unmatched(3, &[0, 1, 2]).is_empty());
        assert_eq!(get_unmatched(3, &[]), vec![0, 1, 2]);
    }
}
