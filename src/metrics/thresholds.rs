//! Threshold grid construction for the confusion-matrix sweep
//!
//! The grid unions a structural sample of the prediction distribution
//! (200 evenly-strided values) with a fixed 0.02-spaced grid on [0, 1],
//! so the sweep stays fine near the empirical operating points without
//! depending on the prediction distribution alone.

/// Neighbouring thresholds closer than this are collapsed after sorting.
/// Far below the 0.02 fixed-grid spacing, so the fixed grid never merges.
pub const DEDUP_TOLERANCE: f64 = 1e-9;

/// Number of evenly-strided samples taken from the prediction vector
const SAMPLE_BINS: usize = 200;

/// Build the sorted, deduplicated threshold grid for a prediction vector.
pub fn make_thresholds(predictions: &[f64]) -> Vec<f64> {
    let mut thresholds = Vec::with_capacity(SAMPLE_BINS + 51);

    let bins = predictions.len().min(SAMPLE_BINS);
    if bins > 0 {
        let stride = (predictions.len() / bins).max(1);
        for i in 0..bins {
            let p = predictions[i * stride];
            if p.is_finite() {
                thresholds.push(p);
            }
        }
    }
    for i in 0..=50 {
        thresholds.push(i as f64 / 50.0);
    }

    thresholds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    thresholds.dedup_by(|b, a| (*b - *a).abs() < DEDUP_TOLERANCE);
    thresholds
}
