//! Threshold sweep, ROC integration, and operating-point tables

use serde::{Deserialize, Serialize};

use super::confusion::ConfusionMatrix;

/// One confusion matrix per threshold, filled in a single pass over
/// (prediction, actual) rows. Shards fill independent sweeps and merge
/// by element-wise addition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSweep {
    thresholds: Vec<f64>,
    matrices: Vec<ConfusionMatrix>,
}

impl ThresholdSweep {
    /// `thresholds` must be sorted ascending and distinct
    /// (see [`super::thresholds::make_thresholds`]).
    pub fn new(thresholds: Vec<f64>) -> Self {
        let matrices = thresholds.iter().map(|_| ConfusionMatrix::new(2)).collect();
        Self {
            thresholds,
            matrices,
        }
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn matrices(&self) -> &[ConfusionMatrix] {
        &self.matrices
    }

    /// Classify one row against every threshold: positive iff
    /// `prediction >= threshold`. Rows with a missing prediction or actual
    /// are skipped.
    pub fn consume(&mut self, prediction: f64, actual: f64) {
        if prediction.is_nan() || actual.is_nan() {
            return;
        }
        let iact = actual as usize;
        for (threshold, cm) in self.thresholds.iter().zip(self.matrices.iter_mut()) {
            let predicted = usize::from(prediction >= *threshold);
            cm.increment(iact, predicted);
        }
    }

    /// Merge a shard's sweep into this one (same threshold grid assumed)
    pub fn merge(&mut self, other: &ThresholdSweep) {
        debug_assert_eq!(self.thresholds.len(), other.thresholds.len());
        for (cm, o) in self.matrices.iter_mut().zip(&other.matrices) {
            cm.add(o);
        }
    }

    /// Finalize into the reportable AUC object
    pub fn into_auc_data(self) -> AucData {
        AucData::from_sweep(self)
    }
}

/// All derived scores at one threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdScores {
    pub threshold: f64,
    pub f1: f64,
    pub f2: f64,
    pub f0point5: f64,
    pub accuracy: f64,
    pub error: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub mcc: f64,
    pub max_per_class_error: f64,
}

impl ThresholdScores {
    fn from_matrix(threshold: f64, cm: &ConfusionMatrix) -> Self {
        Self {
            threshold,
            f1: cm.f1(),
            f2: cm.f2(),
            f0point5: cm.f0point5(),
            accuracy: cm.accuracy(),
            error: cm.error(),
            precision: cm.precision(),
            recall: cm.recall(),
            specificity: cm.specificity(),
            mcc: cm.mcc(),
            max_per_class_error: cm.max_per_class_error(),
        }
    }
}

/// Operating-point criteria reported to the serialization layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdCriterion {
    MaxF1,
    MaxF2,
    MaxF0point5,
    MaxAccuracy,
    MaxPrecision,
    MaxRecall,
    MaxSpecificity,
    MaxAbsMcc,
    MinMaxPerClassError,
}

impl ThresholdCriterion {
    pub const ALL: [ThresholdCriterion; 9] = [
        ThresholdCriterion::MaxF1,
        ThresholdCriterion::MaxF2,
        ThresholdCriterion::MaxF0point5,
        ThresholdCriterion::MaxAccuracy,
        ThresholdCriterion::MaxPrecision,
        ThresholdCriterion::MaxRecall,
        ThresholdCriterion::MaxSpecificity,
        ThresholdCriterion::MaxAbsMcc,
        ThresholdCriterion::MinMaxPerClassError,
    ];

    /// Objective value at a threshold; always maximized (minimized
    /// criteria are negated).
    fn objective(&self, s: &ThresholdScores) -> f64 {
        match self {
            ThresholdCriterion::MaxF1 => s.f1,
            ThresholdCriterion::MaxF2 => s.f2,
            ThresholdCriterion::MaxF0point5 => s.f0point5,
            ThresholdCriterion::MaxAccuracy => s.accuracy,
            ThresholdCriterion::MaxPrecision => s.precision,
            ThresholdCriterion::MaxRecall => s.recall,
            ThresholdCriterion::MaxSpecificity => s.specificity,
            ThresholdCriterion::MaxAbsMcc => s.mcc.abs(),
            ThresholdCriterion::MinMaxPerClassError => -s.max_per_class_error,
        }
    }
}

/// Best operating point for one criterion: the winning threshold and the
/// full score row at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: ThresholdCriterion,
    pub threshold: f64,
    pub scores: ThresholdScores,
}

/// Finalized product of the threshold sweep: per-threshold score table,
/// trapezoidal AUC, and the best-operating-point table per criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AucData {
    pub thresholds: Vec<f64>,
    pub scores: Vec<ThresholdScores>,
    pub auc: f64,
    pub gini: f64,
    pub best_by_criterion: Vec<CriterionScore>,
    /// Threshold maximizing F1; the model's default decision threshold
    pub best_threshold: f64,
}

impl AucData {
    fn from_sweep(sweep: ThresholdSweep) -> Self {
        let scores: Vec<ThresholdScores> = sweep
            .thresholds
            .iter()
            .zip(&sweep.matrices)
            .map(|(&t, cm)| ThresholdScores::from_matrix(t, cm))
            .collect();

        let auc = trapezoidal_auc(&sweep.matrices);
        let best_by_criterion: Vec<CriterionScore> = ThresholdCriterion::ALL
            .iter()
            .filter_map(|&criterion| {
                let mut best: Option<&ThresholdScores> = None;
                for s in &scores {
                    // strict comparison keeps the lowest winning threshold
                    if best.map_or(true, |b| criterion.objective(s) > criterion.objective(b)) {
                        best = Some(s);
                    }
                }
                best.map(|s| CriterionScore {
                    criterion,
                    threshold: s.threshold,
                    scores: *s,
                })
            })
            .collect();

        let best_threshold = best_by_criterion
            .iter()
            .find(|c| c.criterion == ThresholdCriterion::MaxF1)
            .map_or(0.5, |c| c.threshold);

        Self {
            thresholds: sweep.thresholds,
            scores,
            auc,
            gini: 2.0 * auc - 1.0,
            best_by_criterion,
            best_threshold,
        }
    }
}

/// Trapezoidal integral of the ROC curve traced by the threshold sweep.
fn trapezoidal_auc(matrices: &[ConfusionMatrix]) -> f64 {
    let mut points: Vec<(f64, f64)> = matrices
        .iter()
        .map(|cm| {
            let (tpr, fpr) = cm.tpr_fpr();
            (fpr, tpr)
        })
        .collect();
    points.push((0.0, 0.0));
    points.push((1.0, 1.0));
    points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut auc = 0.0;
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        auc += (x1 - x0) * (y0 + y1) / 2.0;
    }
    auc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::thresholds::make_thresholds;

    fn sweep_rows(rows: &[(f64, f64)]) -> ThresholdSweep {
        let preds: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let mut sweep = ThresholdSweep::new(make_thresholds(&preds));
        for &(p, a) in rows {
            sweep.consume(p, a);
        }
        sweep
    }

    #[test]
    fn test_predicted_positives_monotone_in_threshold() {
        let rows: Vec<(f64, f64)> = (0..100)
            .map(|i| {
                let p = i as f64 / 100.0;
                (p, if p > 0.6 { 1.0 } else { 0.0 })
            })
            .collect();
        let sweep = sweep_rows(&rows);
        let positives: Vec<u64> = sweep
            .matrices()
            .iter()
            .map(|cm| cm.predicted_positives())
            .collect();
        for pair in positives.windows(2) {
            assert!(pair[1] <= pair[0], "positives must not grow with threshold");
        }
    }

    #[test]
    fn test_perfect_separation_auc_is_one() {
        let mut rows = Vec::new();
        for i in 0..50 {
            rows.push((0.1 + (i as f64) * 1e-4, 0.0));
            rows.push((0.9 + (i as f64) * 1e-4, 1.0));
        }
        let auc_data = sweep_rows(&rows).into_auc_data();
        assert!((auc_data.auc - 1.0).abs() < 1e-9);
        assert!((auc_data.gini - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_predictions_auc_near_half() {
        // prediction independent of label, symmetric layout
        let mut rows = Vec::new();
        for i in 0..200 {
            let p = (i % 100) as f64 / 100.0;
            rows.push((p, (i % 2) as f64));
        }
        let auc_data = sweep_rows(&rows).into_auc_data();
        assert!((auc_data.auc - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_nan_rows_skipped() {
        let mut sweep = ThresholdSweep::new(vec![0.5]);
        sweep.consume(f64::NAN, 1.0);
        sweep.consume(0.7, f64::NAN);
        sweep.consume(0.7, 1.0);
        assert_eq!(sweep.matrices()[0].total(), 1);
    }

    #[test]
    fn test_shard_merge_matches_single_pass() {
        let rows: Vec<(f64, f64)> = (0..60)
            .map(|i| ((i % 10) as f64 / 10.0, (i % 2) as f64))
            .collect();
        let thresholds = make_thresholds(&rows.iter().map(|r| r.0).collect::<Vec<_>>());

        let mut whole = ThresholdSweep::new(thresholds.clone());
        for &(p, a) in &rows {
            whole.consume(p, a);
        }

        let mut left = ThresholdSweep::new(thresholds.clone());
        let mut right = ThresholdSweep::new(thresholds);
        for &(p, a) in &rows[..30] {
            left.consume(p, a);
        }
        for &(p, a) in &rows[30..] {
            right.consume(p, a);
        }
        left.merge(&right);

        for (a, b) in whole.matrices().iter().zip(left.matrices()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_criteria_table_covers_all_criteria() {
        let rows: Vec<(f64, f64)> = (0..100)
            .map(|i| {
                let p = i as f64 / 100.0;
                (p, if p > 0.4 { 1.0 } else { 0.0 })
            })
            .collect();
        let auc_data = sweep_rows(&rows).into_auc_data();
        assert_eq!(auc_data.best_by_criterion.len(), ThresholdCriterion::ALL.len());
        let f1_row = &auc_data.best_by_criterion[0];
        assert_eq!(f1_row.criterion, ThresholdCriterion::MaxF1);
        assert_eq!(auc_data.best_threshold, f1_row.threshold);
        // the optimal F1 threshold sits near the class boundary
        assert!(f1_row.threshold > 0.3 && f1_row.threshold < 0.55);
    }
}
