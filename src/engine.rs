//! Local fork-join shard driver
//!
//! Stands in for the external execution engine's map/reduce contract: rows
//! are partitioned into shards, each shard feeds a private accumulator,
//! and shard results merge associatively at the join point. Every row is
//! visited exactly once; merge order only moves the result within floating
//! tolerance. Binomial scoring adds a second, restricted pass that builds
//! the threshold sweep from the stored prediction column.

use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::error::{GlmError, Result};
use crate::metrics::auc::ThresholdSweep;
use crate::metrics::thresholds::make_thresholds;
use crate::metrics::{FinalizeContext, MetricBuilder, ModelCategory, ScoredMetrics};
use crate::scoring::RowScorer;

/// Score a dataset against one submodel's coefficients and finalize its
/// validation metrics.
///
/// `rank` is the submodel's non-zero coefficient count (AIC term);
/// `nclasses` sizes the multinomial accumulator and is ignored otherwise.
pub fn score_and_validate(
    scorer: &RowScorer,
    category: ModelCategory,
    nclasses: usize,
    rank: usize,
    rows: &Array2<f64>,
    actuals: &Array1<f64>,
    n_shards: usize,
) -> Result<ScoredMetrics> {
    if rows.nrows() != actuals.len() {
        return Err(GlmError::ShapeError {
            expected: format!("{} actuals", rows.nrows()),
            actual: format!("{}", actuals.len()),
        });
    }

    let y = actuals.to_vec();
    let (ymu, sigma) = response_moments(&y);
    let new_builder = || MetricBuilder::new(category, scorer.params, nclasses, ymu);

    let n = rows.nrows();
    if n == 0 {
        return Ok(new_builder().finalize(FinalizeContext {
            sigma: 0.0,
            rank,
            auc: None,
        }));
    }

    // First pass: score each row once, keep the prediction column for the
    // restricted sweep pass.
    let ds_rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| scorer.prediction_row(&rows.row(i).to_vec()))
        .collect();

    let chunk = n.div_ceil(n_shards.max(1));
    let builder = ds_rows
        .par_chunks(chunk)
        .zip(y.par_chunks(chunk))
        .map(|(ds_chunk, y_chunk)| {
            let mut b = new_builder();
            for (ds, &actual) in ds_chunk.iter().zip(y_chunk) {
                b.consume(ds, actual);
            }
            b
        })
        .reduce(new_builder, |mut a, b| {
            a.merge(&b);
            a
        });

    // Second pass, binomial only: sweep the class-1 probabilities against
    // the threshold grid.
    let auc = if category == ModelCategory::Binomial && sigma != 0.0 {
        let p1s: Vec<f64> = ds_rows.iter().map(|ds| ds[2]).collect();
        let thresholds = make_thresholds(&p1s);
        let sweep = p1s
            .par_chunks(chunk)
            .zip(y.par_chunks(chunk))
            .map(|(p_chunk, y_chunk)| {
                let mut sweep = ThresholdSweep::new(thresholds.clone());
                for (&p, &actual) in p_chunk.iter().zip(y_chunk) {
                    sweep.consume(p, actual);
                }
                sweep
            })
            .reduce(
                || ThresholdSweep::new(thresholds.clone()),
                |mut a, b| {
                    a.merge(&b);
                    a
                },
            );
        Some(sweep.into_auc_data())
    } else {
        None
    };

    Ok(builder.finalize(FinalizeContext { sigma, rank, auc }))
}

/// Mean and population standard deviation of the response, skipping
/// missing values.
fn response_moments(y: &[f64]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut count = 0u64;
    for &v in y {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let mut ss = 0.0;
    for &v in y {
        if !v.is_nan() {
            ss += (v - mean) * (v - mean);
        }
    }
    (mean, (ss / count as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{Family, FamilyParams};
    use crate::scoring::DataLayout;
    use ndarray::array;

    fn binomial_scorer() -> RowScorer {
        RowScorer::new(
            DataLayout::new(vec![], 1, false),
            FamilyParams::new(Family::Binomial),
            array![3.0, -1.5],
            0.5,
        )
    }

    #[test]
    fn test_shard_counts_are_independent_of_shard_count() {
        let n = 240;
        let rows = Array2::from_shape_fn((n, 1), |(i, _)| i as f64 / n as f64);
        let actuals =
            Array1::from_shape_fn(n, |i| if i as f64 / n as f64 > 0.5 { 1.0 } else { 0.0 });

        let scorer = binomial_scorer();
        let single =
            score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 1).unwrap();
        let many =
            score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 7).unwrap();

        assert_eq!(single.nobs(), many.nobs());
        assert!((single.logloss().unwrap() - many.logloss().unwrap()).abs() < 1e-9);
        assert!(
            (single.residual_deviance().unwrap() - many.residual_deviance().unwrap()).abs() < 1e-9
        );
        assert!((single.auc().unwrap() - many.auc().unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_separable_data_high_auc() {
        let n = 200;
        let rows = Array2::from_shape_fn((n, 1), |(i, _)| if i % 2 == 0 { -2.0 } else { 3.0 });
        let actuals = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let scorer = binomial_scorer();
        let metrics =
            score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 4).unwrap();
        assert!(metrics.auc().unwrap() > 0.99);
        assert!(metrics.best_threshold().is_some());
    }

    #[test]
    fn test_constant_response_reports_not_available() {
        let rows = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let actuals = Array1::from_elem(10, 1.0);
        let scorer = binomial_scorer();
        let metrics =
            score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 2).unwrap();
        assert!(metrics.mse().is_none());
        assert!(metrics.auc().is_none());
    }

    #[test]
    fn test_missing_actuals_excluded() {
        let rows = Array2::from_shape_fn((4, 1), |(i, _)| i as f64 - 1.5);
        let actuals = array![0.0, f64::NAN, 1.0, 1.0];
        let scorer = binomial_scorer();
        let metrics =
            score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 2).unwrap();
        assert_eq!(metrics.nobs(), 3);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let rows = Array2::zeros((4, 1));
        let actuals = Array1::zeros(3);
        let scorer = binomial_scorer();
        let err = score_and_validate(&scorer, ModelCategory::Binomial, 2, 1, &rows, &actuals, 2)
            .unwrap_err();
        assert!(matches!(err, GlmError::ShapeError { .. }));
    }

    #[test]
    fn test_regression_pipeline() {
        let scorer = RowScorer::new(
            DataLayout::new(vec![], 1, false),
            FamilyParams::new(Family::Gaussian),
            array![2.0, 1.0],
            0.5,
        );
        let rows = Array2::from_shape_fn((50, 1), |(i, _)| i as f64);
        let actuals = Array1::from_shape_fn(50, |i| 2.0 * i as f64 + 1.0);
        let metrics =
            score_and_validate(&scorer, ModelCategory::Regression, 1, 2, &rows, &actuals, 4)
                .unwrap();
        // exact fit
        assert!(metrics.mse().unwrap().abs() < 1e-18);
        assert_eq!(metrics.nobs(), 50);
    }
}
