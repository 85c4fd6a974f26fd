//! Streaming accumulator for binomial responses
//!
//! Beyond the squared-error and log-loss sums, the binomial variant carries
//! the GLM deviance sums: residual deviance against the fitted mean and
//! null deviance against the training response mean.

use serde::{Deserialize, Serialize};

use super::auc::AucData;
use super::LOGLOSS_EPS;
use crate::family::FamilyParams;

/// Per-shard binomial accumulator.
///
/// Predictions arrive as `[label, p0, p1]`; `p1` is the probability of
/// the positive class and doubles as the fitted mean for deviance.
#[derive(Debug, Clone)]
pub struct BinomialBuilder {
    params: FamilyParams,
    /// Training response mean, the null model's prediction
    ymu: f64,
    sumsqe: f64,
    logloss: f64,
    residual_deviance: f64,
    null_deviance: f64,
    count: u64,
}

impl BinomialBuilder {
    pub fn new(params: FamilyParams, ymu: f64) -> Self {
        Self {
            params,
            ymu,
            sumsqe: 0.0,
            logloss: 0.0,
            residual_deviance: 0.0,
            null_deviance: 0.0,
            count: 0,
        }
    }

    pub fn consume(&mut self, ds: &[f64], actual: f64) {
        if actual.is_nan() || ds[0].is_nan() {
            return;
        }
        let iact = actual as usize;
        let err = 1.0 - ds[iact + 1];
        self.sumsqe += err * err;

        let p1 = ds[2];
        if iact == 0 {
            self.logloss -= (1.0 - p1.min(1.0 - LOGLOSS_EPS)).ln();
        } else {
            self.logloss -= p1.max(LOGLOSS_EPS).ln();
        }

        self.residual_deviance += self.params.deviance(actual, p1);
        self.null_deviance += self.params.deviance(actual, self.ymu);
        self.count += 1;
    }

    pub fn merge(&mut self, other: &BinomialBuilder) {
        self.sumsqe += other.sumsqe;
        self.logloss += other.logloss;
        self.residual_deviance += other.residual_deviance;
        self.null_deviance += other.null_deviance;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Package sums into ratios. `rank` is the selected submodel's count of
    /// non-zero coefficients, used for AIC; `auc` is the finalized product
    /// of the separate threshold-sweep pass.
    pub fn finalize(&self, sigma: f64, rank: usize, auc: Option<AucData>) -> BinomialMetrics {
        if sigma == 0.0 || self.count == 0 {
            return BinomialMetrics {
                mse: None,
                logloss: None,
                residual_deviance: None,
                null_deviance: None,
                aic: None,
                auc_data: None,
                sigma,
                nobs: self.count,
            };
        }
        let n = self.count as f64;
        BinomialMetrics {
            mse: Some(self.sumsqe / n),
            logloss: Some(self.logloss / n),
            residual_deviance: Some(self.residual_deviance),
            null_deviance: Some(self.null_deviance),
            aic: Some(self.residual_deviance + 2.0 * rank as f64),
            auc_data: auc,
            sigma,
            nobs: self.count,
        }
    }
}

/// Finalized binomial metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinomialMetrics {
    pub mse: Option<f64>,
    pub logloss: Option<f64>,
    pub residual_deviance: Option<f64>,
    pub null_deviance: Option<f64>,
    pub aic: Option<f64>,
    pub auc_data: Option<AucData>,
    pub sigma: f64,
    pub nobs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Family;

    fn builder() -> BinomialBuilder {
        BinomialBuilder::new(FamilyParams::new(Family::Binomial), 0.5)
    }

    #[test]
    fn test_squared_error_from_class_probability() {
        let mut b = builder();
        // actual 1 with p1 = 0.8: err = 0.2
        b.consume(&[1.0, 0.2, 0.8], 1.0);
        let m = b.finalize(1.0, 0, None);
        assert!((m.mse.unwrap() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_logloss_certain_correct_is_zero() {
        let mut b = builder();
        b.consume(&[1.0, 0.0, 1.0], 1.0);
        b.consume(&[0.0, 1.0, 0.0], 0.0);
        let m = b.finalize(1.0, 0, None);
        assert!(m.logloss.unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_logloss_certain_wrong_is_bounded_by_eps() {
        let mut b = builder();
        b.consume(&[0.0, 1.0, 0.0], 1.0); // p1 = 0 for an actual 1
        let m = b.finalize(1.0, 0, None);
        let expected = -LOGLOSS_EPS.ln();
        assert!((m.logloss.unwrap() - expected).abs() < 1e-6);
        assert!(m.logloss.unwrap().is_finite());
    }

    #[test]
    fn test_deviance_sums() {
        let params = FamilyParams::new(Family::Binomial);
        let mut b = BinomialBuilder::new(params, 0.5);
        b.consume(&[1.0, 0.3, 0.7], 1.0);
        b.consume(&[0.0, 0.6, 0.4], 0.0);
        let m = b.finalize(1.0, 0, None);
        let expected_res = params.deviance(1.0, 0.7) + params.deviance(0.0, 0.4);
        let expected_null = params.deviance(1.0, 0.5) + params.deviance(0.0, 0.5);
        assert!((m.residual_deviance.unwrap() - expected_res).abs() < 1e-12);
        assert!((m.null_deviance.unwrap() - expected_null).abs() < 1e-12);
    }

    #[test]
    fn test_aic_adds_twice_rank() {
        let mut b = builder();
        b.consume(&[1.0, 0.3, 0.7], 1.0);
        let m = b.finalize(1.0, 3, None);
        assert!((m.aic.unwrap() - (m.residual_deviance.unwrap() + 6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_merge_associative_and_commutative() {
        let rows: [(f64, [f64; 3]); 3] = [
            (1.0, [1.0, 0.3, 0.7]),
            (0.0, [0.0, 0.9, 0.1]),
            (1.0, [0.0, 0.6, 0.4]),
        ];

        let mut whole = builder();
        for (y, ds) in &rows {
            whole.consume(ds, *y);
        }

        // one builder per row, merged in a different order
        let mut parts: Vec<BinomialBuilder> = rows
            .iter()
            .map(|(y, ds)| {
                let mut b = builder();
                b.consume(ds, *y);
                b
            })
            .collect();
        let mut merged = parts.pop().unwrap();
        let first = parts.remove(0);
        merged.merge(&parts.pop().unwrap());
        merged.merge(&first);

        let a = whole.finalize(1.0, 0, None);
        let b = merged.finalize(1.0, 0, None);
        assert!((a.mse.unwrap() - b.mse.unwrap()).abs() < 1e-12);
        assert!((a.logloss.unwrap() - b.logloss.unwrap()).abs() < 1e-12);
        assert!((a.residual_deviance.unwrap() - b.residual_deviance.unwrap()).abs() < 1e-12);
        assert_eq!(a.nobs, b.nobs);
    }

    #[test]
    fn test_zero_sigma_not_available() {
        let mut b = builder();
        b.consume(&[1.0, 0.3, 0.7], 1.0);
        let m = b.finalize(0.0, 2, None);
        assert!(m.mse.is_none());
        assert!(m.logloss.is_none());
        assert!(m.aic.is_none());
    }
}
