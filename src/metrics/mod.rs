//! Streaming, mergeable scoring metrics
//!
//! One [`MetricBuilder`] instance lives on each data shard; `consume` feeds
//! it one (prediction, actual) row at a time, `merge` combines shards
//! associatively at the join point, and `finalize` packages the sums into a
//! reportable [`ScoredMetrics`]. The variant is picked once, at construction,
//! from the declared [`ModelCategory`].

pub mod auc;
pub mod binomial;
pub mod confusion;
pub mod multinomial;
pub mod regression;
pub mod thresholds;

use serde::{Deserialize, Serialize};

use crate::family::FamilyParams;
use self::auc::AucData;
use self::binomial::{BinomialBuilder, BinomialMetrics};
use self::multinomial::{MultinomialBuilder, MultinomialMetrics};
use self::regression::{RegressionBuilder, RegressionMetrics};

/// Floor applied to class probabilities inside log-loss sums
pub const LOGLOSS_EPS: f64 = 1e-15;

/// Response category, fixed by the model configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelCategory {
    Regression,
    Binomial,
    Multinomial,
}

/// Inputs needed to turn accumulated sums into reportable ratios.
#[derive(Debug, Clone, Default)]
pub struct FinalizeContext {
    /// Response standard deviation; exactly zero reports all ratio
    /// metrics as not-available
    pub sigma: f64,
    /// Non-zero coefficient count of the scored submodel (AIC term)
    pub rank: usize,
    /// Finalized threshold sweep, binomial only
    pub auc: Option<AucData>,
}

/// Streaming accumulator, one variant per response category.
#[derive(Debug, Clone)]
pub enum MetricBuilder {
    Regression(RegressionBuilder),
    Binomial(BinomialBuilder),
    Multinomial(MultinomialBuilder),
}

impl MetricBuilder {
    /// Pick the variant for a model category. `ymu` (training response
    /// mean) feeds the binomial null-deviance sum; `nclasses` sizes the
    /// multinomial confusion matrix.
    pub fn new(category: ModelCategory, params: FamilyParams, nclasses: usize, ymu: f64) -> Self {
        match category {
            ModelCategory::Regression => MetricBuilder::Regression(RegressionBuilder::new()),
            ModelCategory::Binomial => MetricBuilder::Binomial(BinomialBuilder::new(params, ymu)),
            ModelCategory::Multinomial => {
                MetricBuilder::Multinomial(MultinomialBuilder::new(nclasses))
            }
        }
    }

    /// Accumulate one row. Never blocks, never errors: unavailable rows
    /// are skipped.
    pub fn consume(&mut self, ds: &[f64], actual: f64) {
        match self {
            MetricBuilder::Regression(b) => b.consume(ds, actual),
            MetricBuilder::Binomial(b) => b.consume(ds, actual),
            MetricBuilder::Multinomial(b) => b.consume(ds, actual),
        }
    }

    /// Element-wise addition of another shard's sums. Callers never merge
    /// concurrently into the same target, so no locking is needed.
    pub fn merge(&mut self, other: &MetricBuilder) {
        match (self, other) {
            (MetricBuilder::Regression(a), MetricBuilder::Regression(b)) => a.merge(b),
            (MetricBuilder::Binomial(a), MetricBuilder::Binomial(b)) => a.merge(b),
            (MetricBuilder::Multinomial(a), MetricBuilder::Multinomial(b)) => a.merge(b),
            _ => debug_assert!(false, "merging accumulators of different categories"),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            MetricBuilder::Regression(b) => b.count(),
            MetricBuilder::Binomial(b) => b.count(),
            MetricBuilder::Multinomial(b) => b.count(),
        }
    }

    pub fn finalize(&self, ctx: FinalizeContext) -> ScoredMetrics {
        match self {
            MetricBuilder::Regression(b) => ScoredMetrics::Regression(b.finalize(ctx.sigma)),
            MetricBuilder::Binomial(b) => {
                ScoredMetrics::Binomial(b.finalize(ctx.sigma, ctx.rank, ctx.auc))
            }
            MetricBuilder::Multinomial(b) => ScoredMetrics::Multinomial(b.finalize(ctx.sigma)),
        }
    }
}

/// Finalized metrics attached to a submodel's validation or
/// cross-validation slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScoredMetrics {
    Regression(RegressionMetrics),
    Binomial(BinomialMetrics),
    Multinomial(MultinomialMetrics),
}

impl ScoredMetrics {
    pub fn mse(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Regression(m) => m.mse,
            ScoredMetrics::Binomial(m) => m.mse,
            ScoredMetrics::Multinomial(m) => m.mse,
        }
    }

    pub fn logloss(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Regression(_) => None,
            ScoredMetrics::Binomial(m) => m.logloss,
            ScoredMetrics::Multinomial(m) => m.logloss,
        }
    }

    pub fn residual_deviance(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Binomial(m) => m.residual_deviance,
            _ => None,
        }
    }

    pub fn null_deviance(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Binomial(m) => m.null_deviance,
            _ => None,
        }
    }

    pub fn aic(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Binomial(m) => m.aic,
            _ => None,
        }
    }

    pub fn auc(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Binomial(m) => m.auc_data.as_ref().map(|a| a.auc),
            _ => None,
        }
    }

    /// F1-optimal decision threshold from the sweep, binomial only
    pub fn best_threshold(&self) -> Option<f64> {
        match self {
            ScoredMetrics::Binomial(m) => m.auc_data.as_ref().map(|a| a.best_threshold),
            _ => None,
        }
    }

    pub fn nobs(&self) -> u64 {
        match self {
            ScoredMetrics::Regression(m) => m.nobs,
            ScoredMetrics::Binomial(m) => m.nobs,
            ScoredMetrics::Multinomial(m) => m.nobs,
        }
    }
}
