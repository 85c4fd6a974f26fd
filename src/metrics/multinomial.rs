//! Streaming accumulator for multinomial responses

use serde::{Deserialize, Serialize};

use super::confusion::ConfusionMatrix;
use super::LOGLOSS_EPS;

/// Per-shard multinomial accumulator: confusion counts, top-K hit-ratio
/// votes, squared error and log-loss.
#[derive(Debug, Clone)]
pub struct MultinomialBuilder {
    nclasses: usize,
    cm: ConfusionMatrix,
    /// Hit votes per rank, length K = min(10, nclasses - 1)
    hits: Vec<u64>,
    sumsqe: f64,
    logloss: f64,
    count: u64,
}

impl MultinomialBuilder {
    pub fn new(nclasses: usize) -> Self {
        let k = nclasses.saturating_sub(1).min(10);
        Self {
            nclasses,
            cm: ConfusionMatrix::new(nclasses),
            hits: vec![0; k],
            sumsqe: 0.0,
            logloss: 0.0,
            count: 0,
        }
    }

    /// `ds[0]` is the predicted class, `ds[1..=nclasses]` the class
    /// distribution.
    pub fn consume(&mut self, ds: &[f64], actual: f64) {
        if actual.is_nan() || ds[0].is_nan() {
            return;
        }
        let iact = actual as usize;

        let err = if iact + 1 < ds.len() {
            1.0 - ds[iact + 1]
        } else {
            1.0
        };
        self.sumsqe += err * err;

        self.cm.increment(iact, ds[0] as usize);
        self.count += 1;

        if iact + 1 < ds.len() {
            if !self.hits.is_empty() {
                update_hits(iact, &ds[1..], &mut self.hits);
            }
            self.logloss -= ds[iact + 1].max(LOGLOSS_EPS).ln();
        }
    }

    pub fn merge(&mut self, other: &MultinomialBuilder) {
        debug_assert_eq!(self.hits.len(), other.hits.len());
        self.cm.add(&other.cm);
        for (h, &o) in self.hits.iter_mut().zip(&other.hits) {
            *h += o;
        }
        self.sumsqe += other.sumsqe;
        self.logloss += other.logloss;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn finalize(&self, sigma: f64) -> MultinomialMetrics {
        if sigma == 0.0 || self.count == 0 {
            return MultinomialMetrics {
                mse: None,
                logloss: None,
                confusion: None,
                hit_ratios: None,
                nclasses: self.nclasses,
                sigma,
                nobs: self.count,
            };
        }
        let n = self.count as f64;
        MultinomialMetrics {
            mse: Some(self.sumsqe / n),
            logloss: Some(self.logloss / n),
            confusion: Some(self.cm.clone()),
            hit_ratios: Some(self.hits.iter().map(|&h| h as f64 / n).collect()),
            nclasses: self.nclasses,
            sigma,
            nobs: self.count,
        }
    }
}

/// Record the rank at which the true class appears in the prediction
/// distribution, counting only the first `hits.len()` ranks.
///
/// Ranks order probabilities descending; equal probabilities are consumed
/// in ascending class-index order, so the tie-break is deterministic
/// (lowest class index wins).
fn update_hits(iact: usize, dist: &[f64], hits: &mut [u64]) {
    let p = dist[iact];
    let mut rank = 0;
    for (j, &q) in dist.iter().enumerate() {
        if q > p || (q == p && j < iact) {
            rank += 1;
        }
    }
    if rank < hits.len() {
        hits[rank] += 1;
    }
}

/// Finalized multinomial metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialMetrics {
    pub mse: Option<f64>,
    pub logloss: Option<f64>,
    pub confusion: Option<ConfusionMatrix>,
    /// Fraction of rows whose true class appeared within each top rank
    pub hit_ratios: Option<Vec<f64>>,
    pub nclasses: usize,
    pub sigma: f64,
    pub nobs: u64,
}
