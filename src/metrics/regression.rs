//! Streaming accumulator for regression responses

use serde::{Deserialize, Serialize};

/// Per-shard squared-error accumulator.
#[derive(Debug, Clone, Default)]
pub struct RegressionBuilder {
    sumsqe: f64,
    count: u64,
}

impl RegressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `ds[0]` is the point prediction. Rows with a missing prediction or
    /// actual are skipped.
    pub fn consume(&mut self, ds: &[f64], actual: f64) {
        if actual.is_nan() || ds[0].is_nan() {
            return;
        }
        let err = actual - ds[0];
        self.sumsqe += err * err;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &RegressionBuilder) {
        self.sumsqe += other.sumsqe;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// A zero response standard deviation reports not-available rather
    /// than dividing.
    pub fn finalize(&self, sigma: f64) -> RegressionMetrics {
        let mse = if sigma != 0.0 && self.count > 0 {
            Some(self.sumsqe / self.count as f64)
        } else {
            None
        };
        RegressionMetrics {
            mse,
            sigma,
            nobs: self.count,
        }
    }
}

/// Finalized regression metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: Option<f64>,
    pub sigma: f64,
    pub nobs: u64,
}
