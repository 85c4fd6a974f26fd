//! Confusion matrices and their derived scores

use serde::{Deserialize, Serialize};

/// Square confusion matrix indexed `[actual][predicted]`.
///
/// Mergeable by element-wise addition, so independent shards can count
/// into private matrices and combine at the join point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(nclasses: usize) -> Self {
        Self {
            counts: vec![vec![0; nclasses]; nclasses],
        }
    }

    pub fn nclasses(&self) -> usize {
        self.counts.len()
    }

    pub fn increment(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn count(&self, actual: usize, predicted: usize) -> u64 {
        self.counts[actual][predicted]
    }

    /// Element-wise addition of another matrix of the same shape
    pub fn add(&mut self, other: &ConfusionMatrix) {
        debug_assert_eq!(self.nclasses(), other.nclasses());
        for (row, other_row) in self.counts.iter_mut().zip(&other.counts) {
            for (cell, &o) in row.iter_mut().zip(other_row) {
                *cell += o;
            }
        }
    }

    /// Total rows counted
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Rows predicted positive (binary matrices)
    pub fn predicted_positives(&self) -> u64 {
        self.counts[0][1] + self.counts[1][1]
    }

    // Binary cell accessors; class 1 is the positive class.
    pub fn tn(&self) -> u64 {
        self.counts[0][0]
    }
    pub fn fp(&self) -> u64 {
        self.counts[0][1]
    }
    pub fn fn_(&self) -> u64 {
        self.counts[1][0]
    }
    pub fn tp(&self) -> u64 {
        self.counts[1][1]
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.tp() + self.tn()) as f64 / total as f64
    }

    pub fn error(&self) -> f64 {
        1.0 - self.accuracy()
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp(), self.tp() + self.fp())
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp(), self.tp() + self.fn_())
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn(), self.tn() + self.fp())
    }

    pub fn f1(&self) -> f64 {
        self.f_beta(1.0)
    }

    pub fn f2(&self) -> f64 {
        self.f_beta(2.0)
    }

    pub fn f0point5(&self) -> f64 {
        self.f_beta(0.5)
    }

    pub fn f_beta(&self, beta: f64) -> f64 {
        let p = self.precision();
        let r = self.recall();
        let b2 = beta * beta;
        let den = b2 * p + r;
        if den == 0.0 {
            0.0
        } else {
            (1.0 + b2) * p * r / den
        }
    }

    /// Matthews correlation coefficient
    pub fn mcc(&self) -> f64 {
        let (tp, tn, fp, fn_) = (
            self.tp() as f64,
            self.tn() as f64,
            self.fp() as f64,
            self.fn_() as f64,
        );
        let den = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if den == 0.0 {
            0.0
        } else {
            (tp * tn - fp * fn_) / den
        }
    }

    /// Worst per-class error rate
    pub fn max_per_class_error(&self) -> f64 {
        let class0 = ratio(self.fp(), self.tn() + self.fp());
        let class1 = ratio(self.fn_(), self.tp() + self.fn_());
        class0.max(class1)
    }

    /// True-positive rate (recall) and false-positive rate, for ROC points
    pub fn tpr_fpr(&self) -> (f64, f64) {
        (self.recall(), ratio(self.fp(), self.tn() + self.fp()))
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
