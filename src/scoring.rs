//! Per-row scoring against a dense coefficient vector
//!
//! The coefficient vector is addressed as `[categorical-block][numeric-block]
//! [intercept]`. Categorical levels arrive pre-encoded as small integers;
//! level 0 is the implicit reference level unless `use_all_factor_levels`
//! is set, in which case every level carries an explicit coefficient.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::family::{Family, FamilyParams};

/// Shape of the encoded input space and its mapping into coefficient offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLayout {
    /// Number of levels per categorical feature, in row order
    cat_levels: Vec<usize>,
    /// Number of numeric features following the categorical block
    n_nums: usize,
    /// Include a coefficient for every factor level (no reference level)
    use_all_factor_levels: bool,
    /// Coefficient offset of each categorical feature's first level
    cat_offsets: Vec<usize>,
}

impl DataLayout {
    pub fn new(cat_levels: Vec<usize>, n_nums: usize, use_all_factor_levels: bool) -> Self {
        let mut cat_offsets = Vec::with_capacity(cat_levels.len());
        let mut offset = 0;
        for &levels in &cat_levels {
            cat_offsets.push(offset);
            offset += if use_all_factor_levels { levels } else { levels - 1 };
        }
        Self {
            cat_levels,
            n_nums,
            use_all_factor_levels,
            cat_offsets,
        }
    }

    pub fn n_cats(&self) -> usize {
        self.cat_levels.len()
    }

    pub fn n_nums(&self) -> usize {
        self.n_nums
    }

    /// Coefficient offset of the numeric block
    pub fn num_start(&self) -> usize {
        self.cat_offsets.last().map_or(0, |&o| {
            let last = self.cat_levels[self.cat_levels.len() - 1];
            o + if self.use_all_factor_levels { last } else { last - 1 }
        })
    }

    /// Total coefficient count including the trailing intercept
    pub fn n_coefs(&self) -> usize {
        self.num_start() + self.n_nums + 1
    }
}

/// Output of scoring a single row.
///
/// All fields are `None` when the linear predictor maps to a non-finite
/// mean; a missing prediction is not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowScore {
    /// Mean-scale prediction
    pub mean: Option<f64>,
    /// Thresholded class label, binomial models only
    pub label: Option<f64>,
    /// (class 0, class 1) probability pair, binomial models only
    pub probs: Option<(f64, f64)>,
}

/// Applies one coefficient vector to encoded rows.
///
/// Pure and side-effect free; safe to invoke per row from any number of
/// shards without coordination.
#[derive(Debug, Clone)]
pub struct RowScorer {
    pub layout: DataLayout,
    pub params: FamilyParams,
    pub beta: Array1<f64>,
    /// Decision threshold for binomial labels
    pub threshold: f64,
}

impl RowScorer {
    pub fn new(layout: DataLayout, params: FamilyParams, beta: Array1<f64>, threshold: f64) -> Self {
        debug_assert_eq!(layout.n_coefs(), beta.len());
        Self {
            layout,
            params,
            beta,
            threshold,
        }
    }

    /// Linear predictor: categorical level terms + numeric terms + intercept
    pub fn linear_predictor(&self, row: &[f64]) -> f64 {
        let b = &self.beta;
        let mut eta = 0.0;
        if self.layout.use_all_factor_levels {
            for (i, &offset) in self.layout.cat_offsets.iter().enumerate() {
                eta += b[offset + row[i] as usize];
            }
        } else {
            for (i, &offset) in self.layout.cat_offsets.iter().enumerate() {
                let level = row[i] as usize;
                if level != 0 {
                    eta += b[offset + level - 1];
                }
            }
        }
        let num_start = self.layout.num_start();
        let n_cats = self.layout.n_cats();
        for j in 0..self.layout.n_nums {
            eta += b[num_start + j] * row[n_cats + j];
        }
        eta + b[b.len() - 1]
    }

    /// Score one row: inverse-link mean plus, for binomial, the thresholded
    /// label and the two-class probability pair.
    pub fn score(&self, row: &[f64]) -> RowScore {
        let mu = self.params.link_inv(self.linear_predictor(row));
        if self.params.family == Family::Binomial {
            if !mu.is_finite() {
                return RowScore {
                    mean: None,
                    label: None,
                    probs: None,
                };
            }
            RowScore {
                mean: Some(mu),
                label: Some(if mu >= self.threshold { 1.0 } else { 0.0 }),
                probs: Some((1.0 - mu, mu)),
            }
        } else {
            RowScore {
                mean: if mu.is_finite() { Some(mu) } else { None },
                label: None,
                probs: None,
            }
        }
    }

    /// Score one row into the accumulator's prediction layout:
    /// `[label, p0, p1]` for binomial, `[mean]` otherwise, with NaN for
    /// not-available entries.
    pub fn prediction_row(&self, row: &[f64]) -> Vec<f64> {
        let score = self.score(row);
        if self.params.family == Family::Binomial {
            match (score.label, score.probs) {
                (Some(label), Some((p0, p1))) => vec![label, p0, p1],
                _ => vec![f64::NAN, f64::NAN, f64::NAN],
            }
        } else {
            vec![score.mean.unwrap_or(f64::NAN)]
        }
    }
}
