//! Regularization-path model: submodels, cached summaries, transforms
//!
//! A [`GlmModel`] owns an ordered array of [`Submodel`]s, one per lambda,
//! sorted by strictly decreasing penalty strength. The array is rebuilt on
//! every update, never mutated in place, so a reader holding an old
//! snapshot never observes a partially-applied change.

pub mod selection;
pub mod store;

use std::collections::HashMap;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::family::FamilyParams;
use crate::metrics::auc::{CriterionScore, ThresholdScores};
use crate::metrics::ScoredMetrics;
use self::selection::SelectionCriterion;

/// Two lambdas within this relative tolerance address the same submodel.
pub const LAMBDA_TOLERANCE: f64 = 1e-5;

/// One fitted point on the regularization path.
///
/// Coefficients are stored sparse: `idxs` addresses the full coefficient
/// space, `beta` holds the matching values, `norm_beta` optionally the
/// standardized-scale duplicates. Immutable once both metric slots are
/// set; replacement happens by rebuilding the containing array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submodel {
    /// Penalty strength; strictly positive
    pub lambda: f64,
    /// Indices of the non-zero coefficients
    pub idxs: Vec<usize>,
    /// Natural-scale coefficient values, parallel to `idxs`
    pub beta: Vec<f64>,
    /// Standardized-scale values, parallel to `idxs`
    pub norm_beta: Option<Vec<f64>>,
    /// Count of non-zero coefficients
    pub rank: usize,
    /// Solver iteration that produced this fit
    pub iteration: u32,
    /// Fit wall time in milliseconds
    pub run_time_ms: u64,
    /// Metrics from the validation scoring pass
    pub validation: Option<ScoredMetrics>,
    /// Metrics attached later by the cross-validation process
    pub cross_validation: Option<ScoredMetrics>,
}

impl Submodel {
    /// Build from a dense coefficient vector, keeping only the non-zero
    /// entries.
    pub fn new(
        lambda: f64,
        beta: &[f64],
        norm_beta: Option<&[f64]>,
        iteration: u32,
        run_time_ms: u64,
    ) -> Self {
        let idxs: Vec<usize> = beta
            .iter()
            .enumerate()
            .filter(|(_, &b)| b != 0.0)
            .map(|(i, _)| i)
            .collect();
        let sparse_beta: Vec<f64> = idxs.iter().map(|&i| beta[i]).collect();
        let sparse_norm = norm_beta.map(|nb| idxs.iter().map(|&i| nb[i]).collect());
        let rank = idxs.len();
        Self {
            lambda,
            idxs,
            beta: sparse_beta,
            norm_beta: sparse_norm,
            rank,
            iteration,
            run_time_ms,
            validation: None,
            cross_validation: None,
        }
    }

    pub fn with_validation(mut self, metrics: ScoredMetrics) -> Self {
        self.validation = Some(metrics);
        self
    }

    /// Dense expansion of the sparse coefficients (zeros elsewhere)
    pub fn expand(&self, n_coefs: usize) -> Array1<f64> {
        let mut dense = Array1::zeros(n_coefs);
        for (&i, &b) in self.idxs.iter().zip(&self.beta) {
            dense[i] = b;
        }
        dense
    }
}

/// Cached per-threshold tables exposed to the serialization layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub best_lambda: f64,
    pub threshold: f64,
    pub residual_deviance: Option<f64>,
    pub null_deviance: Option<f64>,
    pub aic: Option<f64>,
    pub auc: Option<f64>,
    /// Metric scores at every swept threshold
    pub threshold_scores: Vec<ThresholdScores>,
    /// Best operating point per criterion
    pub best_by_criterion: Vec<CriterionScore>,
}

/// A model identity and its regularization path.
///
/// The summary fields after `best_index` are cache copies recomputed by
/// [`GlmModel::set_best`] whenever the selection changes; the submodels
/// are the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlmModel {
    pub params: FamilyParams,
    /// Names of the full coefficient space, intercept last
    pub coef_names: Vec<String>,
    /// Training row count
    pub nobs: u64,
    /// Training response mean
    pub ymu: f64,
    /// Largest lambda of the search
    pub lambda_max: f64,
    /// Path ordered by strictly decreasing lambda
    pub submodels: Vec<Submodel>,
    pub best_index: usize,

    // Cached summary of the selected submodel.
    pub threshold: f64,
    pub residual_deviance: Option<f64>,
    pub null_deviance: Option<f64>,
    pub residual_dof: Option<f64>,
    pub null_dof: Option<f64>,
    pub aic: Option<f64>,
    pub auc: Option<f64>,
    /// Dense expansion of the selected submodel's coefficients
    pub global_beta: Vec<f64>,
}

impl GlmModel {
    pub fn new(
        params: FamilyParams,
        coef_names: Vec<String>,
        nobs: u64,
        ymu: f64,
        lambda_max: f64,
    ) -> Self {
        let n_coefs = coef_names.len();
        Self {
            params,
            coef_names,
            nobs,
            ymu,
            lambda_max,
            submodels: Vec::new(),
            best_index: 0,
            threshold: 0.5,
            residual_deviance: None,
            null_deviance: None,
            residual_dof: None,
            null_dof: None,
            aic: None,
            auc: None,
            global_beta: vec![0.0; n_coefs],
        }
    }

    pub fn n_coefs(&self) -> usize {
        self.coef_names.len()
    }

    pub fn best(&self) -> Option<&Submodel> {
        self.submodels.get(self.best_index)
    }

    /// Locate the submodel for a lambda within [`LAMBDA_TOLERANCE`].
    ///
    /// `Ok(i)` is a match at position i; `Err(i)` is the insertion point
    /// that preserves the decreasing-lambda order.
    pub fn submodel_index_for(&self, lambda: f64) -> std::result::Result<usize, usize> {
        for (i, sm) in self.submodels.iter().enumerate() {
            let rel = if lambda != 0.0 {
                ((sm.lambda - lambda) / lambda).abs()
            } else {
                sm.lambda.abs()
            };
            if sm.lambda == lambda || rel < LAMBDA_TOLERANCE {
                return Ok(i);
            }
            if sm.lambda < lambda {
                return Err(i);
            }
        }
        Err(self.submodels.len())
    }

    /// Pure transform: insert or replace a submodel at its lambda, then
    /// re-run selection.
    ///
    /// A submodel already present with an equal-or-higher iteration count
    /// makes the incoming one stale; stale fits are discarded silently.
    pub fn apply_submodel(mut self, sm: Submodel, criterion: SelectionCriterion) -> GlmModel {
        match self.submodel_index_for(sm.lambda) {
            Err(pos) => self.submodels.insert(pos, sm),
            Ok(i) => {
                if self.submodels[i].iteration < sm.iteration {
                    self.submodels[i] = sm;
                } else {
                    tracing::debug!(
                        lambda = sm.lambda,
                        iteration = sm.iteration,
                        existing = self.submodels[i].iteration,
                        "discarding stale submodel update"
                    );
                    return self;
                }
            }
        }
        self.pick_best(criterion);
        self
    }

    /// Pure transform: replace only the cross-validation slot of the
    /// submodel at `lambda`, then re-run selection.
    pub fn apply_cross_validation(
        mut self,
        lambda: f64,
        metrics: ScoredMetrics,
        criterion: SelectionCriterion,
    ) -> GlmModel {
        match self.submodel_index_for(lambda) {
            Ok(i) => {
                self.submodels[i].cross_validation = Some(metrics);
                self.pick_best(criterion);
            }
            Err(_) => {
                tracing::warn!(lambda, "no submodel at lambda for cross-validation metrics");
            }
        }
        self
    }

    /// Re-run the selection policy and refresh the cached summary.
    pub fn pick_best(&mut self, criterion: SelectionCriterion) {
        if self.submodels.is_empty() {
            return;
        }
        let best = selection::pick_best(&self.submodels, criterion);
        self.set_best(best);
    }

    /// Recompute every cached summary field from the submodel at `index`.
    ///
    /// With no metrics attached, all numeric summaries become
    /// not-available and the threshold falls back to 0.5.
    pub fn set_best(&mut self, index: usize) {
        self.best_index = index;
        let sm = &self.submodels[index];
        let metrics = sm.validation.as_ref().or(sm.cross_validation.as_ref());
        match metrics {
            Some(m) => {
                self.threshold = m.best_threshold().unwrap_or(0.5);
                self.residual_deviance = m.residual_deviance();
                self.null_deviance = m.null_deviance();
                self.residual_dof = Some((self.nobs as f64) - sm.rank as f64);
                self.null_dof = Some(self.nobs as f64 - 1.0);
                self.aic = m.aic();
                self.auc = m.auc();
            }
            None => {
                self.threshold = 0.5;
                self.residual_deviance = None;
                self.null_deviance = None;
                self.residual_dof = None;
                self.null_dof = None;
                self.aic = None;
                self.auc = None;
            }
        }
        self.global_beta = sm.expand(self.n_coefs()).to_vec();
    }

    /// Coefficients of the selected submodel keyed by name
    pub fn coefficients(&self) -> HashMap<String, f64> {
        self.coef_names
            .iter()
            .cloned()
            .zip(self.global_beta.iter().copied())
            .collect()
    }

    /// Reportable summary of the selected submodel, with the threshold
    /// tables when a binomial sweep is attached.
    pub fn summary(&self) -> ModelSummary {
        let (threshold_scores, best_by_criterion) = self
            .best()
            .and_then(|sm| sm.validation.as_ref().or(sm.cross_validation.as_ref()))
            .and_then(|m| match m {
                ScoredMetrics::Binomial(b) => b.auc_data.as_ref(),
                _ => None,
            })
            .map(|auc| (auc.scores.clone(), auc.best_by_criterion.clone()))
            .unwrap_or_default();
        ModelSummary {
            best_lambda: self.best().map_or(f64::NAN, |sm| sm.lambda),
            threshold: self.threshold,
            residual_deviance: self.residual_deviance,
            null_deviance: self.null_deviance,
            aic: self.aic,
            auc: self.auc,
            threshold_scores,
            best_by_criterion,
        }
    }
}
