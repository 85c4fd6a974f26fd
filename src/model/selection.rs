//! Model selection along the regularization path

use serde::{Deserialize, Serialize};

use super::Submodel;
use crate::metrics::ScoredMetrics;

/// Comparison used when scanning the path for the best submodel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionCriterion {
    /// Minimize residual deviance
    #[default]
    ResidualDeviance,
    /// Maximize AUC
    Auc,
}

/// Deterministic, pure selection of `best_index`.
///
/// The default candidate is the last (least regularized) submodel. With at
/// least three submodels the path is scanned for a better one:
/// cross-validation metrics are preferred uniformly as soon as any submodel
/// carries them, submodels without the chosen metric kind are skipped, and
/// ties keep the earlier (larger-lambda) candidate.
pub fn pick_best(submodels: &[Submodel], criterion: SelectionCriterion) -> usize {
    let default = submodels.len().saturating_sub(1);
    if submodels.len() < 3 {
        return default;
    }

    let use_xval = submodels.iter().any(|sm| sm.cross_validation.is_some());
    let mut best: Option<(usize, f64)> = None;
    for (i, sm) in submodels.iter().enumerate() {
        let metrics: Option<&ScoredMetrics> = if use_xval {
            sm.cross_validation.as_ref()
        } else {
            sm.validation.as_ref()
        };
        let Some(metrics) = metrics else { continue };
        let Some(score) = (match criterion {
            SelectionCriterion::ResidualDeviance => metrics.residual_deviance(),
            SelectionCriterion::Auc => metrics.auc(),
        }) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((_, current)) => match criterion {
                SelectionCriterion::ResidualDeviance => score < current,
                SelectionCriterion::Auc => score > current,
            },
        };
        if better {
            best = Some((i, score));
        }
    }

    match best {
        Some((i, _)) => {
            if i != default {
                tracing::debug!(best_index = i, ?criterion, "selection moved off path tail");
            }
            i
        }
        None => default,
    }
}
