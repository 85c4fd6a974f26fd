//! Integration test: regularization path end-to-end
//!
//! Drives the full flow: concurrent submodel fits land in the versioned
//! store, each submodel is scored by the shard driver, cross-validation
//! metrics arrive late, and selection republishes the cached summary.

use std::sync::Arc;

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use glmpath::prelude::*;

/// Synthetic binary-response data with one numeric feature.
fn binary_dataset(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows: Array2<f64> = Array2::from_shape_fn((n, 1), |_| rng.gen_range(-3.0..3.0));
    let actuals = Array1::from_shape_fn(n, |i| {
        let x = rows[(i, 0)];
        let p = 1.0 / (1.0 + (-2.0 * x).exp());
        if rng.gen_bool(p.clamp(0.0, 1.0)) {
            1.0
        } else {
            0.0
        }
    });
    (rows, actuals)
}

fn scorer_for(beta: &[f64]) -> RowScorer {
    RowScorer::new(
        DataLayout::new(vec![], 1, false),
        FamilyParams::new(Family::Binomial),
        Array1::from_vec(beta.to_vec()),
        0.5,
    )
}

/// Score one candidate coefficient vector and wrap it as a submodel.
fn fit_submodel(
    lambda: f64,
    beta: &[f64],
    rows: &Array2<f64>,
    actuals: &Array1<f64>,
) -> Submodel {
    let scorer = scorer_for(beta);
    let submodel = Submodel::new(lambda, beta, None, 10, 25);
    let metrics = score_and_validate(
        &scorer,
        ModelCategory::Binomial,
        2,
        submodel.rank,
        rows,
        actuals,
        4,
    )
    .unwrap();
    submodel.with_validation(metrics)
}

fn empty_model() -> GlmModel {
    GlmModel::new(
        FamilyParams::new(Family::Binomial),
        vec!["x".into(), "Intercept".into()],
        400,
        0.5,
        1.0,
    )
}

#[test]
fn test_concurrent_path_search_and_selection() {
    let (rows, actuals) = binary_dataset(400, 7);
    let store = Arc::new(MemStore::new());
    store.insert("model", &empty_model()).unwrap();

    // Shrinking lambda relaxes the coefficient toward the true slope 2.0;
    // each fit runs on its own thread against the shared store.
    let path = [
        (1.0, vec![0.2, 0.0]),
        (0.5, vec![0.8, 0.0]),
        (0.25, vec![1.6, 0.0]),
        (0.125, vec![2.0, 0.0]),
    ];

    let rows = Arc::new(rows);
    let actuals = Arc::new(actuals);
    let handles: Vec<_> = path
        .iter()
        .cloned()
        .map(|(lambda, beta)| {
            let store = Arc::clone(&store);
            let rows = Arc::clone(&rows);
            let actuals = Arc::clone(&actuals);
            std::thread::spawn(move || {
                let sm = fit_submodel(lambda, &beta, &rows, &actuals);
                update_submodel(
                    &*store,
                    "model",
                    sm,
                    SelectionCriterion::default(),
                    DEFAULT_MAX_RETRIES,
                )
                .unwrap()
            })
        })
        .collect();
    for h in handles {
        assert!(h.join().unwrap());
    }

    let (_, model) = store.fetch("model").unwrap().unwrap();
    let lambdas: Vec<f64> = model.submodels.iter().map(|s| s.lambda).collect();
    assert_eq!(lambdas, vec![1.0, 0.5, 0.25, 0.125]);

    // the closest-to-true fit has the lowest residual deviance
    assert_eq!(model.best_index, 3);
    assert!(model.residual_deviance.unwrap() < model.null_deviance.unwrap());
    assert!(model.auc.unwrap() > 0.8);
    assert_eq!(model.global_beta, vec![2.0, 0.0]);

    let summary = model.summary();
    assert_eq!(summary.best_lambda, 0.125);
    assert!(!summary.threshold_scores.is_empty());
    assert_eq!(summary.best_by_criterion.len(), 9);
}

#[test]
fn test_late_cross_validation_overrides_selection() {
    let (rows, actuals) = binary_dataset(300, 11);
    let store = MemStore::new();
    store.insert("model", &empty_model()).unwrap();

    for (lambda, beta) in [
        (1.0, vec![0.2, 0.0]),
        (0.5, vec![0.8, 0.0]),
        (0.25, vec![2.0, 0.0]),
    ] {
        let sm = fit_submodel(lambda, &beta, &rows, &actuals);
        update_submodel(&store, "model", sm, SelectionCriterion::default(), 10).unwrap();
    }
    let (_, before) = store.fetch("model").unwrap().unwrap();
    assert_eq!(before.best_index, 2);

    // cross-validation disagrees: once any submodel carries xval metrics,
    // only xval metrics drive selection, so the middle lambda wins.
    let (cv_rows, cv_actuals) = binary_dataset(300, 13);
    let cv = score_and_validate(
        &scorer_for(&[0.8, 0.0]),
        ModelCategory::Binomial,
        2,
        1,
        &cv_rows,
        &cv_actuals,
        2,
    )
    .unwrap();
    attach_cross_validation(&store, "model", 0.5, cv, SelectionCriterion::default(), 10).unwrap();

    let (_, after) = store.fetch("model").unwrap().unwrap();
    assert!(after.submodels[1].cross_validation.is_some());
    assert_eq!(after.best_index, 1);
    assert_eq!(after.global_beta, vec![0.8, 0.0]);
}

#[test]
fn test_cancelled_model_stops_pipeline_quietly() {
    let (rows, actuals) = binary_dataset(100, 3);
    let store = MemStore::new();
    store.insert("model", &empty_model()).unwrap();
    store.remove("model").unwrap();

    let sm = fit_submodel(0.5, &[1.0, 0.0], &rows, &actuals);
    let committed =
        update_submodel(&store, "model", sm, SelectionCriterion::default(), 10).unwrap();
    assert!(!committed);
}

#[test]
fn test_snapshot_survives_serde() {
    let (rows, actuals) = binary_dataset(120, 29);
    let mut model = empty_model();
    let sm = fit_submodel(0.5, &[1.5, 0.0], &rows, &actuals);
    model = model.apply_submodel(sm, SelectionCriterion::default());

    let json = serde_json::to_string(&model).unwrap();
    let back: GlmModel = serde_json::from_str(&json).unwrap();
    assert_eq!(back.submodels.len(), 1);
    assert_eq!(back.best_index, model.best_index);
    assert_eq!(back.global_beta, model.global_beta);
    assert_eq!(back.auc, model.auc);
}
