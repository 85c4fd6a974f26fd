//! Optimistic versioned snapshot store for models
//!
//! The model is mutated exclusively through read-compute-commit-retry:
//! fetch the current snapshot, run a pure transform, commit conditionally
//! on the version observed at fetch time, and retry from a fresh fetch on
//! conflict. Transforms must be pure functions of the snapshot so retries
//! are correctness-preserving. A concurrently deleted model (cancellation)
//! is a successful no-op, not an error.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::selection::SelectionCriterion;
use super::{GlmModel, Submodel};
use crate::error::{GlmError, Result};
use crate::metrics::ScoredMetrics;

/// Retry budget before a write escalates to [`GlmError::StoreContention`].
pub const DEFAULT_MAX_RETRIES: usize = 100;

/// Outcome of a conditional commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Another writer committed since the expected version was fetched
    Conflict,
}

/// Durable-store collaborator interface: versioned fetch plus conditional
/// write. An absent model has implicit version 0, so a commit expecting
/// version 0 creates it.
pub trait SnapshotStore {
    fn fetch(&self, id: &str) -> Result<Option<(u64, GlmModel)>>;
    fn commit_if_unchanged(&self, id: &str, expected_version: u64, model: &GlmModel)
        -> Result<CommitOutcome>;
    fn remove(&self, id: &str) -> Result<()>;
}

/// In-memory store keeping JSON-encoded snapshots behind a version counter.
#[derive(Default)]
pub struct MemStore {
    entries: RwLock<HashMap<String, (u64, String)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the model, failing over nothing: version starts at 1.
    pub fn insert(&self, id: &str, model: &GlmModel) -> Result<()> {
        let encoded = serde_json::to_string(model)?;
        self.entries
            .write()
            .insert(id.to_string(), (1, encoded));
        Ok(())
    }
}

impl SnapshotStore for MemStore {
    fn fetch(&self, id: &str) -> Result<Option<(u64, GlmModel)>> {
        let entries = self.entries.read();
        match entries.get(id) {
            Some((version, encoded)) => {
                let model: GlmModel = serde_json::from_str(encoded)?;
                Ok(Some((*version, model)))
            }
            None => Ok(None),
        }
    }

    fn commit_if_unchanged(
        &self,
        id: &str,
        expected_version: u64,
        model: &GlmModel,
    ) -> Result<CommitOutcome> {
        let encoded = serde_json::to_string(model)?;
        let mut entries = self.entries.write();
        let current = entries.get(id).map_or(0, |(v, _)| *v);
        if current != expected_version {
            return Ok(CommitOutcome::Conflict);
        }
        entries.insert(id.to_string(), (expected_version + 1, encoded));
        Ok(CommitOutcome::Committed)
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.entries.write().remove(id);
        Ok(())
    }
}

/// Read-compute-commit-retry loop around a pure transform.
///
/// Returns `Ok(true)` once committed, `Ok(false)` when the model is absent
/// (treated as cancelled), and [`GlmError::StoreContention`] after
/// `max_retries` conflicting commits.
pub fn atomic_update<S, F>(store: &S, id: &str, max_retries: usize, transform: F) -> Result<bool>
where
    S: SnapshotStore,
    F: Fn(GlmModel) -> GlmModel,
{
    for attempt in 0..max_retries {
        let Some((version, current)) = store.fetch(id)? else {
            tracing::debug!(model = id, "model absent during update, treating as cancelled");
            return Ok(false);
        };
        let next = transform(current);
        match store.commit_if_unchanged(id, version, &next)? {
            CommitOutcome::Committed => return Ok(true),
            CommitOutcome::Conflict => {
                tracing::debug!(model = id, attempt, "snapshot conflict, retrying");
            }
        }
    }
    Err(GlmError::StoreContention {
        retries: max_retries,
    })
}

/// Add or replace the submodel at its lambda, re-running selection before
/// the commit.
pub fn update_submodel<S: SnapshotStore>(
    store: &S,
    id: &str,
    submodel: Submodel,
    criterion: SelectionCriterion,
    max_retries: usize,
) -> Result<bool> {
    atomic_update(store, id, max_retries, move |model| {
        model.apply_submodel(submodel.clone(), criterion)
    })
}

/// Attach cross-validation metrics to the submodel at `lambda`.
pub fn attach_cross_validation<S: SnapshotStore>(
    store: &S,
    id: &str,
    lambda: f64,
    metrics: ScoredMetrics,
    criterion: SelectionCriterion,
    max_retries: usize,
) -> Result<bool> {
    atomic_update(store, id, max_retries, move |model| {
        model.apply_cross_validation(lambda, metrics.clone(), criterion)
    })
}
