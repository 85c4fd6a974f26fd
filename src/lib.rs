//! glmpath - regularization-path GLM store and streaming scoring metrics
//!
//! This crate maintains, updates, and evaluates a family of linear models
//! fitted along a regularization path, and computes streaming,
//! distributable performance metrics for their outputs.
//!
//! # Modules
//!
//! ## Numeric kernel
//! - [`family`] - GLM family/link math: link, inverse, variance, deviance
//! - [`scoring`] - per-row scorer over a `[cat][num][intercept]` layout
//!
//! ## Metrics
//! - [`metrics`] - streaming, mergeable accumulators per response category,
//!   threshold sweep, AUC and operating-point tables
//!
//! ## Model path
//! - [`model`] - submodel path, cached summaries, selection policy, and the
//!   optimistic versioned snapshot store
//!
//! ## Infrastructure
//! - [`engine`] - local fork-join shard driver over rayon
//! - [`error`] - error types

pub mod engine;
pub mod error;
pub mod family;
pub mod metrics;
pub mod model;
pub mod scoring;

pub use error::{GlmError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::engine::score_and_validate;
    pub use crate::error::{GlmError, Result};
    pub use crate::family::{Family, FamilyParams, Link};
    pub use crate::metrics::{FinalizeContext, MetricBuilder, ModelCategory, ScoredMetrics};
    pub use crate::model::selection::SelectionCriterion;
    pub use crate::model::store::{
        attach_cross_validation, atomic_update, update_submodel, MemStore, SnapshotStore,
        DEFAULT_MAX_RETRIES,
    };
    pub use crate::model::{GlmModel, ModelSummary, Submodel};
    pub use crate::scoring::{DataLayout, RowScore, RowScorer};
}
