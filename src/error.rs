//! Error types for the glmpath crate

use thiserror::Error;

/// Result type alias for glmpath operations
pub type Result<T> = std::result::Result<T, GlmError>;

/// Main error type for the glmpath crate.
///
/// Only two classes of failure are surfaced to callers: rejected
/// configuration and store writes that exhaust their retry budget.
/// Numeric edge conditions floor to epsilon, missing rows are skipped,
/// and stale submodel updates are discarded silently.
#[derive(Error, Debug)]
pub enum GlmError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Store write failed after {retries} conflicting commits")]
    StoreContention { retries: usize },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for GlmError {
    fn from(err: serde_json::Error) -> Self {
        GlmError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GlmError::ConfigError("bad link".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad link");
    }

    #[test]
    fn test_store_contention_display() {
        let err = GlmError::StoreContention { retries: 100 };
        assert_eq!(
            err.to_string(),
            "Store write failed after 100 conflicting commits"
        );
    }
}
