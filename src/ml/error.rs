//! Error taxonomy shared by feature extraction, training, prediction and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the growth model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// `predict` (or a consumer of it) was called before training completed.
    #[error("Model has not been trained")]
    Untrained,
    /// The training data cannot support a boosting round.
    #[error("Insufficient training data: {reason}")]
    InsufficientData {
        /// Human-readable description of what was missing.
        reason: String,
    },
    /// A feature or target came out NaN or infinite.
    #[error("Non-finite {what} for {source_id} at period {period}")]
    NonFiniteValue {
        /// Which value was non-finite (`"target"` or a feature name).
        what: String,
        /// Entity key that produced the value.
        source_id: String,
        /// Period of the snapshot the example starts from.
        period: i32,
    },
    /// A feature vector does not match the training dimensionality.
    #[error("Feature vector has {actual} values but the model expects {expected}")]
    FeatureLength {
        /// Number of features seen during training.
        expected: usize,
        /// Number of features supplied.
        actual: usize,
    },
    /// The split search produced a split that cannot partition its rows.
    #[error("Malformed split on feature {feature_index} at threshold {threshold}")]
    MalformedSplit {
        /// Feature the split tests.
        feature_index: usize,
        /// Threshold the split compares against.
        threshold: f64,
    },
    /// Boosting configuration failed validation.
    #[error("Invalid boosting config: {0}")]
    InvalidConfig(String),
    /// A snapshot failed structural validation on import.
    #[error("Invalid model snapshot: {0}")]
    InvalidSnapshot(String),
    /// Snapshot JSON could not be encoded or decoded.
    #[error("Model JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Reading or writing a snapshot file failed.
    #[error("Model file error at {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl ModelError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            reason: reason.into(),
        }
    }
}
