//! Errors raised while loading or scoring a model.

use thiserror::Error;

/// Failures raised by a model while loading or scoring.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid artifact json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("artifact features do not match the borrower schema (missing: [{}], extra: [{}])", .missing.join(", "), .extra.join(", "))]
    FeatureMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("expected {expected} features per row, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("table was validated against a different feature order than the model expects")]
    FeatureOrder,

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}
