//! Pipeline error type and its caller-facing classification.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed underlying cause attached to scoring and startup failures.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input does not match the feature schema (missing: [{}], extra: [{}])", .missing.join(", "), .extra.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("invalid value {value:?} in row {row}, field {field:?}")]
    InvalidValue {
        row: usize,
        field: String,
        value: String,
    },

    #[error("malformed table: {0}")]
    MalformedTable(#[from] arrow::error::ArrowError),

    #[error("inference failed: {source}")]
    InferenceFailure {
        #[source]
        source: Cause,
    },

    #[error("explanation unsupported: {reason}")]
    ExplanationUnsupported { reason: String },

    #[error("row index {index} out of bounds for table of {len} rows")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("failed to load model artifact {}: {source}", .path.display())]
    ArtifactLoadFailure {
        path: PathBuf,
        #[source]
        source: Cause,
    },
}

/// Who has to act on a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The input was malformed; the caller must fix it.
    Input,
    /// The input was accepted but scoring or explaining it failed.
    Scoring,
    /// The service could not start.
    Startup,
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SchemaMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::MalformedTable(_)
            | Self::IndexOutOfBounds { .. } => ErrorClass::Input,
            Self::InferenceFailure { .. } | Self::ExplanationUnsupported { .. } => {
                ErrorClass::Scoring
            }
            Self::ArtifactLoadFailure { .. } => ErrorClass::Startup,
        }
    }

    pub fn inference(source: impl Into<Cause>) -> Self {
        Self::InferenceFailure {
            source: source.into(),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::ExplanationUnsupported {
            reason: reason.into(),
        }
    }
}
