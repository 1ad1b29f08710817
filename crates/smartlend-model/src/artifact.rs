//! Serialized model artifact: a JSON description of an already-fitted model.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smartlend_core::{FeatureSchema, PipelineError};
use tracing::info;

use crate::ModelError;
use crate::linear::LogisticModel;
use crate::model::{LoadedModel, Model};
use crate::tree::TreeEnsemble;

/// Artifact format understood by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Default decision threshold on the probability of default.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Feature order the model consumes.
    pub feature_names: Vec<String>,
    /// Rows with probability strictly above this are labelled `WillDefault`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(flatten)]
    pub body: ModelBody,
}

/// Model family, tagged by `kind` in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelBody {
    TreeEnsemble(TreeEnsemble),
    Logistic(LogisticModel),
}

impl ModelBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TreeEnsemble(_) => "tree_ensemble",
            Self::Logistic(_) => "logistic",
        }
    }
}

impl ModelArtifact {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Load and check a model artifact against the expected feature set.
///
/// Every failure, from a missing file to a structurally broken tree, is an
/// [`PipelineError::ArtifactLoadFailure`]: there is no degraded mode without a
/// model.
pub fn load(path: &Path, expected: &FeatureSchema) -> Result<LoadedModel, PipelineError> {
    let model = ModelArtifact::from_path(path)
        .and_then(|artifact| LoadedModel::from_artifact(artifact, expected))
        .map_err(|e| PipelineError::ArtifactLoadFailure {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    info!(
        path = %path.display(),
        kind = model.body().kind(),
        features = model.schema().len(),
        "loaded model artifact"
    );
    Ok(model)
}
