//! The model contract and its artifact-backed implementation.

use ndarray::ArrayView2;
use smartlend_core::{FeatureSchema, Label};

use crate::ModelError;
use crate::artifact::{FORMAT_VERSION, ModelArtifact, ModelBody};
use crate::transform::OutputTransform;
use crate::tree::TreeEnsemble;

/// An opaque, already-fitted binary classifier.
///
/// Implementations are loaded once and then only read, so they must be safe
/// to share between concurrent requests (`Send + Sync`). Nothing here locks.
pub trait Model: Send + Sync {
    /// Feature order expected in every matrix passed to this model.
    fn schema(&self) -> &FeatureSchema;

    /// Short model family name, e.g. `tree_ensemble`.
    fn kind(&self) -> &'static str;

    /// Raw (pre-transform) scores for a `[rows, features]` matrix.
    fn raw_scores(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError>;

    fn transform(&self) -> OutputTransform;

    /// Probabilities strictly above this are labelled `WillDefault`.
    fn threshold(&self) -> f64 {
        0.5
    }

    /// Probability of default for every row, in one batched call.
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
        let mut scores = self.raw_scores(features)?;
        self.transform().apply_inplace(&mut scores);
        Ok(scores)
    }

    fn label_for(&self, probability: f64) -> Label {
        if probability > self.threshold() {
            Label::WillDefault
        } else {
            Label::NoDefault
        }
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<Label>, ModelError> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| self.label_for(p))
            .collect())
    }

    /// The tree structure, for models that support feature attribution.
    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        None
    }
}

/// A model materialized from a [`ModelArtifact`].
#[derive(Debug, Clone)]
pub struct LoadedModel {
    schema: FeatureSchema,
    threshold: f64,
    body: ModelBody,
}

impl LoadedModel {
    /// Check an artifact and bind it to the caller's feature set.
    ///
    /// The artifact must name exactly the fields of `expected` (any order);
    /// its own order becomes the model's positional order.
    pub fn from_artifact(
        artifact: ModelArtifact,
        expected: &FeatureSchema,
    ) -> Result<Self, ModelError> {
        if artifact.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(artifact.format_version));
        }

        let diff = expected.diff(artifact.feature_names.iter().map(|s| s.as_str()));
        if !diff.is_empty() {
            return Err(ModelError::FeatureMismatch {
                missing: diff.missing,
                extra: diff.extra,
            });
        }

        if !(0.0..=1.0).contains(&artifact.threshold) {
            return Err(ModelError::InvalidArtifact(format!(
                "threshold {} is outside [0, 1]",
                artifact.threshold
            )));
        }

        let n_features = artifact.feature_names.len();
        match &artifact.body {
            ModelBody::TreeEnsemble(ensemble) => ensemble.validate(n_features)?,
            ModelBody::Logistic(logistic) => logistic.validate(n_features)?,
        }

        Ok(Self {
            schema: FeatureSchema::new(artifact.feature_names),
            threshold: artifact.threshold,
            body: artifact.body,
        })
    }

    pub fn body(&self) -> &ModelBody {
        &self.body
    }
}

impl Model for LoadedModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn kind(&self) -> &'static str {
        self.body.kind()
    }

    fn raw_scores(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
        if features.ncols() != self.schema.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.schema.len(),
                got: features.ncols(),
            });
        }

        Ok(match &self.body {
            ModelBody::TreeEnsemble(ensemble) => ensemble.raw_scores(features),
            ModelBody::Logistic(logistic) => logistic.margins(features),
        })
    }

    fn transform(&self) -> OutputTransform {
        match &self.body {
            ModelBody::TreeEnsemble(ensemble) => ensemble.transform,
            ModelBody::Logistic(_) => OutputTransform::Sigmoid,
        }
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn tree_ensemble(&self) -> Option<&TreeEnsemble> {
        match &self.body {
            ModelBody::TreeEnsemble(ensemble) => Some(ensemble),
            ModelBody::Logistic(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credit_forest, credit_logistic, example_matrix, loaded, stump};
    use ndarray::Array2;

    #[test]
    fn forest_probabilities_and_labels_agree() {
        let model = loaded(ModelBody::TreeEnsemble(credit_forest()));
        let x = example_matrix();
        let probs = model.predict_proba(x.view()).unwrap();
        let labels = model.predict(x.view()).unwrap();
        assert_eq!(labels, vec![Label::NoDefault, Label::WillDefault]);
        assert!(probs[0] < 0.5 && probs[1] > 0.5);
    }

    #[test]
    fn threshold_is_strict() {
        let ensemble = TreeEnsemble {
            trees: vec![stump(0, 100.0, 0.5, 0.5)],
            ..credit_forest()
        };
        let model = loaded(ModelBody::TreeEnsemble(ensemble));
        let labels = model.predict(example_matrix().view()).unwrap();
        assert_eq!(labels, vec![Label::NoDefault, Label::NoDefault]);
    }

    #[test]
    fn logistic_uses_sigmoid() {
        let model = loaded(ModelBody::Logistic(credit_logistic()));
        assert_eq!(model.kind(), "logistic");
        assert!(model.tree_ensemble().is_none());
        let probs = model.predict_proba(example_matrix().view()).unwrap();
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn wrong_width_is_shape_mismatch() {
        let model = loaded(ModelBody::TreeEnsemble(credit_forest()));
        let narrow = Array2::<f64>::zeros((2, 9));
        let err = model.raw_scores(narrow.view()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 10, got: 9 }));
    }

    #[test]
    fn artifact_threshold_outside_unit_interval_is_rejected() {
        let artifact = ModelArtifact {
            format_version: FORMAT_VERSION,
            feature_names: FeatureSchema::credit().names().to_vec(),
            threshold: 1.5,
            body: ModelBody::TreeEnsemble(credit_forest()),
        };
        let err = LoadedModel::from_artifact(artifact, &FeatureSchema::credit()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidArtifact(_)));
    }

    #[test]
    fn artifact_order_becomes_model_order() {
        let mut names = FeatureSchema::credit().names().to_vec();
        names.swap(0, 1);
        let artifact = ModelArtifact {
            format_version: FORMAT_VERSION,
            feature_names: names.clone(),
            threshold: 0.5,
            body: ModelBody::Logistic(credit_logistic()),
        };
        let model = LoadedModel::from_artifact(artifact, &FeatureSchema::credit()).unwrap();
        assert_eq!(model.schema().names(), names.as_slice());
    }
}
