//! Model layer: artifact loading, tree-ensemble and logistic scoring,
//! TreeSHAP explanations and the inference pipeline facade.

pub mod artifact;
mod error;
mod explainer;
mod linear;
mod model;
mod pipeline;
mod predictor;
mod transform;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{DEFAULT_THRESHOLD, FORMAT_VERSION, ModelArtifact, ModelBody};
pub use error::ModelError;
pub use explainer::TreeExplainer;
pub use linear::LogisticModel;
pub use model::{LoadedModel, Model};
pub use pipeline::{ExplanationSession, Pipeline, ScoredTable};
pub use predictor::Predictor;
pub use transform::OutputTransform;
pub use tree::{Aggregation, Node, Tree, TreeEnsemble};
