//! One inference pipeline for every presentation: validate, score, format,
//! and (when enabled) explain.

use std::path::Path;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use smartlend_core::borrower::to_record_batch;
use smartlend_core::format::append_predictions;
use smartlend_core::{
    BorrowerRow, Explanation, FeatureSchema, PipelineError, PredictionResult, ValidatedTable,
    validate,
};

use crate::explainer::TreeExplainer;
use crate::predictor::Predictor;
use crate::{Model, artifact};

/// Shared handle to a loaded model plus the explanation capability flag.
///
/// Cloning is cheap; clones share the same read-only model.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn Model>,
    explanations: bool,
}

/// Result of scoring one input table.
#[derive(Debug, Clone)]
pub struct ScoredTable {
    /// The validated input, kept for follow-up explanations.
    pub table: ValidatedTable,
    pub results: Vec<PredictionResult>,
    /// Input columns plus `Default_Prediction` and `Default_Probability`.
    pub output: RecordBatch,
}

impl Pipeline {
    /// Explanations are enabled by default.
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            explanations: true,
        }
    }

    pub fn with_explanations(mut self, enabled: bool) -> Self {
        self.explanations = enabled;
        self
    }

    /// Load the borrower model artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let model = artifact::load(path, &FeatureSchema::credit())?;
        Ok(Self::new(Arc::new(model)))
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// Whether this deployment offers explanations at all. The model may
    /// still be unable to provide them.
    pub fn supports_explanation(&self) -> bool {
        self.explanations
    }

    pub fn validate(&self, batch: &RecordBatch) -> Result<ValidatedTable, PipelineError> {
        validate(batch, self.model.schema())
    }

    pub fn predict(&self, table: &ValidatedTable) -> Result<Vec<PredictionResult>, PipelineError> {
        Predictor::new(self.model.as_ref()).predict(table)
    }

    /// Validate, predict and format in one step.
    pub fn score(&self, batch: &RecordBatch) -> Result<ScoredTable, PipelineError> {
        let table = self.validate(batch)?;
        let results = self.predict(&table)?;
        let output = append_predictions(&table, &results)?;
        Ok(ScoredTable {
            table,
            results,
            output,
        })
    }

    /// Score manually entered rows.
    pub fn score_rows(&self, rows: &[BorrowerRow]) -> Result<ScoredTable, PipelineError> {
        self.score(&to_record_batch(rows)?)
    }

    /// Build the attribution function once for `table`.
    pub fn explain_session<'a>(
        &'a self,
        table: &'a ValidatedTable,
    ) -> Result<ExplanationSession<'a>, PipelineError> {
        if !self.explanations {
            return Err(PipelineError::unsupported(
                "explanations are disabled for this deployment",
            ));
        }
        let explainer = TreeExplainer::new(self.model.as_ref())?;
        Ok(ExplanationSession { explainer, table })
    }

    /// Explain a single row. Use [`Pipeline::explain_session`] for several
    /// rows of the same table.
    pub fn explain(&self, table: &ValidatedTable, row: usize) -> Result<Explanation, PipelineError> {
        self.explain_session(table)?.explain(row)
    }
}

/// An explainer bound to one validated table.
pub struct ExplanationSession<'a> {
    explainer: TreeExplainer<'a>,
    table: &'a ValidatedTable,
}

impl ExplanationSession<'_> {
    pub fn explain(&self, row: usize) -> Result<Explanation, PipelineError> {
        self.explainer.explain(self.table, row)
    }

    pub fn baseline(&self) -> f64 {
        self.explainer.baseline()
    }

    pub fn len(&self) -> usize {
        self.table.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
