//! Batched scoring of validated tables.

use smartlend_core::{Label, PipelineError, PredictionResult, ValidatedTable};
use tracing::info;

use crate::{Model, ModelError};

/// Scores whole tables with one model call per table.
pub struct Predictor<'m> {
    model: &'m dyn Model,
}

impl<'m> Predictor<'m> {
    pub fn new(model: &'m dyn Model) -> Self {
        Self { model }
    }

    /// One [`PredictionResult`] per row, in row order.
    ///
    /// Labels are derived from the returned probabilities, so label and
    /// probability can never disagree. An empty table returns no results
    /// without calling the model.
    pub fn predict(&self, table: &ValidatedTable) -> Result<Vec<PredictionResult>, PipelineError> {
        let n_rows = table.num_rows();
        if n_rows == 0 {
            return Ok(Vec::new());
        }
        if table.schema() != self.model.schema() {
            return Err(PipelineError::inference(ModelError::FeatureOrder));
        }

        let probabilities = self
            .model
            .predict_proba(table.features())
            .map_err(PipelineError::inference)?;
        check_output(&probabilities, n_rows).map_err(PipelineError::inference)?;

        let results: Vec<PredictionResult> = probabilities
            .into_iter()
            .map(|probability| PredictionResult {
                label: self.model.label_for(probability),
                probability,
            })
            .collect();

        let defaults = results
            .iter()
            .filter(|r| r.label == Label::WillDefault)
            .count();
        info!(rows = n_rows, defaults, model = self.model.kind(), "scored table");
        Ok(results)
    }
}

fn check_output(probabilities: &[f64], n_rows: usize) -> Result<(), ModelError> {
    if probabilities.len() != n_rows {
        return Err(ModelError::MalformedOutput(format!(
            "expected {n_rows} probabilities, got {}",
            probabilities.len()
        )));
    }
    if let Some((row, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !(0.0..=1.0).contains(*p))
    {
        return Err(ModelError::MalformedOutput(format!(
            "probability {p} for row {row} is outside [0, 1]"
        )));
    }
    Ok(())
}
