//! Result formatting: echo the input columns and append the prediction
//! columns, producing a table ready to be written back out as CSV.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{FieldRef, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::schema::credit::{self, PREDICTION_COLUMN, PROBABILITY_COLUMN};
use crate::{PipelineError, PredictionResult, ValidatedTable};

/// Build the scored output table.
///
/// The result has the input's rows and columns (untouched, in input order)
/// followed by `Default_Prediction` (0/1) and `Default_Probability`
/// (fraction). `table` itself is not modified and can still be explained.
pub fn append_predictions(
    table: &ValidatedTable,
    results: &[PredictionResult],
) -> Result<RecordBatch, PipelineError> {
    let source = table.source();
    if results.len() != source.num_rows() {
        return Err(PipelineError::inference(format!(
            "expected {} predictions, got {}",
            source.num_rows(),
            results.len()
        )));
    }

    let source_schema = source.schema();
    let mut fields: Vec<FieldRef> = source_schema.fields().iter().cloned().collect();
    fields.extend(credit::prediction_fields().map(Arc::new));

    let labels = Int64Array::from_iter_values(results.iter().map(|r| r.label.as_flag()));
    let probabilities = Float64Array::from_iter_values(results.iter().map(|r| r.probability));

    let mut columns: Vec<ArrayRef> = source.columns().to_vec();
    columns.push(Arc::new(labels));
    columns.push(Arc::new(probabilities));

    let schema = Schema::new_with_metadata(fields, source_schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Drop the appended prediction columns, recovering a features-only table.
///
/// Tables without those columns are returned unchanged.
pub fn strip_predictions(batch: &RecordBatch) -> Result<RecordBatch, ArrowError> {
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name() != PREDICTION_COLUMN && f.name() != PROBABILITY_COLUMN)
        .map(|(i, _)| i)
        .collect();
    batch.project(&keep)
}
