//! A single borrower record, as entered by hand or read from JSON.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::PipelineError;
use crate::schema::{FeatureSchema, credit};

/// One record conforming to the credit feature schema.
///
/// Serialized field names are the exact schema names, so a JSON object
/// produced by any other client of the model deserializes unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowerRow {
    #[serde(rename = "RevolvingUtilizationOfUnsecuredLines")]
    pub revolving_utilization: f64,
    #[serde(rename = "age")]
    pub age: f64,
    #[serde(rename = "NumberOfTime30-59DaysPastDueNotWorse")]
    pub past_due_30_59: f64,
    #[serde(rename = "DebtRatio")]
    pub debt_ratio: f64,
    #[serde(rename = "MonthlyIncome")]
    pub monthly_income: f64,
    #[serde(rename = "NumberOfOpenCreditLinesAndLoans")]
    pub open_credit_lines: f64,
    #[serde(rename = "NumberOfTimes90DaysLate")]
    pub times_90_days_late: f64,
    #[serde(rename = "NumberRealEstateLoansOrLines")]
    pub real_estate_loans: f64,
    #[serde(rename = "NumberOfTime60-89DaysPastDueNotWorse")]
    pub past_due_60_89: f64,
    #[serde(rename = "NumberOfDependents")]
    pub dependents: f64,
}

impl BorrowerRow {
    /// Field values in [`credit::FEATURE_NAMES`] order.
    pub fn values(&self) -> [f64; 10] {
        [
            self.revolving_utilization,
            self.age,
            self.past_due_30_59,
            self.debt_ratio,
            self.monthly_income,
            self.open_credit_lines,
            self.times_90_days_late,
            self.real_estate_loans,
            self.past_due_60_89,
            self.dependents,
        ]
    }

    /// Inverse of [`BorrowerRow::values`].
    pub fn from_values(v: [f64; 10]) -> Self {
        Self {
            revolving_utilization: v[0],
            age: v[1],
            past_due_30_59: v[2],
            debt_ratio: v[3],
            monthly_income: v[4],
            open_credit_lines: v[5],
            times_90_days_late: v[6],
            real_estate_loans: v[7],
            past_due_60_89: v[8],
            dependents: v[9],
        }
    }
}

/// Rows from a JSON object, or an array of objects, keyed by schema names.
///
/// Each object must carry exactly the credit fields, with finite numbers as
/// values. Rows are zero-based positions in the array.
pub fn rows_from_json(json: &Value) -> Result<Vec<BorrowerRow>, PipelineError> {
    let objects: Vec<&Value> = match json {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let schema = FeatureSchema::credit();

    objects
        .into_iter()
        .enumerate()
        .map(|(row, object)| {
            let Value::Object(fields) = object else {
                return Err(PipelineError::MalformedTable(ArrowError::JsonError(format!(
                    "row {row} is not a JSON object"
                ))));
            };

            let diff = schema.diff(fields.keys().map(|k| k.as_str()));
            if !diff.is_empty() {
                warn!(row, missing = ?diff.missing, extra = ?diff.extra, "input rejected: schema mismatch");
                return Err(PipelineError::SchemaMismatch {
                    missing: diff.missing,
                    extra: diff.extra,
                });
            }

            let mut values = [0.0; 10];
            for (slot, name) in values.iter_mut().zip(credit::FEATURE_NAMES) {
                let value = fields.get(name).unwrap_or(&Value::Null);
                *slot = value.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
                    warn!(row, field = name, %value, "input rejected: invalid value");
                    PipelineError::InvalidValue {
                        row,
                        field: name.to_string(),
                        value: value.to_string(),
                    }
                })?;
            }
            Ok(BorrowerRow::from_values(values))
        })
        .collect()
}

/// Build a Float64 table from manually entered rows.
pub fn to_record_batch(rows: &[BorrowerRow]) -> Result<RecordBatch, ArrowError> {
    let columns: Vec<ArrayRef> = (0..credit::FEATURE_NAMES.len())
        .map(|i| {
            let values: Float64Array = rows.iter().map(|r| Some(r.values()[i])).collect();
            Arc::new(values) as ArrayRef
        })
        .collect();

    RecordBatch::try_new(Arc::new(credit::borrower_schema()), columns)
}
