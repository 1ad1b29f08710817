//! Schema validation: turns an arbitrary input table into a feature matrix
//! in the exact column order a model expects.

use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::warn;

use crate::{FeatureSchema, PipelineError};

/// An input table that passed validation.
///
/// Keeps the untouched input next to the ordered feature matrix so the
/// formatter can echo original columns while models and explainers only ever
/// see features.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    source: RecordBatch,
    features: Array2<f64>,
    schema: FeatureSchema,
}

impl ValidatedTable {
    /// The input table exactly as supplied.
    pub fn source(&self) -> &RecordBatch {
        &self.source
    }

    /// Row-major `[rows, features]` matrix in schema order.
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    /// One row's feature vector.
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.num_rows()).then(|| self.features.row(index))
    }

    pub fn num_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

/// Check `batch` against `schema` and extract its features.
///
/// Every field of `schema` must be present exactly once and no other column
/// may appear. Text cells are parsed as numbers; numeric columns are widened
/// to `f64`. Null, empty, non-numeric and non-finite cells are rejected.
/// Rows are zero-based data rows (the header is not counted).
pub fn validate(batch: &RecordBatch, schema: &FeatureSchema) -> Result<ValidatedTable, PipelineError> {
    let batch_schema = batch.schema();
    let diff = schema.diff(batch_schema.fields().iter().map(|f| f.name().as_str()));
    if !diff.is_empty() {
        warn!(missing = ?diff.missing, extra = ?diff.extra, "input rejected: schema mismatch");
        return Err(PipelineError::SchemaMismatch {
            missing: diff.missing,
            extra: diff.extra,
        });
    }

    let columns = schema
        .names()
        .iter()
        .map(|name| Ok((name, batch.column(batch_schema.index_of(name)?).as_ref())))
        .collect::<Result<Vec<_>, arrow::error::ArrowError>>()?;

    let n_rows = batch.num_rows();
    let mut features = Array2::<f64>::zeros((n_rows, schema.len()));
    for row in 0..n_rows {
        for (j, (name, column)) in columns.iter().enumerate() {
            features[[row, j]] = cell_value(*column, row).map_err(|value| {
                warn!(row, field = %name, %value, "input rejected: invalid value");
                PipelineError::InvalidValue {
                    row,
                    field: (*name).clone(),
                    value,
                }
            })?;
        }
    }

    Ok(ValidatedTable {
        source: batch.clone(),
        features,
        schema: schema.clone(),
    })
}

/// Read one cell as a finite `f64`, or return its text for the error.
fn cell_value(col: &dyn Array, row: usize) -> Result<f64, String> {
    if col.is_null(row) {
        return Err(String::new());
    }

    let value = match col.data_type() {
        DataType::Utf8 => parse_text(col.as_string::<i32>().value(row))?,
        DataType::LargeUtf8 => parse_text(col.as_string::<i64>().value(row))?,
        DataType::Float64 => col.as_primitive::<Float64Type>().value(row),
        DataType::Float32 => col.as_primitive::<Float32Type>().value(row) as f64,
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row) as f64,
        DataType::Int32 => col.as_primitive::<Int32Type>().value(row) as f64,
        DataType::Int16 => col.as_primitive::<Int16Type>().value(row) as f64,
        DataType::Int8 => col.as_primitive::<Int8Type>().value(row) as f64,
        DataType::UInt64 => col.as_primitive::<UInt64Type>().value(row) as f64,
        DataType::UInt32 => col.as_primitive::<UInt32Type>().value(row) as f64,
        DataType::UInt16 => col.as_primitive::<UInt16Type>().value(row) as f64,
        DataType::UInt8 => col.as_primitive::<UInt8Type>().value(row) as f64,
        other => return Err(format!("<{other}>")),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(value.to_string())
    }
}

fn parse_text(text: &str) -> Result<f64, String> {
    text.trim().parse::<f64>().map_err(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::borrower::to_record_batch;
    use crate::schema::credit;
    use crate::table::read_csv;
    use crate::testing::{csv_text, example_row, example_values};

    fn validate_csv(text: &str) -> Result<ValidatedTable, PipelineError> {
        let batch = read_csv(text.as_bytes()).unwrap();
        validate(&batch, &FeatureSchema::credit())
    }

    #[test]
    fn accepts_text_columns_in_any_order() {
        let mut header: Vec<&str> = credit::FEATURE_NAMES.to_vec();
        header.reverse();
        let mut values = example_values();
        values.reverse();
        let text = csv_text(&header, &[values.clone(), values]);

        let table = validate_csv(&text).unwrap();
        assert_eq!(table.num_rows(), 2);
        // Matrix columns follow the schema, not the input.
        assert_eq!(table.features().row(0).to_vec(), example_row().values().to_vec());
        assert_eq!(table.source().num_columns(), 10);
    }

    #[test]
    fn accepts_numeric_columns() {
        let batch = to_record_batch(&[example_row()]).unwrap();
        let table = validate(&batch, &FeatureSchema::credit()).unwrap();
        assert_eq!(table.row(0).unwrap()[1], 45.0);
        assert!(table.row(1).is_none());
    }

    #[test]
    fn missing_field_is_schema_mismatch() {
        let header: Vec<&str> = credit::FEATURE_NAMES
            .iter()
            .copied()
            .filter(|n| *n != credit::AGE)
            .collect();
        let row: Vec<String> = vec!["1".to_string(); header.len()];
        let err = validate_csv(&csv_text(&header, &[row])).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { missing, extra } => {
                assert_eq!(missing, vec!["age"]);
                assert!(extra.is_empty());
            }
            other => panic!("expected SchemaMismatch, got {other}"),
        }
    }

    #[test]
    fn extra_field_is_schema_mismatch() {
        let mut header: Vec<&str> = credit::FEATURE_NAMES.to_vec();
        header.push("customer_id");
        let mut row = example_values();
        row.push("c-17".to_string());
        let err = validate_csv(&csv_text(&header, &[row])).unwrap_err();
        assert!(
            matches!(&err, PipelineError::SchemaMismatch { extra, .. } if extra == &["customer_id"]),
            "{err}"
        );
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let header: Vec<&str> = credit::FEATURE_NAMES
            .iter()
            .map(|n| if *n == credit::AGE { "Age" } else { *n })
            .collect();
        let err = validate_csv(&csv_text(&header, &[example_values()])).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn non_numeric_cell_names_row_and_field() {
        let mut bad = example_values();
        bad[1] = "abc".to_string();
        let text = csv_text(&credit::FEATURE_NAMES, &[example_values(), bad]);
        let err = validate_csv(&text).unwrap_err();
        match err {
            PipelineError::InvalidValue { row, field, value } => {
                assert_eq!(row, 1);
                assert_eq!(field, "age");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidValue, got {other}"),
        }
    }

    #[test]
    fn empty_cell_is_invalid() {
        let mut bad = example_values();
        bad[4] = String::new();
        let text = csv_text(&credit::FEATURE_NAMES, &[bad]);
        let err = validate_csv(&text).unwrap_err();
        assert!(
            matches!(&err, PipelineError::InvalidValue { row: 0, field, .. } if field == credit::MONTHLY_INCOME),
            "{err}"
        );
    }

    #[test]
    fn non_finite_is_invalid() {
        let mut bad = example_values();
        bad[3] = "NaN".to_string();
        let text = csv_text(&credit::FEATURE_NAMES, &[bad]);
        assert!(matches!(
            validate_csv(&text),
            Err(PipelineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let mut padded = example_values();
        padded[0] = " 0.3 ".to_string();
        let text = csv_text(&credit::FEATURE_NAMES, &[padded]);
        let table = validate_csv(&text).unwrap();
        assert_eq!(table.row(0).unwrap()[0], 0.3);
    }

    #[test]
    fn header_only_validates_to_zero_rows() {
        let text = csv_text(&credit::FEATURE_NAMES, &[]);
        let table = validate_csv(&text).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.features().ncols(), 10);
    }
}
