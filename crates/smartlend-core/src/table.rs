//! Delimited-text table I/O.
//!
//! Uploaded CSV is read with every column typed as `Utf8` so that numeric
//! parsing happens in the validator, where a bad cell can be reported with
//! its row and field.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::PipelineError;

const CSV_BATCH_SIZE: usize = 1024;

/// Read a comma-separated table with a header row.
pub fn read_csv<R: Read>(mut reader: R) -> Result<RecordBatch, PipelineError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(ArrowError::from)?;

    // Header only: column names come from the file, types are all Utf8.
    let format = Format::default().with_header(true);
    let (header, _) = format.infer_schema(Cursor::new(&bytes), Some(0))?;
    let schema = Arc::new(Schema::new(
        header
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    let csv = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(CSV_BATCH_SIZE)
        .build(Cursor::new(bytes))?;
    let batches = csv.collect::<Result<Vec<_>, _>>()?;

    let table = arrow::compute::concat_batches(&schema, &batches)?;
    debug!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "read csv table"
    );
    Ok(table)
}

/// Write a table as comma-separated text with a header row.
pub fn write_csv<W: Write>(batch: &RecordBatch, writer: W) -> Result<(), ArrowError> {
    let mut writer = WriterBuilder::new().with_header(true).build(writer);
    writer.write(batch)
}
