//! Core types, feature schema, table validation and result formatting for SmartLend.

pub mod borrower;
mod error;
pub mod format;
mod prediction;
pub mod schema;
pub mod table;
mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use borrower::BorrowerRow;
pub use error::{Cause, ErrorClass, PipelineError};
pub use prediction::{Contribution, Explanation, Label, PredictionResult};
pub use schema::{FeatureSchema, FieldDiff, credit};
pub use validate::{ValidatedTable, validate};
