//! Feature schema the credit model was trained on, plus the Arrow schemas
//! derived from it.

use std::collections::HashSet;

use arrow::datatypes::{DataType, Field, Schema};

/// Arrow schema definitions for borrower data.
pub mod credit {
    use super::*;

    pub const REVOLVING_UTILIZATION: &str = "RevolvingUtilizationOfUnsecuredLines";
    pub const AGE: &str = "age";
    pub const PAST_DUE_30_59: &str = "NumberOfTime30-59DaysPastDueNotWorse";
    pub const DEBT_RATIO: &str = "DebtRatio";
    pub const MONTHLY_INCOME: &str = "MonthlyIncome";
    pub const OPEN_CREDIT_LINES: &str = "NumberOfOpenCreditLinesAndLoans";
    pub const TIMES_90_DAYS_LATE: &str = "NumberOfTimes90DaysLate";
    pub const REAL_ESTATE_LOANS: &str = "NumberRealEstateLoansOrLines";
    pub const PAST_DUE_60_89: &str = "NumberOfTime60-89DaysPastDueNotWorse";
    pub const DEPENDENTS: &str = "NumberOfDependents";

    /// The ten model inputs in training order.
    pub const FEATURE_NAMES: [&str; 10] = [
        REVOLVING_UTILIZATION,
        AGE,
        PAST_DUE_30_59,
        DEBT_RATIO,
        MONTHLY_INCOME,
        OPEN_CREDIT_LINES,
        TIMES_90_DAYS_LATE,
        REAL_ESTATE_LOANS,
        PAST_DUE_60_89,
        DEPENDENTS,
    ];

    /// Appended 0/1 label column.
    pub const PREDICTION_COLUMN: &str = "Default_Prediction";
    /// Appended probability-of-default column (fraction in `[0, 1]`).
    pub const PROBABILITY_COLUMN: &str = "Default_Probability";

    /// Schema for manually entered borrower rows: ten non-null Float64 columns.
    pub fn borrower_schema() -> Schema {
        Schema::new(
            FEATURE_NAMES
                .iter()
                .map(|name| Field::new(*name, DataType::Float64, false))
                .collect::<Vec<_>>(),
        )
    }

    /// The two columns appended by the result formatter.
    pub fn prediction_fields() -> [Field; 2] {
        [
            Field::new(PREDICTION_COLUMN, DataType::Int64, false),
            Field::new(PROBABILITY_COLUMN, DataType::Float64, false),
        ]
    }
}

/// Ordered set of named numeric fields a model consumes.
///
/// Order is positional: column `i` of every feature matrix built against this
/// schema holds the field at `names()[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

/// Field-set difference between an input and a [`FeatureSchema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl FieldDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

impl FeatureSchema {
    /// The ten-field borrower schema in training order.
    pub fn credit() -> Self {
        Self::new(credit::FEATURE_NAMES.iter().map(|s| s.to_string()).collect())
    }

    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Compare a list of input field names against this schema.
    ///
    /// Matching is exact and case-sensitive; order is ignored. A name that
    /// appears more than once is reported as extra from its second occurrence.
    pub fn diff<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> FieldDiff {
        let expected: HashSet<&str> = self.names.iter().map(|s| s.as_str()).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut extra = Vec::new();

        for name in fields {
            if !expected.contains(name) || !seen.insert(name) {
                extra.push(name.to_string());
            }
        }

        let missing = self
            .names
            .iter()
            .filter(|n| !seen.contains(n.as_str()))
            .cloned()
            .collect();

        FieldDiff { missing, extra }
    }
}
