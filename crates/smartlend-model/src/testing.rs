//! Hand-built models and tables for unit tests.

use ndarray::Array2;
use smartlend_core::borrower::to_record_batch;
use smartlend_core::{BorrowerRow, FeatureSchema, ValidatedTable, credit, validate};

use crate::artifact::{FORMAT_VERSION, ModelArtifact, ModelBody};
use crate::linear::LogisticModel;
use crate::model::LoadedModel;
use crate::transform::OutputTransform;
use crate::tree::{Aggregation, Node, Tree, TreeEnsemble};

/// Depth-one tree with equal cover on both sides.
pub(crate) fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
    Tree::new(vec![
        Node::split(feature, threshold, 1, 2, 2.0),
        Node::leaf(left, 1.0),
        Node::leaf(right, 1.0),
    ])
}

/// Three-tree random forest over the borrower features, averaging vote
/// shares.
pub(crate) fn credit_forest() -> TreeEnsemble {
    let utilization = Tree::new(vec![
        Node::split(0, 0.5, 1, 2, 100.0),
        Node::split(6, 0.5, 3, 4, 70.0),
        Node::split(0, 0.9, 5, 6, 30.0),
        Node::leaf(0.04, 60.0),
        Node::leaf(0.45, 10.0),
        Node::leaf(0.20, 18.0),
        Node::leaf(0.55, 12.0),
    ]);
    let age_income = Tree::new(vec![
        Node::split(1, 35.0, 1, 2, 100.0),
        Node::split(3, 0.4, 3, 4, 35.0),
        Node::split(4, 3000.0, 5, 6, 65.0),
        Node::leaf(0.15, 20.0),
        Node::leaf(0.35, 15.0),
        Node::leaf(0.12, 25.0),
        Node::leaf(0.03, 40.0),
    ]);
    let late_payments = Tree::new(vec![
        Node::split(2, 0.5, 1, 2, 100.0),
        Node::split(8, 0.5, 3, 4, 85.0),
        Node::leaf(0.70, 15.0),
        Node::leaf(0.05, 80.0),
        Node::leaf(0.40, 5.0),
    ]);

    TreeEnsemble {
        aggregation: Aggregation::Mean,
        transform: OutputTransform::Identity,
        base_score: 0.0,
        trees: vec![utilization, age_income, late_payments],
    }
}

/// Gradient-boosted ensemble producing log-odds margins.
pub(crate) fn boosted_ensemble() -> TreeEnsemble {
    let first = Tree::new(vec![
        Node::split(2, 0.5, 1, 2, 200.0),
        Node::split(0, 0.6, 3, 4, 170.0),
        Node::split(1, 30.0, 5, 6, 30.0),
        Node::leaf(-0.8, 120.0),
        Node::leaf(0.4, 50.0),
        Node::leaf(1.6, 10.0),
        Node::leaf(0.9, 20.0),
    ]);
    let second = Tree::new(vec![
        Node::split(3, 0.5, 1, 2, 200.0),
        Node::split(9, 2.5, 3, 4, 150.0),
        Node::split(5, 8.0, 5, 6, 50.0),
        Node::leaf(-0.3, 110.0),
        Node::leaf(0.2, 40.0),
        Node::leaf(0.6, 35.0),
        Node::leaf(0.1, 15.0),
    ]);

    TreeEnsemble {
        aggregation: Aggregation::Sum,
        transform: OutputTransform::Sigmoid,
        base_score: -1.5,
        trees: vec![first, second],
    }
}

pub(crate) fn credit_logistic() -> LogisticModel {
    LogisticModel {
        intercept: -2.0,
        coefficients: vec![1.2, -0.02, 0.6, 0.8, -0.0001, 0.01, 0.9, 0.05, 0.7, 0.1],
    }
}

/// Bind a model body to the borrower schema with the default threshold.
pub(crate) fn loaded(body: ModelBody) -> LoadedModel {
    let artifact = ModelArtifact {
        format_version: FORMAT_VERSION,
        feature_names: FeatureSchema::credit().names().to_vec(),
        threshold: 0.5,
        body,
    };
    LoadedModel::from_artifact(artifact, &FeatureSchema::credit()).unwrap()
}

/// The borrower from the end-to-end example.
pub(crate) fn example_row() -> BorrowerRow {
    BorrowerRow {
        revolving_utilization: 0.3,
        age: 45.0,
        past_due_30_59: 0.0,
        debt_ratio: 0.2,
        monthly_income: 5000.0,
        open_credit_lines: 5.0,
        times_90_days_late: 0.0,
        real_estate_loans: 1.0,
        past_due_60_89: 0.0,
        dependents: 2.0,
    }
}

/// A borrower the forest labels `WillDefault`.
pub(crate) fn risky_row() -> BorrowerRow {
    BorrowerRow {
        revolving_utilization: 1.2,
        age: 25.0,
        past_due_30_59: 3.0,
        debt_ratio: 0.9,
        ..example_row()
    }
}

/// Example row then risky row, in schema order.
pub(crate) fn example_matrix() -> Array2<f64> {
    let values = example_row().values().into_iter().chain(risky_row().values());
    Array2::from_shape_vec((2, credit::FEATURE_NAMES.len()), values.collect()).unwrap()
}

/// `rows` copies of the example borrower, validated.
pub(crate) fn example_table(rows: usize) -> ValidatedTable {
    table_of(&vec![example_row(); rows])
}

pub(crate) fn table_of(rows: &[BorrowerRow]) -> ValidatedTable {
    let batch = to_record_batch(rows).unwrap();
    validate(&batch, &FeatureSchema::credit()).unwrap()
}
