//! Per-row scoring outputs shared between the model crate and callers.

use serde::{Deserialize, Serialize};

/// Binary outcome predicted for a borrower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    WillDefault,
    NoDefault,
}

impl Label {
    /// Human-readable label text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WillDefault => "Will Default",
            Self::NoDefault => "No Default",
        }
    }

    /// Class index as written to `Default_Prediction`.
    pub fn as_flag(&self) -> i64 {
        match self {
            Self::WillDefault => 1,
            Self::NoDefault => 0,
        }
    }
}

/// Label plus probability of default for one row.
///
/// `probability` is always the probability of [`Label::WillDefault`], as a
/// fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: Label,
    pub probability: f64,
}

/// One feature's share of an explained prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub feature: String,
    /// The row's input value for this feature.
    pub value: f64,
    /// Signed push away from the baseline, in raw-score units.
    pub contribution: f64,
}

/// Local feature attribution for a single row.
///
/// `baseline + Σ contribution ≈ raw_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub row: usize,
    /// Expected raw score of the model over its training distribution.
    pub baseline: f64,
    /// Raw (pre-transform) model score for this row.
    pub raw_score: f64,
    pub probability: f64,
    /// One entry per feature, in the model's feature order.
    pub contributions: Vec<Contribution>,
}

impl Explanation {
    pub fn contribution(&self, feature: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|c| c.feature == feature)
            .map(|c| c.contribution)
    }

    /// Sum of all contributions.
    pub fn total(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Contributions ordered by descending magnitude (force-plot order).
    pub fn ranked(&self) -> Vec<&Contribution> {
        let mut ranked: Vec<&Contribution> = self.contributions.iter().collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}
