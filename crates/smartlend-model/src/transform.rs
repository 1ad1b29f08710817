//! Link from raw model scores to probabilities.

use serde::{Deserialize, Serialize};

/// How a raw score (margin) becomes a probability of default.
///
/// Persisted in the artifact so scoring never needs to know how the model
/// was trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTransform {
    /// The raw score already is a probability (random-forest vote share).
    #[default]
    Identity,
    /// Logistic sigmoid of a log-odds margin.
    Sigmoid,
}

impl OutputTransform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
        }
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            Self::Identity => raw,
            Self::Sigmoid => sigmoid(raw),
        }
    }

    pub fn apply_inplace(&self, scores: &mut [f64]) {
        if *self == Self::Identity {
            return;
        }
        for s in scores.iter_mut() {
            *s = self.apply(*s);
        }
    }
}

/// Sigmoid with the margin clamped to avoid overflow in `exp`.
#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-500.0, 500.0)).exp())
}
