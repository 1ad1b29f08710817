//! Local feature attribution for tree ensembles (path-dependent TreeSHAP).
//!
//! For each tree the algorithm walks every root-to-leaf path once, tracking
//! for each feature on the path the fraction of "feature absent" paths
//! (`zero_fraction`, the cover share) and "feature present" paths
//! (`one_fraction`, 1 if the row follows that branch). The result is the
//! exact Shapley value of the cover-marginalized conditional expectation, in
//! `O(leaves * depth^2)` per tree.

use ndarray::ArrayView1;
use smartlend_core::{Contribution, Explanation, PipelineError, ValidatedTable};
use tracing::debug;

use crate::tree::{Node, Tree, TreeEnsemble};
use crate::{Model, ModelError};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    weight: f64,
}

/// Attribution function for one tree-ensemble model.
///
/// Construction computes the baseline (expected raw score) once; after that
/// any number of rows can be explained.
pub struct TreeExplainer<'m> {
    model: &'m dyn Model,
    ensemble: &'m TreeEnsemble,
    baseline: f64,
}

impl<'m> TreeExplainer<'m> {
    pub fn new(model: &'m dyn Model) -> Result<Self, PipelineError> {
        let ensemble = model.tree_ensemble().ok_or_else(|| {
            PipelineError::unsupported(format!(
                "{} models do not support feature attribution",
                model.kind()
            ))
        })?;
        if let Some(tree) = ensemble.trees.iter().position(|t| !t.has_covers()) {
            return Err(PipelineError::unsupported(format!(
                "tree {tree} has no node cover statistics"
            )));
        }
        let baseline = ensemble
            .expected_value()
            .ok_or_else(|| PipelineError::unsupported("tree ensemble has no node cover statistics"))?;

        debug!(trees = ensemble.n_trees(), baseline, "built tree explainer");
        Ok(Self {
            model,
            ensemble,
            baseline,
        })
    }

    /// Expected raw score over the training distribution.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Per-feature attributions for one row, in the model's feature order.
    pub fn shap_values(&self, row: &ArrayView1<'_, f64>) -> Vec<f64> {
        let mut phi = vec![0.0; self.model.schema().len()];
        let scale = self.ensemble.tree_weight();
        for tree in &self.ensemble.trees {
            recurse(tree, row, 0, &[], 1.0, 1.0, None, scale, &mut phi);
        }
        phi
    }

    /// Explain row `index` of `table`.
    pub fn explain(&self, table: &ValidatedTable, index: usize) -> Result<Explanation, PipelineError> {
        let row = table.row(index).ok_or(PipelineError::IndexOutOfBounds {
            index,
            len: table.num_rows(),
        })?;
        let schema = self.model.schema();
        if table.schema() != schema {
            return Err(PipelineError::inference(ModelError::FeatureOrder));
        }

        let phi = self.shap_values(&row);
        let raw_score = self.ensemble.raw_score(&row);
        let contributions = schema
            .names()
            .iter()
            .zip(row.iter())
            .zip(phi)
            .map(|((feature, &value), contribution)| Contribution {
                feature: feature.clone(),
                value,
                contribution,
            })
            .collect();

        debug!(row = index, raw_score, "explained row");
        Ok(Explanation {
            row: index,
            baseline: self.baseline,
            raw_score,
            probability: self.model.transform().apply(raw_score),
            contributions,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    row: &ArrayView1<'_, f64>,
    node: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
    scale: f64,
    phi: &mut [f64],
) {
    let mut path = parent_path.to_vec();
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match *tree.node(node) {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let el = path[i];
                let Some(f) = el.feature else { continue };
                let w = unwound_sum(&path, i);
                phi[f] += w * (el.one_fraction - el.zero_fraction) * value * scale;
            }
        }
        Node::Split {
            feature: split,
            threshold,
            left,
            right,
            ..
        } => {
            let (hot, cold) = if row[split] <= threshold {
                (left, right)
            } else {
                (right, left)
            };
            // Covers are checked when the explainer is built.
            let hot_cover = tree.node(hot).cover().unwrap_or(0.0);
            let cold_cover = tree.node(cold).cover().unwrap_or(0.0);
            let total = hot_cover + cold_cover;

            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path.iter().position(|el| el.feature == Some(split)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                tree,
                row,
                hot,
                &path,
                hot_cover / total * incoming_zero,
                incoming_one,
                Some(split),
                scale,
                phi,
            );
            recurse(
                tree,
                row,
                cold,
                &path,
                cold_cover / total * incoming_zero,
                0.0,
                Some(split),
                scale,
                phi,
            );
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        weight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].weight += one_fraction * path[i].weight * (i + 1) as f64 / denom;
        path[i].weight = zero_fraction * path[i].weight * (depth - i) as f64 / denom;
    }
}

/// Undo the extension that added `path[index]`.
fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[index];
    let denom = (depth + 1) as f64;

    let mut next = path[depth].weight;
    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].weight;
            path[i].weight = next * denom / ((i + 1) as f64 * one_fraction);
            next = tmp - path[i].weight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].weight = path[i].weight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with `path[index]` unwound, without
/// modifying the path.
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let PathElement {
        zero_fraction,
        one_fraction,
        ..
    } = path[index];
    let denom = (depth + 1) as f64;

    let mut next = path[depth].weight;
    let mut total = 0.0;
    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next = path[i].weight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            total += path[i].weight / zero_fraction / ((depth - i) as f64 / denom);
        }
    }
    total
}
