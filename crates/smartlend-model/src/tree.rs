//! Fitted decision trees and tree ensembles.
//!
//! Trees are stored as flat node arrays with the root at index 0. A row goes
//! to the left child when `x[feature] <= threshold`. Children always have a
//! larger index than their parent, which `validate` enforces, so bottom-up
//! passes can simply walk the array in reverse.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::ModelError;
use crate::transform::OutputTransform;

/// A tree node. `cover` is the training weight that reached the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cover: Option<f64>,
    },
    Leaf {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cover: Option<f64>,
    },
}

impl Node {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> Self {
        Self::Split {
            feature,
            threshold,
            left,
            right,
            cover: Some(cover),
        }
    }

    pub fn leaf(value: f64, cover: f64) -> Self {
        Self::Leaf {
            value,
            cover: Some(cover),
        }
    }

    pub fn cover(&self) -> Option<f64> {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    #[inline]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Check structural invariants against the model's feature count.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has a non-finite value"));
                    }
                }
            }

            if let Some(cover) = node.cover()
                && !(cover.is_finite() && cover > 0.0)
            {
                return Err(format!("node {i} has non-positive cover {cover}"));
            }
        }

        Ok(())
    }

    /// Index of the leaf a row lands in.
    pub fn leaf_index(&self, row: &ArrayView1<'_, f64>) -> usize {
        let mut index = 0;
        while let Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } = self.nodes[index]
        {
            index = if row[feature] <= threshold { left } else { right };
        }
        index
    }

    pub fn predict(&self, row: &ArrayView1<'_, f64>) -> f64 {
        match self.nodes[self.leaf_index(row)] {
            Node::Leaf { value, .. } => value,
            // leaf_index only stops on leaves.
            Node::Split { .. } => f64::NAN,
        }
    }

    pub fn has_covers(&self) -> bool {
        self.nodes.iter().all(|n| n.cover().is_some())
    }

    /// Cover-weighted mean leaf value, i.e. the tree's expected output over
    /// its training distribution. `None` unless every node carries a cover.
    pub fn expected_value(&self) -> Option<f64> {
        if !self.has_covers() {
            return None;
        }
        let mut expected = vec![0.0; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            expected[i] = match self.nodes[i] {
                Node::Leaf { value, .. } => value,
                Node::Split { left, right, .. } => {
                    let l = self.nodes[left].cover()?;
                    let r = self.nodes[right].cover()?;
                    (l * expected[left] + r * expected[right]) / (l + r)
                }
            };
        }
        Some(expected[0])
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut depth = vec![1usize; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            if let Node::Split { left, right, .. } = self.nodes[i] {
                depth[i] = 1 + depth[left].max(depth[right]);
            }
        }
        depth.first().copied().unwrap_or(0)
    }
}

/// How per-tree outputs combine into the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Average of tree outputs (random forest).
    #[default]
    Mean,
    /// Sum of tree outputs (gradient boosting).
    Sum,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
        }
    }
}

/// An ensemble of regression trees over a fixed feature order.
///
/// `raw = base_score + weight * Σ tree(x)` where `weight` is `1/T` for
/// [`Aggregation::Mean`] and `1` for [`Aggregation::Sum`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub transform: OutputTransform,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Scale applied to each tree's output.
    pub fn tree_weight(&self) -> f64 {
        match self.aggregation {
            Aggregation::Mean => 1.0 / self.trees.len().max(1) as f64,
            Aggregation::Sum => 1.0,
        }
    }

    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::InvalidArtifact("ensemble has no trees".into()));
        }
        if !self.base_score.is_finite() {
            return Err(ModelError::InvalidArtifact("base_score is not finite".into()));
        }
        for (tree, t) in self.trees.iter().enumerate() {
            t.validate(n_features)
                .map_err(|reason| ModelError::InvalidTree { tree, reason })?;
        }
        Ok(())
    }

    pub fn raw_score(&self, row: &ArrayView1<'_, f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        self.base_score + self.tree_weight() * total
    }

    /// Raw scores for every row of a `[rows, features]` matrix.
    pub fn raw_scores(&self, features: ArrayView2<'_, f64>) -> Vec<f64> {
        features
            .rows()
            .into_iter()
            .map(|row| self.raw_score(&row))
            .collect()
    }

    /// Expected raw score over the training distribution, if every tree
    /// carries cover statistics.
    pub fn expected_value(&self) -> Option<f64> {
        let total = self
            .trees
            .iter()
            .map(Tree::expected_value)
            .sum::<Option<f64>>()?;
        Some(self.base_score + self.tree_weight() * total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{credit_forest, example_matrix, stump};
    use ndarray::array;

    #[test]
    fn stump_routes_on_threshold() {
        let tree = stump(0, 0.5, 0.1, 0.9);
        let left = array![0.5, 0.0];
        let right = array![0.51, 0.0];
        assert_eq!(tree.predict(&left.view()), 0.1);
        assert_eq!(tree.predict(&right.view()), 0.9);
    }

    #[test]
    fn expected_value_weights_by_cover() {
        let tree = Tree::new(vec![
            Node::split(0, 0.5, 1, 2, 100.0),
            Node::leaf(1.0, 75.0),
            Node::leaf(-1.0, 25.0),
        ]);
        assert_eq!(tree.expected_value(), Some(0.5));
    }

    #[test]
    fn expected_value_needs_covers() {
        let tree = Tree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 1,
                right: 2,
                cover: None,
            },
            Node::leaf(1.0, 1.0),
            Node::leaf(-1.0, 1.0),
        ]);
        assert!(!tree.has_covers());
        assert_eq!(tree.expected_value(), None);
    }

    #[test]
    fn depth_counts_nodes_on_longest_path() {
        let forest = credit_forest();
        assert_eq!(forest.trees[0].depth(), 3);
        assert_eq!(stump(0, 0.0, 0.0, 1.0).depth(), 2);
    }

    #[test]
    fn validate_rejects_backward_child() {
        let tree = Tree::new(vec![
            Node::split(0, 0.5, 1, 0, 2.0),
            Node::leaf(1.0, 1.0),
        ]);
        let err = tree.validate(1).unwrap_err();
        assert!(err.contains("invalid child 0"), "{err}");
    }

    #[test]
    fn validate_rejects_unknown_feature() {
        let err = stump(3, 0.5, 0.0, 1.0).validate(3).unwrap_err();
        assert!(err.contains("feature 3"), "{err}");
    }

    #[test]
    fn validate_rejects_zero_cover() {
        let tree = Tree::new(vec![
            Node::split(0, 0.5, 1, 2, 1.0),
            Node::leaf(1.0, 1.0),
            Node::leaf(0.0, 0.0),
        ]);
        assert!(tree.validate(1).is_err());
    }

    #[test]
    fn forest_averages_trees() {
        let forest = credit_forest();
        let scores = forest.raw_scores(example_matrix().view());
        // Leaves reached: 0.04, 0.03, 0.05.
        assert!((scores[0] - 0.04).abs() < 1e-12);
        assert!((scores[1] - 1.6 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn nodes_deserialize_untagged() {
        let json = r#"{"nodes": [
            {"feature": 1, "threshold": 40, "left": 1, "right": 2, "cover": 10},
            {"value": 0.2, "cover": 4},
            {"value": 0.05}
        ]}"#;
        let tree: Tree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes[0], Node::split(1, 40.0, 1, 2, 10.0));
        assert_eq!(tree.nodes[2], Node::Leaf { value: 0.05, cover: None });
    }
}
