//! Gradient-boosted regression trees over log-odds.
//!
//! `P(y=1) = σ(init_score + learning_rate · Σ tree(x))`, with each tree
//! sending a row left when `x[feature] <= threshold`.

use serde::{Deserialize, Serialize};

use super::logistic::sigmoid;
use crate::ports::{ArtifactError, Classifier};

/// A node in a flattened regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// One regression tree stored as a node array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    #[must_use]
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Children must point strictly forward, which rules out cycles and
    /// guarantees every walk terminates at a leaf.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {i} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {i} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by `row`.
    #[must_use]
    pub fn evaluate(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Fitted gradient-boosted tree ensemble for binary classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    n_features: usize,
    init_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// # Errors
    /// Returns error if the ensemble fails structural validation.
    pub fn new(
        n_features: usize,
        init_score: f64,
        learning_rate: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, ArtifactError> {
        let model = Self {
            n_features,
            init_score,
            learning_rate,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Structural checks run once at load time so that evaluation can index
    /// without bounds failures.
    ///
    /// # Errors
    /// Returns error describing the first malformed tree.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.n_features == 0 {
            return Err(ArtifactError::Malformed(
                "Risk model declares zero features".into(),
            ));
        }
        if !self.init_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(ArtifactError::Malformed(
                "Risk model init_score/learning_rate must be finite".into(),
            ));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ArtifactError::Malformed(format!("Risk model tree {t}: {e}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw log-odds before the logistic link.
    #[must_use]
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(row)).sum();
        self.init_score + self.learning_rate * sum
    }
}

impl Classifier for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}
