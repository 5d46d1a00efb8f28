//! Decision tree predictor

use super::{check_width, Model};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64 },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn max_feature_idx(&self) -> Option<usize> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split { feature_idx, left, right, .. } => [
                Some(*feature_idx),
                left.max_feature_idx(),
                right.max_feature_idx(),
            ]
            .into_iter()
            .flatten()
            .max(),
        }
    }
}

/// Pre-fitted decision tree (classification or regression)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub root: TreeNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl DecisionTree {
    pub fn new(n_features: usize, root: TreeNode) -> Self {
        Self {
            n_features,
            root,
            feature_names: None,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    fn predict_sample(node: &TreeNode, sample: &[f64]) -> Result<f64> {
        match node {
            TreeNode::Leaf { value } => Ok(*value),
            TreeNode::Split { feature_idx, threshold, left, right } => {
                let x = sample.get(*feature_idx).ok_or_else(|| {
                    PipelineError::Config(format!(
                        "decision_tree splits on feature {} of a {}-feature sample",
                        feature_idx,
                        sample.len()
                    ))
                })?;
                if *x <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(PipelineError::Config("decision_tree artifact has zero features".to_string()));
        }
        if let Some(idx) = self.root.max_feature_idx().filter(|&idx| idx >= self.n_features) {
            return Err(PipelineError::Config(format!(
                "decision_tree splits on feature {} but has only {} features",
                idx, self.n_features
            )));
        }
        Ok(())
    }
}

impl Model for DecisionTree {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width("decision_tree", self.n_features, x)?;
        let predictions = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.to_vec();
                Self::predict_sample(&self.root, &sample)
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from_vec(predictions))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}
