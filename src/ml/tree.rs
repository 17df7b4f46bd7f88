// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! Gradient-boosted tree ensemble

use serde::Deserialize;

use super::{sigmoid, ArtifactError, FeatureVector, FloodClassifier, FEATURE_COUNT};

/// Node of a binary regression tree, stored flat with index links
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go left when `x[feature] < threshold`; NaN follows `default_left`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        default_left: bool,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point forward, which rules out cycles
    fn validate(&self, index: usize) -> Result<(), ArtifactError> {
        if self.nodes.is_empty() {
            return Err(ArtifactError::Invalid(format!("tree {} has no nodes", index)));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Split { feature, threshold, left, right, .. } => {
                    if feature >= FEATURE_COUNT {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {} node {}: feature {} out of range",
                            index, i, feature
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {} node {}: non-finite threshold",
                            index, i
                        )));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(ArtifactError::Invalid(format!(
                                "tree {} node {}: bad child index {}",
                                index, i, child
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ArtifactError::Invalid(format!(
                            "tree {} node {}: non-finite leaf",
                            index, i
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    fn evaluate(&self, features: &FeatureVector) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split { feature, threshold, left, right, default_left } => {
                    let x = features[feature];
                    index = if x.is_nan() {
                        if default_left { left } else { right }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Sum of tree outputs pushed through the logistic link
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<DecisionTree>,
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::Invalid("tree ensemble has no trees".into()));
        }
        if !self.base_margin.is_finite() {
            return Err(ArtifactError::Invalid("non-finite base margin".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }

    pub fn margin(&self, features: &FeatureVector) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.evaluate(features)).sum::<f64>()
    }
}

impl FloodClassifier for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> f64 {
        sigmoid(self.margin(features))
    }

    fn kind(&self) -> &'static str {
        "tree_ensemble"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split { feature, threshold, left: 1, right: 2, default_left: true },
                TreeNode::Leaf { value: low },
                TreeNode::Leaf { value: high },
            ],
        }
    }

    #[test]
    fn test_split_goes_left_below_threshold() {
        let model = TreeEnsemble {
            base_margin: 0.0,
            trees: vec![stump(4, 2.0, -1.0, 1.0), stump(3, 0.0, 0.5, 0.0)],
        };
        model.validate().unwrap();

        let mut x = FeatureVector::zeros();
        x[4] = 1.9;
        x[3] = -1.0;
        assert!((model.margin(&x) - (-0.5)).abs() < 1e-12);

        x[4] = 2.0;
        x[3] = 0.0;
        assert!((model.margin(&x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_value_follows_default() {
        let model = TreeEnsemble { base_margin: 0.25, trees: vec![stump(0, 0.0, -3.0, 3.0)] };
        let mut x = FeatureVector::zeros();
        x[0] = f64::NAN;
        assert!((model.margin(&x) - (-2.75)).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_and_validate() {
        let model: TreeEnsemble = serde_json::from_str(
            r#"{"base_margin":-1.0,"trees":[{"nodes":[
                {"split":{"feature":5,"threshold":0.1,"left":1,"right":2}},
                {"leaf":{"value":0.2}},
                {"leaf":{"value":-0.2}}]}]}"#,
        )
        .unwrap();
        model.validate().unwrap();
        assert_eq!(model.kind(), "tree_ensemble");

        let looping = TreeEnsemble {
            base_margin: 0.0,
            trees: vec![DecisionTree {
                nodes: vec![TreeNode::Split { feature: 0, threshold: 0.0, left: 0, right: 0, default_left: false }],
            }],
        };
        assert!(looping.validate().is_err());

        let bad_feature = TreeEnsemble { base_margin: 0.0, trees: vec![stump(6, 0.0, 0.0, 0.0)] };
        assert!(bad_feature.validate().is_err());
    }
}
