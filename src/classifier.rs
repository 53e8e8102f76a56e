//! Gradient-boosted decision trees for the binary heart-attack label.
//!
//! Each tree is a flat node list rooted at index 0. A split sends a row left
//! when `x[feature] <= threshold`; missing values (NaN) follow `default_left`.
//! The raw score of a row is `init_score` plus the leaf value reached in every
//! tree, and the probability of the positive class is its logistic sigmoid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, index: usize, num_features: usize) -> Result<()> {
        let invalid = |reason: String| {
            Err(ServiceError::InvalidArtifact(format!("tree {}: {}", index, reason)))
        };

        if self.nodes.is_empty() {
            return invalid("no nodes".to_string());
        }
        for (pos, node) in self.nodes.iter().enumerate() {
            if let Node::Split { feature, left, right, .. } = node {
                if *feature >= num_features {
                    return invalid(format!("node {} splits on feature {}", pos, feature));
                }
                // children must point forward so traversal always terminates
                for child in [*left, *right] {
                    if child <= pos || child >= self.nodes.len() {
                        return invalid(format!("node {} has child {}", pos, child));
                    }
                }
            }
        }
        Ok(())
    }

    /// Leaf value reached by the row whose features `feature_at` yields.
    pub fn leaf_value<F>(&self, feature_at: F) -> f64
    where
        F: Fn(usize) -> f64,
    {
        let mut pos = 0;
        loop {
            match &self.nodes[pos] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right, default_left } => {
                    let x = feature_at(*feature);
                    let go_left = if x.is_nan() { *default_left } else { x <= *threshold };
                    pos = if go_left { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub num_features: usize,
    #[serde(default)]
    pub init_score: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub trees: Vec<Tree>,
}

fn default_threshold() -> f64 {
    0.5
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl GradientBoostingClassifier {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ServiceError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        let classifier: GradientBoostingClassifier =
            serde_json::from_str(&raw).map_err(|source| ServiceError::ArtifactDecode {
                path: path.to_path_buf(),
                source,
            })?;
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ServiceError::InvalidArtifact("classifier has no trees".to_string()));
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(index, tree)| tree.validate(index, self.num_features))
    }

    fn check_width(&self, x: &DenseMatrix<f64>) -> Result<()> {
        let (_, ncols) = x.shape();
        if ncols != self.num_features {
            return Err(ServiceError::InvalidArtifact(format!(
                "classifier expects {} features, got {}",
                self.num_features, ncols
            )));
        }
        Ok(())
    }

    pub fn decision_function(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>> {
        self.check_width(x)?;
        let (nrows, _) = x.shape();

        let scores = (0..nrows)
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.leaf_value(|col| *x.get((row, col))))
                    .sum::<f64>()
                    + self.init_score
            })
            .collect();
        Ok(scores)
    }

    /// Probability of the positive class per row.
    pub fn predict_proba(&self, x: &DenseMatrix<f64>) -> Result<Vec<f64>> {
        Ok(self.decision_function(x)?.into_iter().map(sigmoid).collect())
    }

    /// Class label per row, 1 when the probability is above `threshold`.
    pub fn predict(&self, x: &DenseMatrix<f64>) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p > self.threshold))
            .collect())
    }
}
