//! Greedy CART-style regression tree induction on boosting residuals.

use rand::Rng;

use super::node::Node;
use super::split::{SplitParams, find_best_split};
use crate::ml::ModelError;

/// Splits gaining less than this much variance reduction become leaves.
pub const MIN_SPLIT_GAIN: f64 = 0.001;

/// Builds one regression tree per call under depth and leaf-size limits.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub features_per_node: usize,
}

impl TreeBuilder {
    /// Fit a tree to `residuals`, where `rows[i]` is the feature vector for `residuals[i]`.
    pub fn build<R: Rng + ?Sized>(
        &self,
        rows: &[&[f64]],
        residuals: &[f64],
        rng: &mut R,
    ) -> Result<Node, ModelError> {
        if rows.len() != residuals.len() {
            return Err(ModelError::insufficient(format!(
                "{} rows but {} residuals",
                rows.len(),
                residuals.len()
            )));
        }
        self.build_node(rows, residuals, 0, rng)
    }

    fn build_node<R: Rng + ?Sized>(
        &self,
        rows: &[&[f64]],
        residuals: &[f64],
        depth: usize,
        rng: &mut R,
    ) -> Result<Node, ModelError> {
        if residuals.is_empty() {
            return Err(ModelError::insufficient("tree node received no rows"));
        }
        if depth >= self.max_depth || rows.len() < self.min_samples_leaf {
            return Ok(leaf(residuals));
        }

        let params = SplitParams {
            min_samples_leaf: self.min_samples_leaf,
            features_per_node: self.features_per_node,
        };
        let split = match find_best_split(rows, residuals, &params, rng) {
            Some(split) if split.gain >= MIN_SPLIT_GAIN => split,
            _ => return Ok(leaf(residuals)),
        };

        let mut left_rows = Vec::new();
        let mut left_residuals = Vec::new();
        let mut right_rows = Vec::new();
        let mut right_residuals = Vec::new();
        for (&row, &residual) in rows.iter().zip(residuals) {
            if row[split.feature_index] <= split.threshold {
                left_rows.push(row);
                left_residuals.push(residual);
            } else {
                right_rows.push(row);
                right_residuals.push(residual);
            }
        }
        if !split.threshold.is_finite() || left_rows.is_empty() || right_rows.is_empty() {
            return Err(ModelError::MalformedSplit {
                feature_index: split.feature_index,
                threshold: split.threshold,
            });
        }

        Ok(Node::Split {
            feature_index: split.feature_index,
            threshold: split.threshold,
            left: Box::new(self.build_node(&left_rows, &left_residuals, depth + 1, rng)?),
            right: Box::new(self.build_node(&right_rows, &right_residuals, depth + 1, rng)?),
        })
    }
}

fn leaf(residuals: &[f64]) -> Node {
    let value = residuals.iter().sum::<f64>() / residuals.len() as f64;
    Node::Leaf { value }
}
