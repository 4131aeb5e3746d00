use serde::{Deserialize, Serialize};

/// A regression tree node. Trees are built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Terminal node holding the mean residual of the rows routed to it.
    Leaf { value: f64 },
    /// Binary split: `features[feature_index] <= threshold` goes left.
    Split {
        feature_index: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    /// Walk from this node to a leaf and return its value.
    ///
    /// # Panics
    ///
    /// Panics if a split tests a feature index past the end of `features`.
    /// [`GrowthModel::predict`](super::GrowthModel::predict) checks the width first.
    pub fn output(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature_index] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }

    /// Visit every split node, depth first, left before right.
    pub fn for_each_split(&self, visit: &mut impl FnMut(usize, f64)) {
        if let Node::Split {
            feature_index,
            threshold,
            left,
            right,
        } = self
        {
            visit(*feature_index, *threshold);
            left.for_each_split(visit);
            right.for_each_split(visit);
        }
    }

    /// Number of split nodes in this subtree.
    pub fn split_count(&self) -> usize {
        let mut count = 0;
        self.for_each_split(&mut |_, _| count += 1);
        count
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Depth of the deepest leaf; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}
