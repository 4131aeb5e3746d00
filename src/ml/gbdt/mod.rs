//! Gradient-boosted regression trees with squared-error loss.
//!
//! Each boosting round fits one tree to the residuals of the running
//! prediction. Trees are grown greedily on variance reduction, with a random
//! subset of features examined at every node and a random subset of rows per
//! tree. All randomness flows through a caller-supplied RNG, so a seeded
//! generator reproduces a model exactly.

mod model;
mod node;
pub mod split;
mod train;
pub mod tree;

pub use model::{GrowthModel, MODEL_VERSION, ModelSnapshot};
pub use node::Node;
pub use split::{SplitCandidate, SplitParams, find_best_split, variance};
pub use tree::{MIN_SPLIT_GAIN, TreeBuilder};
