//! Machine learning core: gradient-boosted regression trees for growth-rate
//! prediction plus the regression metrics used to score them.

pub mod error;
pub mod gbdt;
pub mod metrics;

pub use error::ModelError;
