//! Library exports for reuse in benchmarks, tests and developer binaries.
/// Application directory helpers.
pub mod app_dirs;
/// Boosting configuration and TOML loading.
pub mod config;
/// Entity records and feature extraction.
pub mod data;
/// Multi-year population projection on top of a trained model.
pub mod forecast;
/// Tracing subscriber setup.
pub mod logging;
/// Gradient-boosted regression trees and evaluation metrics.
pub mod ml;
